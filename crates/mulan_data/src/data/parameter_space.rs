use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Number of trait axes carried by every species.
pub const TRAIT_SIZE: usize = 2;

/// Positional traits used for niche comparisons.
pub type Trait = [f64; TRAIT_SIZE];

/// Discrete tag naming a species kind.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct KindTag(pub u32);

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind#{}", self.0)
    }
}

/// Identity key of a species: kind tag, trait vector and parameter vector.
///
/// Floating point members compare by value with `-0.0 == 0.0` and every NaN
/// equal to every other NaN, so that `Eq` and `Hash` stay consistent and the
/// type can key a `HashMap`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParameterSpace {
    pub kind: KindTag,
    pub traits: Trait,
    pub params: Vec<f64>,
}

impl ParameterSpace {
    #[must_use]
    pub fn new(kind: KindTag, traits: Trait, params: Vec<f64>) -> Self {
        Self {
            kind,
            traits,
            params,
        }
    }

    /// Parameter at `index`, or `0.0` when the vector is shorter.
    #[must_use]
    pub fn param(&self, index: usize) -> f64 {
        self.params.get(index).copied().unwrap_or(0.0)
    }

    fn canonical(&self) -> impl Iterator<Item = u64> + '_ {
        self.traits
            .iter()
            .chain(self.params.iter())
            .map(|v| canonical_bits(*v))
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for ParameterSpace {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.params.len() == other.params.len()
            && self.canonical().eq(other.canonical())
    }
}

impl Eq for ParameterSpace {}

impl Hash for ParameterSpace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.params.len().hash(state);
        for bits in self.canonical() {
            bits.hash(state);
        }
    }
}

/// Interaction coefficients carried by a directed edge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct InteractionVector(Vec<f64>);

impl InteractionVector {
    #[must_use]
    pub fn new(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    /// Single-component vector.
    #[must_use]
    pub fn scalar(weight: f64) -> Self {
        Self(vec![weight])
    }

    /// True when any single component is strictly above `tolerance`.
    #[must_use]
    pub fn exceeds(&self, tolerance: f64) -> bool {
        self.0.iter().any(|w| *w > tolerance)
    }

    /// Component at `index`, or `0.0` when absent.
    #[must_use]
    pub fn weight(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for InteractionVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for InteractionVector {
    fn from(weights: Vec<f64>) -> Self {
        Self(weights)
    }
}
