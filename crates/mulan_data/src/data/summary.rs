use super::parameter_space::{KindTag, Trait};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reporting snapshot of a single vertex.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VertexSummary {
    pub id: usize,
    pub kind: KindTag,
    pub active: bool,
    pub mass: f64,
    pub traits: Trait,
    /// Kind-specific derived values, e.g. `niche_width` or `error`.
    pub metrics: BTreeMap<String, f64>,
}

/// Reporting snapshot of a directed edge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EdgeSummary {
    pub source: usize,
    pub target: usize,
    pub weights: Vec<f64>,
}
