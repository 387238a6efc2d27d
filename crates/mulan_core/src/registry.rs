//! Runtime species registry.
//!
//! Each species kind is bound exactly once per run to one concrete variant,
//! chosen from an enumerated [`Selection`] (one small integer per configurable
//! axis of the kind). The binding owns the variant's population counter, so
//! counters are per kind and never global.

use crate::error::{MulanError, Result};
use crate::integrator::Integrator;
use crate::network::{Network, VertexId};
use crate::species::{PopulationCounter, Species};
use mulan_data::{KindTag, ParameterSpace, Selection};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Family of variants for one species kind.
pub trait SpeciesTemplate {
    fn kind(&self) -> KindTag;

    fn name(&self) -> &str;

    /// Number of choices on each configurable axis.
    fn axes(&self) -> Vec<usize>;

    /// Builds the variant for an in-range `selection`, or `None` if the
    /// combination has no implementation.
    fn resolve(
        &self,
        selection: &Selection,
        counter: PopulationCounter,
    ) -> Option<Rc<dyn Species>>;
}

/// A bound variant.
#[derive(Debug, Clone)]
pub struct VariantHandle {
    kind: KindTag,
    selection: Selection,
    species: Rc<dyn Species>,
    counter: PopulationCounter,
}

impl VariantHandle {
    #[must_use]
    pub fn kind(&self) -> KindTag {
        self.kind
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn species(&self) -> &Rc<dyn Species> {
        &self.species
    }

    #[must_use]
    pub fn counter(&self) -> &PopulationCounter {
        &self.counter
    }
}

/// Kind → bound variant.
#[derive(Debug, Default)]
pub struct SpeciesRegistry {
    bindings: BTreeMap<KindTag, VariantHandle>,
}

impl SpeciesRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a variant of `template`'s kind.
    ///
    /// A second registration of the same kind is logged and ignored; the
    /// existing binding is returned.
    pub fn register(
        &mut self,
        template: &dyn SpeciesTemplate,
        selection: Selection,
    ) -> Result<VariantHandle> {
        let kind = template.kind();
        if let Some(existing) = self.bindings.get(&kind) {
            tracing::warn!(
                kind = %kind,
                name = template.name(),
                requested = %selection,
                bound = %existing.selection,
                "Already registered"
            );
            return Ok(existing.clone());
        }

        let axes = template.axes();
        if selection.len() != axes.len() {
            return Err(MulanError::SelectionLength {
                kind,
                expected: axes.len(),
                found: selection.len(),
            });
        }
        for (axis, (value, limit)) in selection.iter().zip(axes.iter().copied()).enumerate() {
            if value >= limit {
                return Err(MulanError::SelectionOutOfRange {
                    kind,
                    axis,
                    value,
                    limit,
                });
            }
        }

        let counter = PopulationCounter::new();
        let species = template
            .resolve(&selection, counter.clone())
            .ok_or_else(|| MulanError::NoVariant {
                kind,
                selection: selection.clone(),
            })?;

        tracing::debug!(kind = %kind, name = template.name(), selection = %selection, "Registered species variant");
        let handle = VariantHandle {
            kind,
            selection,
            species,
            counter,
        };
        self.bindings.insert(kind, handle.clone());
        Ok(handle)
    }

    /// Adds `mass` of a species of `kind` to `network`.
    ///
    /// The parameter space is re-tagged with `kind` before the lookup.
    pub fn add<I: Integrator>(
        &self,
        network: &mut Network<I>,
        kind: KindTag,
        mass: f64,
        mut parameters: ParameterSpace,
    ) -> Result<VertexId> {
        let handle = self.bindings.get(&kind).ok_or_else(|| {
            tracing::error!(kind = %kind, "Not registered");
            MulanError::UnregisteredKind(kind)
        })?;
        parameters.kind = kind;
        Ok(network.add(mass, parameters, Rc::clone(&handle.species)))
    }

    /// Live population counter of `kind`'s bound variant.
    pub fn spec_count(&self, kind: KindTag) -> Result<PopulationCounter> {
        self.bindings
            .get(&kind)
            .map(|h| h.counter.clone())
            .ok_or(MulanError::UnregisteredKind(kind))
    }

    #[must_use]
    pub fn handle(&self, kind: KindTag) -> Option<&VariantHandle> {
        self.bindings.get(&kind)
    }

    #[must_use]
    pub fn is_registered(&self, kind: KindTag) -> bool {
        self.bindings.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = KindTag> + '_ {
        self.bindings.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::integrator::Euler;
    use crate::network::NetworkSettings;
    use crate::species::{EdgeSides, RateInput};
    use mulan_data::InteractionVector;

    #[derive(Debug)]
    struct Constant {
        rate: f64,
        counter: PopulationCounter,
    }

    impl Species for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn sum_size(&self) -> usize {
            0
        }

        fn dxdt(&self, _input: RateInput<'_>) -> Result<f64> {
            Ok(self.rate)
        }

        fn interaction_coefficient(
            &self,
            _this: &ParameterSpace,
            _other: &ParameterSpace,
        ) -> InteractionVector {
            InteractionVector::scalar(0.0)
        }

        fn edge_aggregate(
            &self,
            _level: usize,
            _weights: &InteractionVector,
            _sides: EdgeSides<'_>,
        ) -> Result<()> {
            Ok(())
        }

        fn counter(&self) -> &PopulationCounter {
            &self.counter
        }
    }

    /// Two axes: rate sign (2 choices) and magnitude (3 choices, last one unimplemented).
    struct ConstantTemplate;

    impl SpeciesTemplate for ConstantTemplate {
        fn kind(&self) -> KindTag {
            KindTag(7)
        }

        fn name(&self) -> &str {
            "constant"
        }

        fn axes(&self) -> Vec<usize> {
            vec![2, 3]
        }

        fn resolve(
            &self,
            selection: &Selection,
            counter: PopulationCounter,
        ) -> Option<Rc<dyn Species>> {
            let sign = if selection.choice(0)? == 0 { 1.0 } else { -1.0 };
            let magnitude = match selection.choice(1)? {
                0 => 1.0,
                1 => 10.0,
                _ => return None,
            };
            Some(Rc::new(Constant {
                rate: sign * magnitude,
                counter,
            }))
        }
    }

    fn ps(trait0: f64) -> ParameterSpace {
        ParameterSpace::new(KindTag(0), [trait0, 0.0], vec![1.0])
    }

    #[test]
    fn test_register_and_add() {
        let mut registry = SpeciesRegistry::new();
        let mut network = Network::<Euler>::new(NetworkSettings::default(), ());
        registry
            .register(&ConstantTemplate, Selection::new(vec![0, 1]))
            .unwrap();

        let a = registry.add(&mut network, KindTag(7), 1.0, ps(0.0)).unwrap();
        let b = registry.add(&mut network, KindTag(7), 1.0, ps(1.0)).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.spec_count(KindTag(7)).unwrap().get(), 2);
        assert_eq!(network.vertex(a).unwrap().kind(), KindTag(7));
    }

    #[test]
    fn test_duplicate_registration_keeps_first_binding() {
        let mut registry = SpeciesRegistry::new();
        let first = registry
            .register(&ConstantTemplate, Selection::new(vec![0, 0]))
            .unwrap();
        let second = registry
            .register(&ConstantTemplate, Selection::new(vec![1, 1]))
            .unwrap();
        assert_eq!(second.selection(), first.selection());
        assert!(first.counter().shares(second.counter()));
    }

    #[test]
    fn test_out_of_range_selection_is_fatal() {
        let mut registry = SpeciesRegistry::new();
        let err = registry
            .register(&ConstantTemplate, Selection::new(vec![0, 3]))
            .unwrap_err();
        assert!(matches!(
            err,
            MulanError::SelectionOutOfRange {
                axis: 1,
                value: 3,
                limit: 3,
                ..
            }
        ));
        assert!(!registry.is_registered(KindTag(7)));
    }

    #[test]
    fn test_wrong_arity_is_fatal() {
        let mut registry = SpeciesRegistry::new();
        let err = registry
            .register(&ConstantTemplate, Selection::new(vec![0]))
            .unwrap_err();
        assert!(matches!(err, MulanError::SelectionLength { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_unimplemented_combination_is_fatal() {
        let mut registry = SpeciesRegistry::new();
        let err = registry
            .register(&ConstantTemplate, Selection::new(vec![1, 2]))
            .unwrap_err();
        assert!(matches!(err, MulanError::NoVariant { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unregistered_kind() {
        let registry = SpeciesRegistry::new();
        let mut network = Network::<Euler>::new(NetworkSettings::default(), ());
        let err = registry
            .add(&mut network, KindTag(3), 1.0, ps(0.0))
            .unwrap_err();
        assert!(matches!(err, MulanError::UnregisteredKind(KindTag(3))));
        assert!(registry.spec_count(KindTag(3)).is_err());
        assert_eq!(network.vertex_count(), 0);
    }
}
