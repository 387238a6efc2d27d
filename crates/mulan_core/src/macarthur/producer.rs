use super::capacity::CarryingCapacity;
use super::PRODUCER;
use crate::error::Result;
use crate::registry::SpeciesTemplate;
use crate::species::{EdgeSides, PopulationCounter, RateInput, Species};
use mulan_data::{InteractionVector, KindTag, ParameterSpace, Selection};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Competition among producers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProducerInteraction {
    /// Each producer is limited by its own mass only.
    #[default]
    None,
    /// Lotka-Volterra self-limitation routed through the network.
    #[serde(alias = "LV")]
    Lv,
}

impl ProducerInteraction {
    pub const COUNT: usize = 2;

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::Lv => 1,
        }
    }
}

/// Primary producer: `dx/dt = x (r (1 - L) - sum0)`.
///
/// Parameters `[r, K]`, trait `[niche position, unused]`. `L` is `x / K`
/// without interaction and `sum1 / K` under Lotka-Volterra, `sum0` the
/// grazing loss pushed by consumers.
#[derive(Debug)]
pub struct Producer {
    interaction: ProducerInteraction,
    capacity: CarryingCapacity,
    counter: PopulationCounter,
}

impl Producer {
    #[must_use]
    pub fn new(
        interaction: ProducerInteraction,
        capacity: CarryingCapacity,
        counter: PopulationCounter,
    ) -> Self {
        Self {
            interaction,
            capacity,
            counter,
        }
    }

    #[must_use]
    pub fn interaction(&self) -> ProducerInteraction {
        self.interaction
    }

    #[must_use]
    pub fn capacity(&self) -> CarryingCapacity {
        self.capacity
    }
}

impl Species for Producer {
    fn name(&self) -> &str {
        "producer"
    }

    fn sum_size(&self) -> usize {
        match self.interaction {
            ProducerInteraction::None => 1,
            ProducerInteraction::Lv => 2,
        }
    }

    fn dxdt(&self, input: RateInput<'_>) -> Result<f64> {
        let RateInput {
            value,
            offset,
            sums,
            parameters,
            context,
            ..
        } = input;

        if self.capacity.is_time_dependent() {
            let refreshed =
                self.capacity
                    .evaluate(context.env_params, parameters.traits[0], context.time + offset);
            if let Some(k) = parameters.params.get_mut(1) {
                *k = refreshed;
            }
        }

        let r = parameters.param(0);
        let k = parameters.param(1);
        let limitation = match self.interaction {
            ProducerInteraction::None => value / k,
            ProducerInteraction::Lv => sums.get(1) / k,
        };
        let rate = value * (r * (1.0 - limitation) - sums.get(0));
        sums.clear();
        Ok(rate)
    }

    fn interaction_coefficient(
        &self,
        this: &ParameterSpace,
        other: &ParameterSpace,
    ) -> InteractionVector {
        let weight = match self.interaction {
            ProducerInteraction::Lv if this == other => 1.0,
            _ => 0.0,
        };
        InteractionVector::scalar(weight)
    }

    fn edge_aggregate(
        &self,
        level: usize,
        weights: &InteractionVector,
        mut sides: EdgeSides<'_>,
    ) -> Result<()> {
        if self.interaction == ProducerInteraction::Lv && level == 0 {
            let amount = weights.weight(0) * sides.other().value;
            sides.add_to_other(1, amount);
        }
        Ok(())
    }

    fn counter(&self) -> &PopulationCounter {
        &self.counter
    }
}

/// Producer variants: axis 0 picks the [`ProducerInteraction`], axis 1 the
/// [`CarryingCapacity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProducerTemplate;

impl ProducerTemplate {
    #[must_use]
    pub fn selection(interaction: ProducerInteraction, capacity: CarryingCapacity) -> Selection {
        Selection::new(vec![interaction.index(), capacity.index()])
    }
}

impl SpeciesTemplate for ProducerTemplate {
    fn kind(&self) -> KindTag {
        PRODUCER
    }

    fn name(&self) -> &str {
        "producer"
    }

    fn axes(&self) -> Vec<usize> {
        vec![ProducerInteraction::COUNT, CarryingCapacity::COUNT]
    }

    fn resolve(
        &self,
        selection: &Selection,
        counter: PopulationCounter,
    ) -> Option<Rc<dyn Species>> {
        let interaction = match selection.choice(0)? {
            0 => ProducerInteraction::None,
            1 => ProducerInteraction::Lv,
            _ => return None,
        };
        let capacity = CarryingCapacity::from_index(selection.choice(1)?).ok()?;
        Some(Rc::new(Producer::new(interaction, capacity, counter)))
    }
}
