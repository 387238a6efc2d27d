use super::{CONSUMER, PRODUCER};
use crate::error::{MulanError, Result};
use crate::registry::SpeciesTemplate;
use crate::species::{EdgeSides, PopulationCounter, RateInput, Species};
use mulan_data::{InteractionVector, KindTag, ParameterSpace, Selection};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::rc::Rc;

/// Functional response of a consumer to the producers it feeds on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFunction {
    None,
    #[default]
    Linear,
    LinearCut,
    #[serde(rename = "type_2")]
    TypeTwo,
    #[serde(rename = "type_3")]
    TypeThree,
}

impl ResponseFunction {
    pub const COUNT: usize = 5;

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::Linear => 1,
            Self::LinearCut => 2,
            Self::TypeTwo => 3,
            Self::TypeThree => 4,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::None),
            1 => Some(Self::Linear),
            2 => Some(Self::LinearCut),
            3 => Some(Self::TypeTwo),
            4 => Some(Self::TypeThree),
            _ => None,
        }
    }
}

/// Consumer: `dx/dt = x R (b sum0 - m)`, gains delayed by the delay line.
///
/// Parameters `[R, b, m, c, h]`: rate scale, conversion efficiency, mortality,
/// cost of a wide niche and handling time. Trait `[p, y]`: niche position and
/// niche width.
#[derive(Debug)]
pub struct Consumer {
    response: ResponseFunction,
    delay: usize,
    counter: PopulationCounter,
}

impl Consumer {
    #[must_use]
    pub fn new(response: ResponseFunction, delay: usize, counter: PopulationCounter) -> Self {
        Self {
            response,
            delay,
            counter,
        }
    }

    #[must_use]
    pub fn response(&self) -> ResponseFunction {
        self.response
    }
}

impl Species for Consumer {
    fn name(&self) -> &str {
        "consumer"
    }

    fn sum_size(&self) -> usize {
        2
    }

    fn delay(&self) -> usize {
        self.delay
    }

    fn dxdt(&self, input: RateInput<'_>) -> Result<f64> {
        let ps = &*input.parameters;
        let (r, b, m) = (ps.param(0), ps.param(1), ps.param(2));
        let rate = input.value * r * (b * input.sums.get(0) - m);
        input.sums.clear();
        Ok(input.delay.feed(rate))
    }

    fn interaction_coefficient(
        &self,
        this: &ParameterSpace,
        other: &ParameterSpace,
    ) -> InteractionVector {
        if other.kind != PRODUCER {
            return InteractionVector::scalar(0.0);
        }
        let cost = this.param(3);
        let width = this.traits[1];
        let k = (other.traits[0] - this.traits[0]) / width;
        let weight = (-cost * width).exp() / ((2.0 * PI).sqrt() * width) * (-0.5 * k * k).exp();
        InteractionVector::scalar(weight)
    }

    fn edge_aggregate(
        &self,
        level: usize,
        weights: &InteractionVector,
        mut sides: EdgeSides<'_>,
    ) -> Result<()> {
        let v = weights.weight(0);
        let own = sides.this().value;
        let prey = sides.other().value;
        match (self.response, level) {
            (ResponseFunction::Linear, 0) => {
                sides.add_to_this(0, prey * v);
                sides.add_to_other(0, own * v);
            }
            (ResponseFunction::Linear, _) => {}
            (ResponseFunction::TypeTwo | ResponseFunction::TypeThree, 0) => {
                sides.add_to_this(1, prey * v);
            }
            (ResponseFunction::TypeTwo, _) => {
                let handling = sides.this().parameters.param(4);
                let saturated = v / (1.0 + sides.this().sums.get(1) * handling);
                sides.add_to_this(0, prey * saturated);
                sides.add_to_other(0, own * saturated);
            }
            (ResponseFunction::TypeThree, _) => {
                let saturated = v / (1.0 + sides.this().sums.get(1));
                sides.add_to_this(0, prey * prey * saturated);
                sides.add_to_other(0, own * prey * saturated);
            }
            (ResponseFunction::None | ResponseFunction::LinearCut, _) => {
                return Err(MulanError::invalid_selector(format!(
                    "No valid response function: {:?}",
                    self.response
                )));
            }
        }
        Ok(())
    }

    fn derived_metrics(&self, parameters: &ParameterSpace) -> Vec<(&'static str, f64)> {
        vec![("niche_width", parameters.traits[1])]
    }

    fn counter(&self) -> &PopulationCounter {
        &self.counter
    }
}

/// Consumer variants: axis 0 picks the [`ResponseFunction`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerTemplate {
    /// Delay line length of every consumer.
    pub delay: usize,
}

impl ConsumerTemplate {
    #[must_use]
    pub fn selection(response: ResponseFunction) -> Selection {
        Selection::new(vec![response.index()])
    }
}

impl SpeciesTemplate for ConsumerTemplate {
    fn kind(&self) -> KindTag {
        CONSUMER
    }

    fn name(&self) -> &str {
        "consumer"
    }

    fn axes(&self) -> Vec<usize> {
        vec![ResponseFunction::COUNT]
    }

    fn resolve(
        &self,
        selection: &Selection,
        counter: PopulationCounter,
    ) -> Option<Rc<dyn Species>> {
        let response = ResponseFunction::from_index(selection.choice(0)?)?;
        Some(Rc::new(Consumer::new(response, self.delay, counter)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::Sums;
    use crate::species::{DelayLine, NetworkContext, Side};

    fn consumer(response: ResponseFunction) -> Consumer {
        Consumer::new(response, 0, PopulationCounter::new())
    }

    fn consumer_space(p: f64, y: f64) -> ParameterSpace {
        ParameterSpace::new(CONSUMER, [p, y], vec![0.7, 0.8, 5.0, 0.0, 2.0])
    }

    fn producer_space(p: f64) -> ParameterSpace {
        ParameterSpace::new(PRODUCER, [p, 0.0], vec![10.0, 100.0])
    }

    /// Runs one aggregation level on a consumer/producer pair and returns both sums.
    fn aggregate(
        species: &Consumer,
        level: usize,
        weight: f64,
        consumer: (f64, &mut Sums),
        producer: (f64, &mut Sums),
    ) -> Result<()> {
        let cps = consumer_space(0.0, 2.0);
        let pps = producer_space(0.0);
        let sides = EdgeSides::pair(
            Side {
                value: consumer.0,
                parameters: &cps,
                sums: consumer.1,
            },
            Side {
                value: producer.0,
                parameters: &pps,
                sums: producer.1,
            },
        );
        species.edge_aggregate(level, &InteractionVector::scalar(weight), sides)
    }

    #[test]
    fn test_coefficient_matches_gaussian_kernel() {
        let c = consumer(ResponseFunction::Linear);
        let this = consumer_space(0.0, 2.0);
        let at_center = c.interaction_coefficient(&this, &producer_space(0.0));
        let expected = 1.0 / ((2.0 * PI).sqrt() * 2.0);
        assert!((at_center.weight(0) - expected).abs() < 1e-12);

        let one_width = c.interaction_coefficient(&this, &producer_space(2.0));
        assert!((one_width.weight(0) - expected * (-0.5f64).exp()).abs() < 1e-12);

        let far = c.interaction_coefficient(&this, &producer_space(50.0));
        assert!(!far.exceeds(1e-2));
    }

    #[test]
    fn test_no_coefficient_between_consumers() {
        let c = consumer(ResponseFunction::Linear);
        let this = consumer_space(0.0, 2.0);
        assert_eq!(c.interaction_coefficient(&this, &this).weight(0), 0.0);
    }

    #[test]
    fn test_linear_response() {
        let c = consumer(ResponseFunction::Linear);
        let (mut own, mut prey) = (Sums::new(), Sums::new());
        aggregate(&c, 0, 0.5, (4.0, &mut own), (10.0, &mut prey)).unwrap();
        assert_eq!(own.get(0), 5.0);
        assert_eq!(prey.get(0), 2.0);
        aggregate(&c, 1, 0.5, (4.0, &mut own), (10.0, &mut prey)).unwrap();
        assert_eq!(own.get(0), 5.0);
    }

    #[test]
    fn test_type_two_saturates() {
        let c = consumer(ResponseFunction::TypeTwo);
        let (mut own, mut prey) = (Sums::new(), Sums::new());
        aggregate(&c, 0, 0.5, (4.0, &mut own), (10.0, &mut prey)).unwrap();
        assert_eq!(own.get(1), 5.0);
        aggregate(&c, 1, 0.5, (4.0, &mut own), (10.0, &mut prey)).unwrap();
        // h = 2: 0.5 / (1 + 5 * 2)
        let w = 0.5 / 11.0;
        assert!((own.get(0) - 10.0 * w).abs() < 1e-12);
        assert!((prey.get(0) - 4.0 * w).abs() < 1e-12);
    }

    #[test]
    fn test_type_three_squares_prey() {
        let c = consumer(ResponseFunction::TypeThree);
        let (mut own, mut prey) = (Sums::new(), Sums::new());
        aggregate(&c, 0, 0.5, (4.0, &mut own), (10.0, &mut prey)).unwrap();
        aggregate(&c, 1, 0.5, (4.0, &mut own), (10.0, &mut prey)).unwrap();
        let w = 0.5 / 6.0;
        assert!((own.get(0) - 100.0 * w).abs() < 1e-12);
        assert!((prey.get(0) - 40.0 * w).abs() < 1e-12);
    }

    #[test]
    fn test_unhandled_response_is_rejected() {
        for response in [ResponseFunction::None, ResponseFunction::LinearCut] {
            let c = consumer(response);
            let (mut own, mut prey) = (Sums::new(), Sums::new());
            let err = aggregate(&c, 0, 0.5, (4.0, &mut own), (10.0, &mut prey)).unwrap_err();
            assert!(matches!(err, MulanError::InvalidSelector(_)));
        }
    }

    #[test]
    fn test_rate_and_delay() {
        let c = Consumer::new(ResponseFunction::Linear, 1, PopulationCounter::new());
        let mut ps = consumer_space(0.0, 2.0);
        let mut delay = DelayLine::new(c.delay());
        let env = [100.0, 10.0];
        let context = NetworkContext {
            time: 0.0,
            env_params: &env,
            bm_threshold: 0.05,
        };
        let mut eval = |x: f64, food: f64| {
            let mut sums = Sums::new();
            sums.add(0, food);
            c.dxdt(RateInput {
                value: x,
                offset: 0.0,
                sums: &mut sums,
                parameters: &mut ps,
                delay: &mut delay,
                context: &context,
            })
            .unwrap()
        };
        // gain 10 * 0.7 * (0.8 * 10 - 5) = 21 is held back one evaluation
        assert_eq!(eval(10.0, 10.0), 0.0);
        let loss = 10.0 * 0.7 * (0.8 * 0.0 - 5.0);
        assert!((eval(10.0, 0.0) - (loss + 21.0)).abs() < 1e-9);
    }

    #[test]
    fn test_niche_width_metric() {
        let c = consumer(ResponseFunction::Linear);
        let metrics = c.derived_metrics(&consumer_space(1.0, 3.5));
        assert_eq!(metrics, vec![("niche_width", 3.5)]);
    }

    #[test]
    fn test_template_axes() {
        let template = ConsumerTemplate { delay: 3 };
        assert_eq!(template.axes(), vec![ResponseFunction::COUNT]);
        let species = template
            .resolve(&ConsumerTemplate::selection(ResponseFunction::TypeTwo), PopulationCounter::new())
            .unwrap();
        assert_eq!(species.delay(), 3);
        assert!(template
            .resolve(&Selection::new(vec![5]), PopulationCounter::new())
            .is_none());
    }
}
