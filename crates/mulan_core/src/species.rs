//! Species capability contract.
//!
//! A species kind is bound once per run to a shared behaviour object
//! implementing [`Species`]; every vertex of that kind carries its own
//! parameter space, integrator and delay line and hands them to the behaviour
//! object on each call. Nothing here holds a reference to the network: the
//! read-only network state a rate function needs arrives as a
//! [`NetworkContext`].

use crate::error::Result;
use crate::integrator::Sums;
use mulan_data::{InteractionVector, ParameterSpace};
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::rc::Rc;

/// Live population count of one registered variant.
///
/// Cloning yields another handle to the same counter.
#[derive(Debug, Clone, Default)]
pub struct PopulationCounter(Rc<Cell<i64>>);

impl PopulationCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> i64 {
        self.0.get()
    }

    pub fn add(&self, delta: i64) {
        self.0.set(self.0.get() + delta);
    }

    /// True when both handles point at the same counter.
    #[must_use]
    pub fn shares(&self, other: &PopulationCounter) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Read-only network state visible to rate functions.
#[derive(Debug, Clone, Copy)]
pub struct NetworkContext<'a> {
    /// Simulation time at the end of the step in progress.
    pub time: f64,
    /// Environment parameters of the network.
    pub env_params: &'a [f64],
    pub bm_threshold: f64,
}

/// Fixed-length FIFO that holds back positive rates for a number of evaluations.
///
/// Losses pass immediately and are added to whatever gain leaves the line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelayLine {
    slots: VecDeque<f64>,
}

impl DelayLine {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            slots: std::iter::repeat(0.0).take(len).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pushes `rate` through the line and returns the effective rate.
    pub fn feed(&mut self, rate: f64) -> f64 {
        if self.slots.is_empty() {
            return rate;
        }
        let (incoming, passthrough) = if rate >= 0.0 { (rate, 0.0) } else { (0.0, rate) };
        self.slots.push_back(incoming);
        let released = self.slots.pop_front().unwrap_or(0.0);
        passthrough + released
    }

    /// Drops every queued gain, keeping the length.
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = 0.0);
    }
}

/// Everything a rate function may read or update for one evaluation.
pub struct RateInput<'a> {
    /// Value of the species at the current stage.
    pub value: f64,
    /// Time offset of the current stage within the step.
    pub offset: f64,
    pub sums: &'a mut Sums,
    /// Instance parameters; may be refreshed in place (never re-keys the vertex).
    pub parameters: &'a mut ParameterSpace,
    pub delay: &'a mut DelayLine,
    pub context: &'a NetworkContext<'a>,
}

/// One endpoint of an edge during aggregation.
pub struct Side<'a> {
    pub value: f64,
    pub parameters: &'a ParameterSpace,
    pub sums: &'a mut Sums,
}

/// Both endpoints of an edge handed to [`Species::edge_aggregate`].
///
/// `this` is the vertex whose hook runs; for a self-edge `other` aliases
/// `this`.
pub struct EdgeSides<'a> {
    this: Side<'a>,
    other: Option<Side<'a>>,
}

impl<'a> EdgeSides<'a> {
    #[must_use]
    pub fn pair(this: Side<'a>, other: Side<'a>) -> Self {
        Self {
            this,
            other: Some(other),
        }
    }

    #[must_use]
    pub fn single(this: Side<'a>) -> Self {
        Self { this, other: None }
    }

    #[must_use]
    pub fn is_self_edge(&self) -> bool {
        self.other.is_none()
    }

    #[must_use]
    pub fn this(&self) -> &Side<'a> {
        &self.this
    }

    #[must_use]
    pub fn other(&self) -> &Side<'a> {
        self.other.as_ref().unwrap_or(&self.this)
    }

    pub fn this_mut(&mut self) -> &mut Side<'a> {
        &mut self.this
    }

    pub fn other_mut(&mut self) -> &mut Side<'a> {
        match self.other.as_mut() {
            Some(side) => side,
            None => &mut self.this,
        }
    }

    /// Adds `amount` to this species' accumulator at `index`.
    pub fn add_to_this(&mut self, index: usize, amount: f64) {
        self.this.sums.add(index, amount);
    }

    /// Adds `amount` to the other species' accumulator at `index`.
    pub fn add_to_other(&mut self, index: usize, amount: f64) {
        self.other_mut().sums.add(index, amount);
    }
}

/// Behaviour shared by every species of one registered variant.
pub trait Species: Debug {
    /// Human-readable kind name used in diagnostics.
    fn name(&self) -> &str;

    /// Number of aggregation levels this variant reads.
    fn sum_size(&self) -> usize;

    /// Length of the per-instance delay line.
    fn delay(&self) -> usize {
        0
    }

    /// Differential rate at the current stage. Clears the accumulators it consumed.
    fn dxdt(&self, input: RateInput<'_>) -> Result<f64>;

    /// Coefficients describing how strongly `other` couples to `this`.
    ///
    /// Pure in both parameter spaces; evaluated once per ordered pair.
    fn interaction_coefficient(
        &self,
        this: &ParameterSpace,
        other: &ParameterSpace,
    ) -> InteractionVector;

    /// Accumulates one edge at aggregation `level`.
    fn edge_aggregate(
        &self,
        level: usize,
        weights: &InteractionVector,
        sides: EdgeSides<'_>,
    ) -> Result<()>;

    /// Kind-specific values exposed for reporting.
    fn derived_metrics(&self, _parameters: &ParameterSpace) -> Vec<(&'static str, f64)> {
        Vec::new()
    }

    fn counter(&self) -> &PopulationCounter;

    fn count(&self, delta: i64) {
        self.counter().add(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mulan_data::KindTag;

    #[test]
    fn test_counter_handles_share_state() {
        let counter = PopulationCounter::new();
        let handle = counter.clone();
        handle.add(3);
        counter.add(-1);
        assert_eq!(counter.get(), 2);
        assert!(counter.shares(&handle));
        assert!(!counter.shares(&PopulationCounter::new()));
    }

    #[test]
    fn test_delay_line_holds_gains() {
        let mut line = DelayLine::new(2);
        assert_eq!(line.feed(1.0), 0.0);
        assert_eq!(line.feed(2.0), 0.0);
        assert_eq!(line.feed(3.0), 1.0);
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn test_delay_line_passes_losses() {
        let mut line = DelayLine::new(1);
        assert_eq!(line.feed(4.0), 0.0);
        assert_eq!(line.feed(-1.0), 3.0);
        assert_eq!(line.feed(-1.0), -1.0);
    }

    #[test]
    fn test_delay_line_reset_drops_gains() {
        let mut line = DelayLine::new(2);
        line.feed(1.0);
        line.feed(2.0);
        line.reset();
        assert_eq!(line.len(), 2);
        assert_eq!(line.feed(0.0), 0.0);
        assert_eq!(line.feed(0.0), 0.0);
    }

    #[test]
    fn test_empty_delay_line_is_identity() {
        let mut line = DelayLine::new(0);
        assert_eq!(line.feed(-2.5), -2.5);
        assert_eq!(line.feed(2.5), 2.5);
    }

    #[test]
    fn test_self_edge_aliases_sides() {
        let ps = ParameterSpace::new(KindTag(0), [0.0, 0.0], vec![]);
        let mut sums = Sums::new();
        let mut sides = EdgeSides::single(Side {
            value: 4.0,
            parameters: &ps,
            sums: &mut sums,
        });
        assert!(sides.is_self_edge());
        assert_eq!(sides.other().value, 4.0);
        sides.add_to_other(1, 2.0);
        sides.add_to_this(1, 1.0);
        drop(sides);
        assert_eq!(sums.get(1), 3.0);
    }
}
