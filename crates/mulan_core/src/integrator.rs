//! Pluggable per-species stepping strategies.
//!
//! An [`Integrator`] owns one species' scalar state, the scratch space of its
//! internal stages, and the aggregation accumulators ([`Sums`]) the network
//! fills between stages. The network calls [`Integrator::step`] once per stage,
//! [`Integrator::STAGES`] times per outer step, so the integrator always knows
//! which stage it is in.
//!
//! Two schemes ship with the engine:
//! - [`Euler`]: single stage, fixed step, error estimate for reporting only.
//! - [`CashKarp`]: six-stage embedded Runge-Kutta 4(5) with step-size control.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Rate callback handed to [`Integrator::step`]: `(value, stage_offset, sums) -> dx/dt`.
pub type RateFn<'a> = dyn FnMut(f64, f64, &mut Sums) -> Result<f64> + 'a;

/// Per-species aggregation accumulators, grown on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sums {
    values: Vec<f64>,
}

impl Sums {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator at `index`; unset slots read as `0.0`.
    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, index: usize, value: f64) {
        self.ensure(index);
        self.values[index] = value;
    }

    pub fn add(&mut self, index: usize, amount: f64) {
        self.ensure(index);
        self.values[index] += amount;
    }

    /// Zeroes every accumulator, keeping the allocation.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    fn ensure(&mut self, index: usize) {
        if index >= self.values.len() {
            self.values.resize(index + 1, 0.0);
        }
    }
}

/// Stepping strategy bound to one species.
pub trait Integrator: Debug + Clone {
    /// Internal stages per outer step.
    const STAGES: usize;

    /// Run-wide settings shared by every instance (tolerances, safety factor).
    type Settings: Debug + Clone + Default;

    fn new(value: f64) -> Self;

    /// Value the current stage evaluates at; the committed value between steps.
    fn value(&self) -> f64;

    fn set_value(&mut self, value: f64);

    fn sums(&self) -> &Sums;

    fn sums_mut(&mut self) -> &mut Sums;

    fn clear_sums(&mut self) {
        self.sums_mut().clear();
    }

    /// Index of the stage the next call to [`Integrator::step`] performs.
    fn stage(&self) -> usize;

    /// Performs the current stage and advances to the next one.
    fn step(&mut self, dt: f64, rate: &mut RateFn<'_>) -> Result<()>;

    /// Local error estimate of the last completed outer step.
    fn error(&self) -> f64;

    /// Drops the error estimate and stage rates of the last step.
    fn clear_error(&mut self);

    /// Folds this species' preferred next dt into `suggestion` (running minimum).
    fn suggest_step(&self, _settings: &Self::Settings, _dt: f64, _suggestion: &mut Option<f64>) {}

    /// Network-wide hook after all species suggested.
    fn consolidate_step(_settings: &Self::Settings, _suggestion: &mut Option<f64>) {}
}

/// Explicit forward Euler.
#[derive(Debug, Clone, PartialEq)]
pub struct Euler {
    value: f64,
    sums: Sums,
    last_dxdt: f64,
    last_dt: f64,
}

impl Euler {
    /// Rate evaluated during the last step.
    #[must_use]
    pub fn last_dxdt(&self) -> f64 {
        self.last_dxdt
    }
}

impl Integrator for Euler {
    const STAGES: usize = 1;
    type Settings = ();

    fn new(value: f64) -> Self {
        Self {
            value,
            sums: Sums::new(),
            last_dxdt: 0.0,
            last_dt: 0.0,
        }
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    fn sums(&self) -> &Sums {
        &self.sums
    }

    fn sums_mut(&mut self) -> &mut Sums {
        &mut self.sums
    }

    fn stage(&self) -> usize {
        0
    }

    fn step(&mut self, dt: f64, rate: &mut RateFn<'_>) -> Result<()> {
        let dxdt = rate(self.value, 0.0, &mut self.sums)?;
        self.last_dxdt = dxdt;
        self.last_dt = dt;
        self.value += dxdt * dt;
        Ok(())
    }

    fn error(&self) -> f64 {
        0.5 * self.last_dxdt * self.last_dt * self.last_dt
    }

    fn clear_error(&mut self) {
        self.last_dxdt = 0.0;
        self.last_dt = 0.0;
    }
}

/// Step-size control of [`CashKarp`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CashKarpSettings {
    /// Error each species aims for per step.
    pub target_error: f64,
    /// Safety factor (< 1) applied to every suggestion.
    pub beta: f64,
    /// Ceiling on the ratio between suggested and current dt; unbounded by default.
    pub max_growth: f64,
    /// Largest dt the network is ever handed.
    pub max_dt: f64,
}

impl Default for CashKarpSettings {
    fn default() -> Self {
        Self {
            target_error: 0.1,
            beta: 0.95,
            max_growth: f64::INFINITY,
            max_dt: 1.0,
        }
    }
}

const CK_STAGES: usize = 6;

const CK_C: [f64; CK_STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 3.0 / 5.0, 1.0, 7.0 / 8.0];

// Row i feeds stage i from the rates of stages 0..i.
const CK_A: [[f64; CK_STAGES - 1]; CK_STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0],
    [3.0 / 10.0, -9.0 / 10.0, 6.0 / 5.0, 0.0, 0.0],
    [-11.0 / 54.0, 5.0 / 2.0, -70.0 / 27.0, 35.0 / 27.0, 0.0],
    [
        1631.0 / 55296.0,
        175.0 / 512.0,
        575.0 / 13824.0,
        44275.0 / 110592.0,
        253.0 / 4096.0,
    ],
];

const CK_B5: [f64; CK_STAGES] = [
    37.0 / 378.0,
    0.0,
    250.0 / 621.0,
    125.0 / 594.0,
    0.0,
    512.0 / 1771.0,
];

const CK_B4: [f64; CK_STAGES] = [
    2825.0 / 27648.0,
    0.0,
    18575.0 / 48384.0,
    13525.0 / 55296.0,
    277.0 / 14336.0,
    1.0 / 4.0,
];

/// Cash-Karp embedded Runge-Kutta 4(5).
///
/// `ys[0]` holds the committed value; `ys[i]` for `i > 0` is the value stage `i`
/// evaluates at, built from the rates of the earlier stages of the same step.
#[derive(Debug, Clone, PartialEq)]
pub struct CashKarp {
    ys: [f64; CK_STAGES],
    ks: [f64; CK_STAGES],
    stage: usize,
    sums: Sums,
    error: f64,
}

impl CashKarp {
    /// Rate of the first stage of the last step.
    #[must_use]
    pub fn last_dxdt(&self) -> f64 {
        self.ks[0]
    }

    /// Time offset of `stage` as a fraction of dt.
    #[must_use]
    pub fn stage_fraction(stage: usize) -> f64 {
        CK_C[stage % CK_STAGES]
    }
}

impl Integrator for CashKarp {
    const STAGES: usize = CK_STAGES;
    type Settings = CashKarpSettings;

    fn new(value: f64) -> Self {
        Self {
            ys: [value; CK_STAGES],
            ks: [0.0; CK_STAGES],
            stage: 0,
            sums: Sums::new(),
            error: 0.0,
        }
    }

    fn value(&self) -> f64 {
        self.ys[self.stage]
    }

    fn set_value(&mut self, value: f64) {
        self.ys[self.stage] = value;
    }

    fn sums(&self) -> &Sums {
        &self.sums
    }

    fn sums_mut(&mut self) -> &mut Sums {
        &mut self.sums
    }

    fn stage(&self) -> usize {
        self.stage
    }

    fn step(&mut self, dt: f64, rate: &mut RateFn<'_>) -> Result<()> {
        let s = self.stage;
        self.ks[s] = rate(self.ys[s], CK_C[s] * dt, &mut self.sums)?;

        let next = s + 1;
        if next < CK_STAGES {
            let increment: f64 = CK_A[next][..next]
                .iter()
                .zip(&self.ks[..next])
                .map(|(a, k)| a * k)
                .sum();
            self.ys[next] = self.ys[0] + dt * increment;
            self.stage = next;
        } else {
            let mut fifth = 0.0;
            let mut diff = 0.0;
            for i in 0..CK_STAGES {
                fifth += CK_B5[i] * self.ks[i];
                diff += (CK_B5[i] - CK_B4[i]) * self.ks[i];
            }
            self.ys[0] += dt * fifth;
            self.error = dt * diff;
            self.stage = 0;
        }
        Ok(())
    }

    fn error(&self) -> f64 {
        self.error
    }

    fn clear_error(&mut self) {
        self.ks = [0.0; CK_STAGES];
        self.error = 0.0;
    }

    fn suggest_step(&self, settings: &CashKarpSettings, dt: f64, suggestion: &mut Option<f64>) {
        if self.error == 0.0 {
            return;
        }
        let q = (settings.target_error / self.error).abs();
        if !q.is_finite() {
            return;
        }
        let proposed = suggested_dt(settings, dt, q);
        *suggestion = Some(suggestion.map_or(proposed, |current| current.min(proposed)));
    }

    fn consolidate_step(settings: &CashKarpSettings, suggestion: &mut Option<f64>) {
        if let Some(dt) = suggestion {
            *dt = dt.min(settings.max_dt);
        }
    }
}

/// Controller response for error ratio `q = |target / estimate|`.
#[must_use]
pub fn suggested_dt(settings: &CashKarpSettings, dt: f64, q: f64) -> f64 {
    let exponent = if q < 1.0 { 0.25 } else { 0.2 };
    (dt * settings.beta * q.powf(exponent)).min(dt * settings.max_growth)
}
