//! Configuration of a MacArthur model run.
//!
//! Strongly-typed sections mapping to a TOML file. Every section has defaults,
//! so a file only needs the values it changes. Human-readable choices such as
//! `response = "type_2"` are translated into the enumerated selections the
//! species registry binds.
//!
//! ## Example `model.toml`
//!
//! ```toml
//! [network]
//! interaction_tolerance = 0.001
//! bm_threshold = 0.05
//! env_params = [100.0, 10.0]
//! env_func = "gaussian"
//!
//! [integrator]
//! scheme = "rkck"
//! target_error = 0.1
//!
//! [run]
//! dt = 0.01
//! dt2 = 1.0
//! steps = 50
//!
//! [producer]
//! r = 1.0
//! init = [{ kind = "gaussian" }]
//!
//! [consumer]
//! response = "linear"
//! init = [{ trait = [0.0, 2.0], mass = 10.0, params = [0.7, 0.8, 5.0, 0.0, 1.0] }]
//!
//! [mutation]
//! enabled = [true, true]
//! rate = 0.05
//! ```

use crate::integrator::CashKarpSettings;
use crate::macarthur::{CarryingCapacity, ProducerInteraction, ResponseFunction};
use crate::network::NetworkSettings;
use mulan_data::{Trait, TRAIT_SIZE};
use serde::{Deserialize, Serialize};

/// Network-level settings and the environment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub interaction_tolerance: f64,
    pub bm_threshold: f64,
    /// `[S0, sigma, A, lambda, omega]`, trailing entries only for the ripple variants.
    pub env_params: Vec<f64>,
    /// Replaces `env_params[0]` when set.
    #[serde(rename = "S")]
    pub peak_capacity: Option<f64>,
    pub env_func: CarryingCapacity,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let settings = NetworkSettings::default();
        Self {
            interaction_tolerance: settings.interaction_tolerance,
            bm_threshold: settings.bm_threshold,
            env_params: vec![100.0, 10.0],
            peak_capacity: None,
            env_func: CarryingCapacity::Gaussian,
        }
    }
}

impl NetworkConfig {
    /// Environment parameters with the `S` override applied.
    #[must_use]
    pub fn effective_env_params(&self) -> Vec<f64> {
        let mut params = self.env_params.clone();
        if let (Some(peak), Some(first)) = (self.peak_capacity, params.first_mut()) {
            *first = peak;
        }
        params
    }

    #[must_use]
    pub fn settings(&self) -> NetworkSettings {
        NetworkSettings {
            interaction_tolerance: self.interaction_tolerance,
            bm_threshold: self.bm_threshold,
        }
    }
}

/// Integration scheme.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorScheme {
    /// Adaptive Cash-Karp.
    #[default]
    Rkck,
    /// Fixed-step forward Euler.
    Euler,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct IntegratorConfig {
    pub scheme: IntegratorScheme,
    /// Per-step error target of the adaptive scheme.
    #[serde(alias = "error")]
    pub target_error: f64,
    pub beta: f64,
    pub max_growth: f64,
    /// Ceiling on every step the adaptive scheme takes.
    pub max_dt: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        let ck = CashKarpSettings::default();
        Self {
            scheme: IntegratorScheme::Rkck,
            target_error: ck.target_error,
            beta: ck.beta,
            max_growth: ck.max_growth,
            max_dt: ck.max_dt,
        }
    }
}

impl IntegratorConfig {
    #[must_use]
    pub fn cash_karp(&self) -> CashKarpSettings {
        CashKarpSettings {
            target_error: self.target_error,
            beta: self.beta,
            max_growth: self.max_growth,
            max_dt: self.max_dt,
        }
    }
}

/// Time stepping of the run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Initial integration step.
    pub dt: f64,
    /// Length of one mutation window.
    pub dt2: f64,
    /// Floor applied to every dt the network suggests.
    pub min_dt: f64,
    /// Mutation windows to run.
    pub steps: u64,
    pub seed: u64,
    /// Keep every dt used, for reporting.
    pub record_dts: bool,
    /// Windows between progress log lines.
    pub log_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            dt2: 1.0,
            min_dt: 1e-6,
            steps: 100,
            seed: 42,
            record_dts: false,
            log_interval: 10,
        }
    }
}

/// Producer seeding rule.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProducerSeed {
    /// One producer per integer niche position while capacity exceeds the threshold.
    Gaussian,
    /// Evenly spaced positions in `[start, end)`.
    Range { start: f64, end: f64, step: f64 },
    /// A single producer.
    Single {
        #[serde(rename = "trait")]
        position: f64,
        mass: Option<f64>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProducerConfig {
    pub interaction: ProducerInteraction,
    /// Intrinsic growth rate.
    pub r: f64,
    pub init_mass: f64,
    /// Upper bound of the gaussian sweep.
    pub trait_max: Option<f64>,
    pub init: Vec<ProducerSeed>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interaction: ProducerInteraction::None,
            r: 1.0,
            init_mass: 10.0,
            trait_max: None,
            init: vec![ProducerSeed::Gaussian],
        }
    }
}

fn default_consumer_mass() -> f64 {
    10.0
}

fn default_consumer_params() -> Vec<f64> {
    vec![1.0]
}

/// A consumer to place at start-up.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConsumerSeed {
    #[serde(rename = "trait")]
    pub traits: Trait,
    #[serde(default = "default_consumer_mass")]
    pub mass: f64,
    #[serde(default = "default_consumer_params")]
    pub params: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConsumerConfig {
    #[serde(alias = "response_func")]
    pub response: ResponseFunction,
    /// Delay line length, in rate evaluations.
    pub delay: usize,
    pub init: Vec<ConsumerSeed>,
    /// Overrides niche position of every seed and freezes its mutation.
    pub fixed_p: Option<f64>,
    /// Overrides niche width of every seed and freezes its mutation.
    pub fixed_y: Option<f64>,
    /// Overrides handling time (`params[4]`).
    pub fixed_h: Option<f64>,
    /// Overrides niche cost (`params[3]`).
    pub fixed_c: Option<f64>,
    /// Overrides mortality (`params[2]`).
    pub m: Option<f64>,
    /// Overrides conversion efficiency (`params[1]`).
    pub b: Option<f64>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            response: ResponseFunction::Linear,
            delay: 0,
            init: vec![ConsumerSeed {
                traits: [0.0, 2.0],
                mass: default_consumer_mass(),
                params: vec![0.7, 0.8, 5.0, 0.0, 1.0],
            }],
            fixed_p: None,
            fixed_y: None,
            fixed_h: None,
            fixed_c: None,
            m: None,
            b: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MutationConfig {
    /// Per trait axis.
    pub enabled: [bool; TRAIT_SIZE],
    /// Probability per axis and window.
    pub rate: f64,
    /// Trait shift per axis.
    pub change: Trait,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            enabled: [true, true],
            rate: 0.05,
            change: [3.0, 1.0],
        }
    }
}

/// Complete run configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ModelConfig {
    pub network: NetworkConfig,
    pub integrator: IntegratorConfig,
    pub run: RunConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub mutation: MutationConfig,
}

impl ModelConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Network validation
        anyhow::ensure!(
            self.network.interaction_tolerance >= 0.0,
            "Interaction tolerance must be non-negative"
        );
        anyhow::ensure!(
            self.network.bm_threshold >= 0.0,
            "Biomass threshold must be non-negative"
        );
        let needed = match self.network.env_func {
            CarryingCapacity::Gaussian => 2,
            CarryingCapacity::GaussCos => 4,
            CarryingCapacity::GaussCosTd | CarryingCapacity::GaussCos2Td => 5,
        };
        anyhow::ensure!(
            self.network.env_params.len() >= needed,
            "env_func {:?} needs {} environment parameters, got {}",
            self.network.env_func,
            needed,
            self.network.env_params.len()
        );
        anyhow::ensure!(
            self.network.env_params[1] != 0.0,
            "Environment width (env_params[1]) must be non-zero"
        );
        if needed >= 4 {
            anyhow::ensure!(
                self.network.env_params[3] != 0.0,
                "Ripple wavelength (env_params[3]) must be non-zero"
            );
        }

        // Integrator validation
        anyhow::ensure!(
            self.integrator.target_error > 0.0,
            "Target error must be positive"
        );
        anyhow::ensure!(
            self.integrator.beta > 0.0 && self.integrator.beta <= 1.0,
            "Safety factor beta must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            self.integrator.max_growth >= 1.0,
            "Max growth must be at least 1.0"
        );
        anyhow::ensure!(
            self.integrator.max_dt > 0.0 && self.integrator.max_dt.is_finite(),
            "Max dt must be positive and finite"
        );

        // Run validation
        anyhow::ensure!(self.run.dt > 0.0, "dt must be positive");
        anyhow::ensure!(self.run.dt2 > 0.0, "dt2 must be positive");
        anyhow::ensure!(self.run.min_dt > 0.0, "min_dt must be positive");
        anyhow::ensure!(
            self.run.min_dt <= self.run.dt2,
            "min_dt must not exceed dt2"
        );
        anyhow::ensure!(self.run.log_interval > 0, "Log interval must be positive");

        // Producer validation
        anyhow::ensure!(self.producer.r >= 0.0, "Producer growth rate must be non-negative");
        anyhow::ensure!(self.producer.init_mass > 0.0, "Producer initial mass must be positive");
        for seed in &self.producer.init {
            match seed {
                ProducerSeed::Gaussian => anyhow::ensure!(
                    self.network.env_func == CarryingCapacity::Gaussian
                        || self.producer.trait_max.is_some(),
                    "Gaussian seeding on a rippled environment needs trait_max"
                ),
                ProducerSeed::Range { step, .. } => {
                    anyhow::ensure!(*step > 0.0, "Range step must be positive")
                }
                ProducerSeed::Single { mass, .. } => anyhow::ensure!(
                    mass.map_or(true, |m| m > 0.0),
                    "Producer seed mass must be positive"
                ),
            }
        }

        // Consumer validation
        for seed in &self.consumer.init {
            anyhow::ensure!(seed.mass > 0.0, "Consumer seed mass must be positive");
        }

        // Mutation validation
        anyhow::ensure!(
            self.mutation.rate >= 0.0 && self.mutation.rate <= 1.0,
            "Mutation rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.mutation.change.iter().all(|c| c.is_finite()),
            "Mutation change must be finite"
        );

        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.network).as_bytes());
        hasher.update(format!("{:?}", self.integrator).as_bytes());
        hasher.update(format!("{:?}", self.run).as_bytes());
        hasher.update(format!("{:?}", self.producer).as_bytes());
        hasher.update(format!("{:?}", self.consumer).as_bytes());
        hasher.update(format!("{:?}", self.mutation).as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_min_dt() {
        let config = ModelConfig {
            run: RunConfig {
                min_dt: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_beta() {
        let config = ModelConfig {
            integrator: IntegratorConfig {
                beta: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_dt_reaches_cash_karp() {
        let mut config = ModelConfig::default();
        config.integrator.max_dt = 0.25;
        assert!(config.validate().is_ok());
        assert_eq!(config.integrator.cash_karp().max_dt, 0.25);
        assert!(config.integrator.cash_karp().max_growth.is_infinite());

        config.integrator.max_dt = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ripple_needs_parameters() {
        let config = ModelConfig {
            network: NetworkConfig {
                env_func: CarryingCapacity::GaussCosTd,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rippled_gaussian_sweep_needs_bound() {
        let mut config = ModelConfig {
            network: NetworkConfig {
                env_params: vec![100.0, 10.0, 5.0, 2.0],
                env_func: CarryingCapacity::GaussCos,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.producer.trait_max = Some(20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_mutation_rate() {
        let config = ModelConfig {
            mutation: MutationConfig {
                rate: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial_document() {
        let config = ModelConfig::from_toml(
            r#"
            [network]
            env_params = [100.0, 100.0]
            S = 50.0

            [integrator]
            scheme = "euler"
            error = 0.5

            [producer]
            interaction = "LV"
            init = [{ kind = "single", trait = 0.0 }, { kind = "range", start = 1.0, end = 3.0, step = 1.0 }]

            [consumer]
            response_func = "type_2"
            init = [{ trait = [0.0, 2.0] }]
            "#,
        )
        .unwrap();
        assert_eq!(config.integrator.scheme, IntegratorScheme::Euler);
        assert_eq!(config.integrator.target_error, 0.5);
        assert_eq!(config.producer.interaction, ProducerInteraction::Lv);
        assert_eq!(config.consumer.response, ResponseFunction::TypeTwo);
        assert_eq!(config.consumer.init[0].mass, 10.0);
        assert_eq!(config.consumer.init[0].params, vec![1.0]);
        assert_eq!(config.network.effective_env_params(), vec![50.0, 100.0]);
        assert_eq!(
            config.producer.init[0],
            ProducerSeed::Single {
                position: 0.0,
                mass: None
            }
        );
        assert_eq!(config.run, RunConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        assert!(ModelConfig::from_toml("[run]\ndt = -1.0\n").is_err());
        assert!(ModelConfig::from_toml("[consumer]\nresponse = \"type_9\"\n").is_err());
    }

    #[test]
    fn test_fingerprint_consistency() {
        let config1 = ModelConfig::default();
        let config2 = ModelConfig::default();
        assert_eq!(config1.fingerprint(), config2.fingerprint());

        let mut config3 = ModelConfig::default();
        config3.mutation.rate = 0.2;
        assert_ne!(config1.fingerprint(), config3.fingerprint());
    }
}
