use super::{ConsumerTemplate, ProducerTemplate, CONSUMER, PRODUCER};
use crate::config::{ModelConfig, ProducerSeed};
use crate::error::Result;
use crate::integrator::Integrator;
use crate::metrics::StepMetrics;
use crate::network::{Network, Vertex, VertexId};
use crate::registry::SpeciesRegistry;
use crate::species::PopulationCounter;
use mulan_data::{ParameterSpace, TRAIT_SIZE};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Live producer and consumer counts.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationReport {
    pub producers: i64,
    pub consumers: i64,
}

/// End-of-run report.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub time: f64,
    pub windows: u64,
    pub integrations: u64,
    pub producers: i64,
    pub consumers: i64,
    pub vertices: usize,
    pub edges: usize,
    pub dt: f64,
    pub min_dt: Option<f64>,
    pub max_dt: Option<f64>,
    pub fingerprint: String,
}

/// Runner of the MacArthur model on integrator `I`.
#[derive(Debug)]
pub struct MacArthurModel<I: Integrator> {
    config: ModelConfig,
    network: Network<I>,
    registry: SpeciesRegistry,
    producers: PopulationCounter,
    consumers: PopulationCounter,
    mutable_traits: [bool; TRAIT_SIZE],
    rng: ChaCha8Rng,
    dt: f64,
    dts: Vec<f64>,
    metrics: StepMetrics,
}

impl<I: Integrator> MacArthurModel<I> {
    /// Registers both kinds and seeds the initial community.
    ///
    /// `config` is expected to have passed [`ModelConfig::validate`].
    pub fn new(config: ModelConfig, integrator_settings: I::Settings) -> Result<Self> {
        let mut network = Network::new(config.network.settings(), integrator_settings);
        network.set_env_params(config.network.effective_env_params());

        let mut registry = SpeciesRegistry::new();
        let producers = registry
            .register(
                &ProducerTemplate,
                ProducerTemplate::selection(config.producer.interaction, config.network.env_func),
            )?
            .counter()
            .clone();
        let consumers = registry
            .register(
                &ConsumerTemplate {
                    delay: config.consumer.delay,
                },
                ConsumerTemplate::selection(config.consumer.response),
            )?
            .counter()
            .clone();

        let mutable_traits = [
            config.mutation.enabled[0] && config.consumer.fixed_p.is_none(),
            config.mutation.enabled[1] && config.consumer.fixed_y.is_none(),
        ];
        let mut model = Self {
            rng: ChaCha8Rng::seed_from_u64(config.run.seed),
            dt: config.run.dt,
            metrics: StepMetrics::new(config.run.log_interval),
            config,
            network,
            registry,
            producers,
            consumers,
            mutable_traits,
            dts: Vec::new(),
        };
        model.initialize_producers()?;
        model.initialize_consumers()?;
        tracing::info!(
            producers = model.producers.get(),
            consumers = model.consumers.get(),
            edges = model.network.edge_count(),
            "Model initialized"
        );
        Ok(model)
    }

    fn initialize_producers(&mut self) -> Result<()> {
        for (mass, parameters) in producer_seeds(&self.config) {
            self.registry
                .add(&mut self.network, PRODUCER, mass, parameters)?;
        }
        tracing::debug!(count = self.producers.get(), "Producers initialized");
        Ok(())
    }

    fn initialize_consumers(&mut self) -> Result<()> {
        for (mass, parameters) in consumer_seeds(&self.config) {
            self.registry
                .add(&mut self.network, CONSUMER, mass, parameters)?;
        }
        tracing::debug!(count = self.consumers.get(), "Consumers initialized");
        Ok(())
    }

    /// Integrates one mutation window of length `dt2`, then mutates.
    pub fn perform_step(&mut self) -> Result<()> {
        let dt2 = self.config.run.dt2;
        let min_dt = self.config.run.min_dt;
        let mut elapsed = 0.0;
        let mut dt = self.dt;
        let mut clamped = false;
        while elapsed <= dt2 {
            elapsed += dt;
            if self.config.run.record_dts {
                self.dts.push(dt);
            }
            self.metrics.record_dt(dt);

            let next = self.network.step(dt)?;
            // a step shortened to fit the window does not set the pace of the next window
            if !clamped {
                self.dt = next.max(min_dt);
            }
            dt = next;
            clamped = elapsed + dt > dt2;
            if clamped {
                dt = dt2 - elapsed;
            }
            if dt < min_dt {
                dt = min_dt;
            }
        }

        self.mutation()?;
        let report = self.monitor();
        self.metrics
            .record_window(self.network.time(), report.producers, report.consumers);
        Ok(())
    }

    /// Shifts consumer traits at random; a shifted trait founds a new species.
    ///
    /// Consumers are re-seeded when none is left alive.
    pub fn mutation(&mut self) -> Result<()> {
        let rate = self.config.mutation.rate;
        let change = self.config.mutation.change;
        let min_mass = 5.0 * self.network.settings().bm_threshold;

        let parents: Vec<VertexId> = self
            .network
            .vertices()
            .filter(|v| v.is_active() && v.kind() == CONSUMER)
            .map(Vertex::id)
            .collect();

        for id in parents {
            let Some(parent) = self.network.vertex(id) else {
                continue;
            };
            let mass = parent.mass();
            let mut parameters = parent.parameters().clone();

            let mut changed = false;
            for axis in 0..TRAIT_SIZE {
                if !self.mutable_traits[axis] {
                    continue;
                }
                let draw: f64 = self.rng.gen();
                if draw < rate && mass > min_mass {
                    let shift = if draw < rate / 2.0 {
                        -change[axis]
                    } else {
                        change[axis]
                    };
                    parameters.traits[axis] += shift;
                    changed |= shift != 0.0;
                }
            }
            if !changed {
                continue;
            }

            let child = self
                .registry
                .add(&mut self.network, CONSUMER, 0.01 * mass, parameters)?;
            self.network.set_mass(id, 0.99 * mass)?;
            tracing::debug!(parent = id, child, "Consumer mutated");
        }

        if self.consumers.get() <= 0 {
            tracing::info!(time = self.network.time(), "Consumers extinct, re-seeding");
            self.initialize_consumers()?;
        }
        Ok(())
    }

    /// Current population counts, also logged at debug level.
    pub fn monitor(&self) -> PopulationReport {
        let report = PopulationReport {
            producers: self.producers.get(),
            consumers: self.consumers.get(),
        };
        tracing::debug!(
            producers = report.producers,
            consumers = report.consumers,
            "Monitor"
        );
        report
    }

    /// Runs `windows` mutation windows.
    pub fn run(&mut self, windows: u64) -> Result<RunSummary> {
        for _ in 0..windows {
            self.perform_step()?;
        }
        Ok(self.summary())
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            time: self.network.time(),
            windows: self.metrics.windows(),
            integrations: self.metrics.integrations(),
            producers: self.producers.get(),
            consumers: self.consumers.get(),
            vertices: self.network.vertex_count(),
            edges: self.network.edge_count(),
            dt: self.dt,
            min_dt: self.metrics.min_dt(),
            max_dt: self.metrics.max_dt(),
            fingerprint: self.config.fingerprint(),
        }
    }

    #[must_use]
    pub fn network(&self) -> &Network<I> {
        &self.network
    }

    #[must_use]
    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// dt the next integration will use.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Drains the recorded dts (empty unless `run.record_dts` is set).
    pub fn take_dts(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.dts)
    }
}

/// Initial producers as `(mass, parameter space)` in seeding order.
#[must_use]
pub fn producer_seeds(config: &ModelConfig) -> Vec<(f64, ParameterSpace)> {
    let env = config.network.effective_env_params();
    let capacity = config.network.env_func;
    let threshold = config.network.bm_threshold;
    let producer = &config.producer;
    let s = |z: f64| capacity.evaluate(&env, z, 0.0);
    let space = |z: f64| ParameterSpace::new(PRODUCER, [z, 0.0], vec![producer.r, s(z)]);

    let mut seeds = Vec::new();
    for seed in &producer.init {
        match seed {
            ProducerSeed::Gaussian => {
                let trait_max = producer.trait_max.unwrap_or(f64::MAX);
                seeds.push((producer.init_mass, space(0.0)));
                let mut z = 1.0;
                while s(z) > threshold && z < trait_max {
                    seeds.push((producer.init_mass, space(z)));
                    seeds.push((producer.init_mass, space(-z)));
                    z += 1.0;
                }
            }
            ProducerSeed::Range { start, end, step } => {
                let (mut z, end) = if end < start {
                    (*end, *start)
                } else {
                    (*start, *end)
                };
                while z < end {
                    seeds.push((producer.init_mass, space(z)));
                    z += step;
                }
            }
            ProducerSeed::Single { position, mass } => {
                seeds.push((mass.unwrap_or(producer.init_mass), space(*position)));
            }
        }
    }
    seeds
}

/// Initial consumers as `(mass, parameter space)` with global overrides applied.
#[must_use]
pub fn consumer_seeds(config: &ModelConfig) -> Vec<(f64, ParameterSpace)> {
    let consumer = &config.consumer;
    let param_overrides = [
        (1, consumer.b),
        (2, consumer.m),
        (3, consumer.fixed_c),
        (4, consumer.fixed_h),
    ];
    consumer
        .init
        .iter()
        .map(|seed| {
            let mut traits = seed.traits;
            if let Some(p) = consumer.fixed_p {
                traits[0] = p;
            }
            if let Some(y) = consumer.fixed_y {
                traits[1] = y;
            }
            let mut params = seed.params.clone();
            for (index, value) in param_overrides {
                if let Some(value) = value {
                    if params.len() <= index {
                        params.resize(index + 1, 0.0);
                    }
                    params[index] = value;
                }
            }
            (seed.mass, ParameterSpace::new(CONSUMER, traits, params))
        })
        .collect()
}
