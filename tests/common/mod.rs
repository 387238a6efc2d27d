use mulan_lib::model::data::{KindTag, ParameterSpace};
use mulan_lib::model::integrator::Integrator;
use mulan_lib::model::macarthur::{
    CarryingCapacity, ConsumerTemplate, ProducerInteraction, ProducerTemplate, ResponseFunction,
    CONSUMER, PRODUCER,
};
use mulan_lib::model::network::{Network, NetworkSettings, VertexId};
use mulan_lib::model::registry::SpeciesRegistry;

/// Builds a MacArthur network vertex by vertex, in insertion order.
#[allow(dead_code)]
pub struct NetworkBuilder<I: Integrator> {
    settings: NetworkSettings,
    integrator_settings: I::Settings,
    env_params: Vec<f64>,
    interaction: ProducerInteraction,
    capacity: CarryingCapacity,
    response: ResponseFunction,
    delay: usize,
    seeds: Vec<(KindTag, f64, ParameterSpace)>,
}

#[allow(dead_code)]
impl<I: Integrator> NetworkBuilder<I> {
    pub fn new(integrator_settings: I::Settings) -> Self {
        Self {
            settings: NetworkSettings::default(),
            integrator_settings,
            env_params: vec![100.0, 10.0],
            interaction: ProducerInteraction::None,
            capacity: CarryingCapacity::Gaussian,
            response: ResponseFunction::Linear,
            delay: 0,
            seeds: Vec::new(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.settings.interaction_tolerance = tolerance;
        self
    }

    pub fn with_bm_threshold(mut self, threshold: f64) -> Self {
        self.settings.bm_threshold = threshold;
        self
    }

    pub fn with_env_params(mut self, params: Vec<f64>) -> Self {
        self.env_params = params;
        self
    }

    pub fn with_interaction(mut self, interaction: ProducerInteraction) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn with_response(mut self, response: ResponseFunction) -> Self {
        self.response = response;
        self
    }

    pub fn with_delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    /// Producer at niche position `z` with params `[r, K]`.
    pub fn with_producer(mut self, mass: f64, z: f64, r: f64, k: f64) -> Self {
        let ps = ParameterSpace::new(PRODUCER, [z, 0.0], vec![r, k]);
        self.seeds.push((PRODUCER, mass, ps));
        self
    }

    /// Consumer with trait `[p, y]` and params `[R, b, m, c, h]`.
    pub fn with_consumer(mut self, mass: f64, traits: [f64; 2], params: Vec<f64>) -> Self {
        let ps = ParameterSpace::new(CONSUMER, traits, params);
        self.seeds.push((CONSUMER, mass, ps));
        self
    }

    pub fn registry(&self) -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::new();
        registry
            .register(
                &ProducerTemplate,
                ProducerTemplate::selection(self.interaction, self.capacity),
            )
            .expect("producer registration");
        registry
            .register(
                &ConsumerTemplate { delay: self.delay },
                ConsumerTemplate::selection(self.response),
            )
            .expect("consumer registration");
        registry
    }

    /// Network, its registry and the vertex id of every seed.
    pub fn build(self) -> (Network<I>, SpeciesRegistry, Vec<VertexId>) {
        let registry = self.registry();
        let mut network = Network::new(self.settings, self.integrator_settings);
        network.set_env_params(self.env_params);
        let ids = self
            .seeds
            .into_iter()
            .map(|(kind, mass, ps)| registry.add(&mut network, kind, mass, ps).expect("add"))
            .collect();
        (network, registry, ids)
    }
}
