//! The interaction network.
//!
//! Vertices live in an append-only arena indexed by their id; edges live in a
//! second arena and every vertex keeps its outgoing and incoming edge ids in
//! insertion order. Nothing is ever removed: extinction only clears the
//! active flag and zeroes the mass. All iteration follows insertion order,
//! which keeps floating point summation order (and therefore results)
//! reproducible.
//!
//! ## Step sequence
//!
//! ```text
//! time += dt
//! for stage in 0..I::STAGES
//!     aggregate(0), aggregate(1), ..., aggregate(levels - 1)
//!     advance every active vertex by one stage
//!     on the last stage: suggest dt, prune below bm_threshold, consolidate
//! ```

use crate::error::{MulanError, Result};
use crate::integrator::Integrator;
use crate::species::{DelayLine, EdgeSides, NetworkContext, RateInput, Side, Species};
use mulan_data::{
    EdgeSummary, InteractionVector, KindTag, ParameterSpace, Trait, VertexSummary,
};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use std::rc::Rc;

pub type VertexId = usize;
pub type EdgeId = usize;

/// Scalar settings of the network.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkSettings {
    /// Minimum coefficient for an edge to materialize (strict).
    pub interaction_tolerance: f64,
    /// Mass below which an active species goes extinct (strict).
    pub bm_threshold: f64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            interaction_tolerance: 1e-3,
            bm_threshold: 0.05,
        }
    }
}

/// A species in the network.
#[derive(Debug)]
pub struct Vertex<I: Integrator> {
    id: VertexId,
    active: bool,
    parameters: ParameterSpace,
    integrator: I,
    delay: DelayLine,
    species: Rc<dyn Species>,
    out_edges: Vec<EdgeId>,
    in_edges: Vec<EdgeId>,
}

impl<I: Integrator> Vertex<I> {
    #[must_use]
    pub fn id(&self) -> VertexId {
        self.id
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn mass(&self) -> f64 {
        self.integrator.value()
    }

    #[must_use]
    pub fn traits(&self) -> Trait {
        self.parameters.traits
    }

    #[must_use]
    pub fn kind(&self) -> KindTag {
        self.parameters.kind
    }

    /// Live parameters of the instance; may drift from the key it was indexed under.
    #[must_use]
    pub fn parameters(&self) -> &ParameterSpace {
        &self.parameters
    }

    #[must_use]
    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    #[must_use]
    pub fn species(&self) -> &Rc<dyn Species> {
        &self.species
    }

    /// Kind-specific metrics plus the integrator's last error estimate.
    #[must_use]
    pub fn derived_metrics(&self) -> Vec<(&'static str, f64)> {
        let mut metrics = self.species.derived_metrics(&self.parameters);
        metrics.push(("error", self.integrator.error()));
        metrics
    }

    #[must_use]
    pub fn summary(&self) -> VertexSummary {
        VertexSummary {
            id: self.id,
            kind: self.kind(),
            active: self.active,
            mass: self.mass(),
            traits: self.traits(),
            metrics: self
                .derived_metrics()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    fn side(&mut self) -> Side<'_> {
        Side {
            value: self.integrator.value(),
            parameters: &self.parameters,
            sums: self.integrator.sums_mut(),
        }
    }

    fn advance(&mut self, dt: f64, context: &NetworkContext<'_>) -> Result<()> {
        let Vertex {
            integrator,
            parameters,
            delay,
            species,
            ..
        } = self;
        integrator.step(dt, &mut |value, offset, sums| {
            species.dxdt(RateInput {
                value,
                offset,
                sums,
                parameters: &mut *parameters,
                delay: &mut *delay,
                context,
            })
        })
    }
}

/// Directed interaction, evaluated once when the later endpoint was created.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub weights: InteractionVector,
}

/// Graph of species and their interactions.
#[derive(Debug)]
pub struct Network<I: Integrator> {
    vertices: Vec<Vertex<I>>,
    edges: Vec<Edge>,
    index: HashMap<ParameterSpace, VertexId>,
    time: f64,
    settings: NetworkSettings,
    integrator_settings: I::Settings,
    env_params: Vec<f64>,
    levels: usize,
}

impl<I: Integrator> Network<I> {
    #[must_use]
    pub fn new(settings: NetworkSettings, integrator_settings: I::Settings) -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            index: HashMap::new(),
            time: 0.0,
            settings,
            integrator_settings,
            env_params: Vec::new(),
            levels: 0,
        }
    }

    /// Adds `mass` of the species keyed by `parameters`.
    ///
    /// A known key gains the mass (and is revived if extinct); a new key gets a
    /// fresh vertex whose edges are computed against every existing vertex.
    pub fn add(
        &mut self,
        mass: f64,
        parameters: ParameterSpace,
        species: Rc<dyn Species>,
    ) -> VertexId {
        if let Some(&id) = self.index.get(&parameters) {
            let vertex = &mut self.vertices[id];
            let value = vertex.integrator.value();
            vertex.integrator.set_value(value + mass);
            if !vertex.active {
                vertex.active = true;
                vertex.species.count(1);
                tracing::debug!(id, kind = %vertex.kind(), mass, "Species reactivated");
            }
            return id;
        }

        let id = self.vertices.len();
        self.levels = self.levels.max(species.sum_size());
        let delay = DelayLine::new(species.delay());
        self.index.insert(parameters.clone(), id);
        self.vertices.push(Vertex {
            id,
            active: true,
            parameters,
            integrator: I::new(mass),
            delay,
            species: Rc::clone(&species),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
        });
        self.add_edges(id);
        species.count(1);
        tracing::debug!(
            id,
            kind = %self.vertices[id].kind(),
            mass,
            out_degree = self.out_degree(id),
            in_degree = self.in_degree(id),
            "Species created"
        );
        id
    }

    fn add_edges(&mut self, new: VertexId) {
        let tolerance = self.settings.interaction_tolerance;
        for other in 0..self.vertices.len() {
            let forward = {
                let n = &self.vertices[new];
                n.species
                    .interaction_coefficient(&n.parameters, &self.vertices[other].parameters)
            };
            if forward.exceeds(tolerance) {
                self.push_edge(new, other, forward);
            }
            if other == new {
                continue;
            }
            let backward = {
                let o = &self.vertices[other];
                o.species
                    .interaction_coefficient(&o.parameters, &self.vertices[new].parameters)
            };
            if backward.exceeds(tolerance) {
                self.push_edge(other, new, backward);
            }
        }
    }

    fn push_edge(&mut self, source: VertexId, target: VertexId, weights: InteractionVector) {
        let id = self.edges.len();
        self.edges.push(Edge {
            source,
            target,
            weights,
        });
        self.vertices[source].out_edges.push(id);
        self.vertices[target].in_edges.push(id);
    }

    /// One full pass over all edges at aggregation `level`.
    ///
    /// For every active source and every outgoing edge with an active target,
    /// the source's hook runs with the target as `other`.
    pub fn aggregate(&mut self, level: usize) -> Result<()> {
        for source in 0..self.vertices.len() {
            if !self.vertices[source].active {
                continue;
            }
            let species = Rc::clone(&self.vertices[source].species);
            for slot in 0..self.vertices[source].out_edges.len() {
                let edge_id = self.vertices[source].out_edges[slot];
                let edge = &self.edges[edge_id];
                if !self.vertices[edge.target].active {
                    continue;
                }
                let sides = edge_sides(&mut self.vertices, source, edge.target);
                species.edge_aggregate(level, &edge.weights, sides)?;
            }
        }
        Ok(())
    }

    /// Every level in increasing order.
    pub fn aggregate_all(&mut self) -> Result<()> {
        for level in 0..self.levels {
            self.aggregate(level)?;
        }
        Ok(())
    }

    /// Advances the network by `dt` and returns the dt for the next call.
    ///
    /// The input `dt` is returned unchanged when no species suggested one.
    /// A `min_dt` floor is the caller's business.
    pub fn step(&mut self, dt: f64) -> Result<f64> {
        self.time += dt;
        let mut suggestion = None;
        for stage in 0..I::STAGES {
            self.aggregate_all()?;
            let last = stage + 1 == I::STAGES;
            let context = NetworkContext {
                time: self.time,
                env_params: &self.env_params,
                bm_threshold: self.settings.bm_threshold,
            };
            for vertex in self.vertices.iter_mut().filter(|v| v.active) {
                vertex.advance(dt, &context)?;
                if !last {
                    continue;
                }
                vertex
                    .integrator
                    .suggest_step(&self.integrator_settings, dt, &mut suggestion);
                if vertex.integrator.value() < context.bm_threshold {
                    vertex.integrator.set_value(0.0);
                    vertex.integrator.clear_error();
                    vertex.delay.reset();
                    vertex.active = false;
                    vertex.species.count(-1);
                    tracing::debug!(id = vertex.id, kind = %vertex.kind(), time = self.time, "Species went extinct");
                }
            }
            if last {
                I::consolidate_step(&self.integrator_settings, &mut suggestion);
            }
        }
        Ok(suggestion.unwrap_or(dt))
    }

    /// Vertex indexed under `parameters`.
    pub fn lookup(&self, parameters: &ParameterSpace) -> Result<VertexId> {
        self.index
            .get(parameters)
            .copied()
            .ok_or_else(|| MulanError::unknown_parameter_space(format!("{parameters:?}")))
    }

    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex<I>> {
        self.vertices.get(id)
    }

    /// All vertices in creation order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<I>> {
        self.vertices.iter()
    }

    /// All edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn out_edges(&self, id: VertexId) -> impl Iterator<Item = &Edge> {
        self.edge_list(id, |v| &v.out_edges)
    }

    pub fn in_edges(&self, id: VertexId) -> impl Iterator<Item = &Edge> {
        self.edge_list(id, |v| &v.in_edges)
    }

    fn edge_list<'a>(
        &'a self,
        id: VertexId,
        list: impl Fn(&'a Vertex<I>) -> &'a Vec<EdgeId>,
    ) -> impl Iterator<Item = &'a Edge> {
        self.vertices
            .get(id)
            .map(list)
            .into_iter()
            .flatten()
            .map(move |e| &self.edges[*e])
    }

    #[must_use]
    pub fn out_degree(&self, id: VertexId) -> usize {
        self.vertices.get(id).map_or(0, |v| v.out_edges.len())
    }

    #[must_use]
    pub fn in_degree(&self, id: VertexId) -> usize {
        self.vertices.get(id).map_or(0, |v| v.in_edges.len())
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of active vertices of `kind`.
    #[must_use]
    pub fn active_count(&self, kind: KindTag) -> usize {
        self.vertices
            .iter()
            .filter(|v| v.active && v.kind() == kind)
            .count()
    }

    /// Overwrites the mass of an active vertex. Extinct vertices stay at zero.
    pub fn set_mass(&mut self, id: VertexId, mass: f64) -> Result<()> {
        let vertex = self
            .vertices
            .get_mut(id)
            .ok_or(MulanError::UnknownVertex(id))?;
        if !vertex.active {
            return Err(MulanError::InactiveVertex(id));
        }
        vertex.integrator.set_value(mass);
        Ok(())
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    #[must_use]
    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    /// Applies to edges of vertices created from now on.
    pub fn set_interaction_tolerance(&mut self, tolerance: f64) {
        self.settings.interaction_tolerance = tolerance;
    }

    pub fn set_bm_threshold(&mut self, threshold: f64) {
        self.settings.bm_threshold = threshold;
    }

    #[must_use]
    pub fn integrator_settings(&self) -> &I::Settings {
        &self.integrator_settings
    }

    pub fn integrator_settings_mut(&mut self) -> &mut I::Settings {
        &mut self.integrator_settings
    }

    #[must_use]
    pub fn env_params(&self) -> &[f64] {
        &self.env_params
    }

    pub fn set_env_params(&mut self, params: Vec<f64>) {
        self.env_params = params;
    }

    /// Aggregation levels run per stage.
    #[must_use]
    pub fn levels(&self) -> usize {
        self.levels
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<VertexSummary> {
        self.vertices.iter().map(Vertex::summary).collect()
    }

    #[must_use]
    pub fn edge_summaries(&self) -> Vec<EdgeSummary> {
        self.edges
            .iter()
            .map(|e| EdgeSummary {
                source: e.source,
                target: e.target,
                weights: e.weights.to_vec(),
            })
            .collect()
    }

    /// Snapshot as a petgraph graph; node indices equal vertex ids.
    #[must_use]
    pub fn to_graph(&self) -> DiGraph<VertexSummary, InteractionVector> {
        let mut graph = DiGraph::with_capacity(self.vertices.len(), self.edges.len());
        for vertex in &self.vertices {
            graph.add_node(vertex.summary());
        }
        for edge in &self.edges {
            graph.add_edge(
                NodeIndex::new(edge.source),
                NodeIndex::new(edge.target),
                edge.weights.clone(),
            );
        }
        graph
    }

    /// Export to Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph Network {\n");
        dot.push_str("  node [shape=ellipse, style=filled, fontname=\"Arial\"];\n");
        for vertex in &self.vertices {
            let color = if vertex.active { "#e8f5e9" } else { "#eeeeee" };
            let _ = writeln!(
                dot,
                "  {} [label=\"{} #{}\\nmass {:.3}\\ntrait {:.2}\", fillcolor=\"{}\"];",
                vertex.id,
                vertex.species.name(),
                vertex.id,
                vertex.mass(),
                vertex.parameters.traits[0],
                color
            );
        }
        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "  {} -> {} [label=\"{:.3}\"];",
                edge.source,
                edge.target,
                edge.weights.weight(0)
            );
        }
        dot.push_str("}\n");
        dot
    }
}

fn edge_sides<I: Integrator>(
    vertices: &mut [Vertex<I>],
    this: VertexId,
    other: VertexId,
) -> EdgeSides<'_> {
    if this == other {
        return EdgeSides::single(vertices[this].side());
    }
    if this < other {
        let (low, high) = vertices.split_at_mut(other);
        EdgeSides::pair(low[this].side(), high[0].side())
    } else {
        let (low, high) = vertices.split_at_mut(this);
        EdgeSides::pair(high[0].side(), low[other].side())
    }
}
