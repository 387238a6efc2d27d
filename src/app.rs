//! Running a configured model to completion.

use crate::model::config::{IntegratorScheme, ModelConfig};
use anyhow::Context;
use mulan_core::integrator::{CashKarp, Euler, Integrator};
use mulan_core::macarthur::{MacArthurModel, RunSummary};
use mulan_data::VertexSummary;
use serde::Serialize;
use std::fmt;

/// Outcome of a complete run.
#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// Weakly connected groups in the final network, extinct vertices included.
    pub groups: usize,
    pub vertices: Vec<VertexSummary>,
    #[serde(skip)]
    pub dot: String,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "time         {:.4}", s.time)?;
        writeln!(f, "windows      {}", s.windows)?;
        writeln!(f, "integrations {}", s.integrations)?;
        writeln!(f, "producers    {}", s.producers)?;
        writeln!(f, "consumers    {}", s.consumers)?;
        writeln!(f, "vertices     {} ({} groups)", s.vertices, self.groups)?;
        writeln!(f, "edges        {}", s.edges)?;
        match (s.min_dt, s.max_dt) {
            (Some(min), Some(max)) => writeln!(f, "dt           {min:.3e} .. {max:.3e}")?,
            _ => writeln!(f, "dt           -")?,
        }
        write!(f, "config       {}", &s.fingerprint[..12.min(s.fingerprint.len())])
    }
}

/// Runs `config` for `run.steps` windows with the configured integrator.
pub fn run_model(config: ModelConfig) -> anyhow::Result<RunReport> {
    config.validate().context("Invalid configuration")?;
    match config.integrator.scheme {
        IntegratorScheme::Rkck => {
            let settings = config.integrator.cash_karp();
            run_with::<CashKarp>(config, settings)
        }
        IntegratorScheme::Euler => run_with::<Euler>(config, ()),
    }
}

fn run_with<I: Integrator>(config: ModelConfig, settings: I::Settings) -> anyhow::Result<RunReport> {
    let windows = config.run.steps;
    let mut model =
        MacArthurModel::<I>::new(config, settings).context("Failed to initialize model")?;
    tracing::info!(windows, "Starting run");
    let summary = model.run(windows).context("Simulation failed")?;

    let network = model.network();
    let graph = network.to_graph();
    let groups = petgraph::algo::connected_components(&graph);
    tracing::info!(
        time = summary.time,
        producers = summary.producers,
        consumers = summary.consumers,
        groups,
        "Run finished"
    );

    Ok(RunReport {
        groups,
        vertices: network.summaries(),
        dot: network.to_dot(),
        summary,
    })
}
