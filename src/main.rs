use anyhow::{Context, Result};
use clap::Parser;
use mulan_lib::app::run_model;
use mulan_lib::model::config::ModelConfig;
use mulan_lib::model::metrics::init_logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model configuration file
    #[arg(short, long, default_value = "model.toml")]
    config: PathBuf,

    /// Mutation windows to run (overrides run.steps)
    #[arg(short, long)]
    steps: Option<u64>,

    /// RNG seed (overrides run.seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Append the final network in DOT format
    #[arg(long)]
    dot: bool,
}

fn load_config(path: &PathBuf) -> Result<ModelConfig> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(ModelConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ModelConfig::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = load_config(&args.config)?;
    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }

    let report = run_model(config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    if args.dot {
        println!("{}", report.dot);
    }
    Ok(())
}
