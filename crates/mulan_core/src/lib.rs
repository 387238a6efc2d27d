//! # Mulan Core
//!
//! The simulation engine of Mulan, a network model of interacting species.
//!
//! This crate contains:
//! - Numerical integrators (forward Euler and adaptive Cash-Karp)
//! - The species abstraction and the registry binding one variant per kind
//! - The interaction network with multi-level aggregation and extinction
//! - The MacArthur consumer-resource model and its runner
//! - Configuration, run metrics and structured logging
//!
//! ## Architecture
//!
//! A [`network::Network`] owns one vertex per distinct parameter space. Each
//! vertex carries its own integrator state and a shared [`species::Species`]
//! implementation selected through the [`registry::SpeciesRegistry`]. Edges
//! are created once, when a vertex is added, wherever the interaction
//! coefficient exceeds the network's tolerance. A step aggregates edge
//! contributions level by level, advances every active vertex and lets the
//! integrator suggest the next step size.
//!
//! ## Example
//!
//! ```
//! use mulan_core::config::ModelConfig;
//! use mulan_core::integrator::Euler;
//! use mulan_core::macarthur::MacArthurModel;
//!
//! let mut config = ModelConfig::default();
//! config.run.dt2 = 0.1;
//!
//! let mut model = MacArthurModel::<Euler>::new(config, ())?;
//! let summary = model.run(2)?;
//! assert_eq!(summary.windows, 2);
//! assert!(summary.producers > 0);
//! # Ok::<(), mulan_core::error::MulanError>(())
//! ```

/// Typed run configuration loaded from TOML
pub mod config;
/// Error types of the engine
pub mod error;
/// Euler and Cash-Karp integrators
pub mod integrator;
/// MacArthur consumer-resource model
pub mod macarthur;
/// Run statistics and logging setup
pub mod metrics;
/// Interaction network
pub mod network;
/// Kind to variant bindings
pub mod registry;
/// Species behavior and per-vertex inputs
pub mod species;

pub use error::{MulanError, Result};
pub use integrator::{CashKarp, CashKarpSettings, Euler, Integrator};
pub use network::{Network, NetworkSettings, VertexId};
pub use registry::{SpeciesRegistry, SpeciesTemplate};
pub use species::{PopulationCounter, Species};
