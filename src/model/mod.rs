//! Engine modules re-exported under one path.

pub use mulan_core::{Integrator, MulanError, Network, Species, SpeciesRegistry};
pub mod config {
    pub use mulan_core::config::*;
}
pub mod integrator {
    pub use mulan_core::integrator::*;
}
pub mod network {
    pub use mulan_core::network::*;
}
pub mod registry {
    pub use mulan_core::registry::*;
}
pub mod species {
    pub use mulan_core::species::*;
}
pub mod macarthur {
    pub use mulan_core::macarthur::*;
}
pub mod metrics {
    pub use mulan_core::metrics::*;
}
pub mod data {
    pub use mulan_data::*;
}
