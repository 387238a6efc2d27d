//! MacArthur consumer-resource model built on the network engine.
//!
//! Producers (kind 0) grow logistically towards a niche-dependent carrying
//! capacity; consumers (kind 1) feed on producers whose niche position lies
//! within their niche width. The [`MacArthurModel`] runner seeds both kinds
//! from configuration, integrates the network over mutation windows and
//! mutates consumer traits between windows.

pub mod capacity;
pub mod consumer;
pub mod model;
pub mod producer;

use mulan_data::KindTag;

pub use capacity::CarryingCapacity;
pub use consumer::{Consumer, ConsumerTemplate, ResponseFunction};
pub use model::{MacArthurModel, PopulationReport, RunSummary};
pub use producer::{Producer, ProducerInteraction, ProducerTemplate};

/// Kind tag of primary producers.
pub const PRODUCER: KindTag = KindTag(0);

/// Kind tag of consumers.
pub const CONSUMER: KindTag = KindTag(1);
