//! Plain data shared by the MuLAN engine, its model runner and reporting code.

pub mod data;

pub use data::parameter_space::{InteractionVector, KindTag, ParameterSpace, Trait, TRAIT_SIZE};
pub use data::selection::Selection;
pub use data::summary::{EdgeSummary, VertexSummary};
