//! Data modules.

pub mod parameter_space;
pub mod selection;
pub mod summary;
