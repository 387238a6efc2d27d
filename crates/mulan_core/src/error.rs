//! Error types for the network engine.
//!
//! Fatal conditions raised while resolving species variants, adding species
//! or evaluating a species' own sub-configuration. Extinction is never an
//! error; it is handled by deactivation.

use mulan_data::{KindTag, Selection};
use thiserror::Error;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum MulanError {
    /// `add` or `spec_count` for a kind that was never registered
    #[error("Species kind {0} is not registered")]
    UnregisteredKind(KindTag),

    /// Selection tuple has the wrong number of axes
    #[error("Selection for {kind} has {found} axes, expected {expected}")]
    SelectionLength {
        kind: KindTag,
        expected: usize,
        found: usize,
    },

    /// A selection value lies outside its declared range
    #[error("Selection value {value} on axis {axis} of {kind} is out of range (0..{limit})")]
    SelectionOutOfRange {
        kind: KindTag,
        axis: usize,
        value: usize,
        limit: usize,
    },

    /// No concrete variant matches an otherwise valid selection
    #[error("Could not create organism: no variant of {kind} for selection {selection}")]
    NoVariant { kind: KindTag, selection: Selection },

    /// A species kind met an internal selector it has no branch for
    #[error("Invalid argument: {0}")]
    InvalidSelector(String),

    /// Lookup of a parameter space that is not indexed
    #[error("No species with parameter space {0}")]
    UnknownParameterSpace(String),

    /// Vertex id outside the arena
    #[error("Vertex {0} does not exist")]
    UnknownVertex(usize),

    /// Mass write to an extinct vertex; revive it through `Network::add`
    #[error("Vertex {0} is extinct")]
    InactiveVertex(usize),

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<MulanError>,
    },
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, MulanError>;

impl MulanError {
    /// Creates a new invalid selector error.
    #[must_use]
    pub fn invalid_selector<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSelector(msg.into())
    }

    /// Creates a new unknown parameter space error.
    #[must_use]
    pub fn unknown_parameter_space<S: Into<String>>(key: S) -> Self {
        Self::UnknownParameterSpace(key.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True for errors raised while binding species variants at startup.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::SelectionLength { .. }
            | Self::SelectionOutOfRange { .. }
            | Self::NoVariant { .. } => true,
            Self::Context { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MulanError::invalid_selector("response function 2");
        assert_eq!(err.to_string(), "Invalid argument: response function 2");
    }

    #[test]
    fn test_error_context() {
        let err = MulanError::UnregisteredKind(KindTag(4)).with_context("seeding consumers");
        assert!(err.to_string().contains("seeding consumers"));
        assert!(err.to_string().contains("kind#4"));
    }

    #[test]
    fn test_configuration_classification() {
        let err = MulanError::SelectionOutOfRange {
            kind: KindTag(1),
            axis: 0,
            value: 9,
            limit: 5,
        };
        assert!(err.is_configuration());
        assert!(err.with_context("register").is_configuration());
        assert!(!MulanError::UnknownVertex(3).is_configuration());
        assert!(!MulanError::InactiveVertex(3).is_configuration());
    }
}
