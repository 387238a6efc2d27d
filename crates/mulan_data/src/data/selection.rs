use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered tuple of enumerated choices, one per configurable axis of a kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct Selection(pub Vec<usize>);

impl Selection {
    #[must_use]
    pub fn new(choices: Vec<usize>) -> Self {
        Self(choices)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Choice on `axis`, if present.
    #[must_use]
    pub fn choice(&self, axis: usize) -> Option<usize> {
        self.0.get(axis).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<usize>> for Selection {
    fn from(choices: Vec<usize>) -> Self {
        Self(choices)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, choice) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{choice}")?;
        }
        write!(f, ")")
    }
}
