//! Error types for scheme composition, splitting and record construction.
//!
//! Every error is raised at the call that caused it. An object that
//! returned an error should be rebuilt rather than reused.

use thiserror::Error;

/// Errors raised by the iteration-scheme core and the adapter layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemeError {
    /// Levels were appended after iteration had started.
    #[error("iteration scheme is frozen: cannot chain more levels after iteration started")]
    FrozenSchemeMutation,

    /// A split was requested that cannot partition the level.
    #[error("invalid split: {reason}")]
    InvalidSplit {
        /// What made the level unsplittable.
        reason: String,
    },

    /// A name cannot be used as a record field.
    #[error("invalid field name '{name}': {reason}")]
    InvalidFieldName {
        /// The offending name.
        name: String,
        /// Which rule it violates.
        reason: &'static str,
    },

    /// A record was built with a different number of values than fields.
    #[error("record has {actual} values but {expected} fields")]
    FieldCountMismatch {
        /// Number of fields.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// Name extraction hit a variable that was never named.
    #[error("variable {position} has no parameter name")]
    UnnamedVariable {
        /// Flattened position of the variable across all levels.
        position: usize,
    },

    /// A scalar was placed at a loop level, where it cannot be iterated.
    #[error("variable {index} of level {level} is a {kind}, not a sequence")]
    NotASequence {
        /// Level index within the scheme.
        level: usize,
        /// Variable index within the level.
        index: usize,
        /// Type of the offending value.
        kind: &'static str,
    },
}

impl SchemeError {
    pub(crate) fn invalid_split(reason: impl Into<String>) -> Self {
        SchemeError::InvalidSplit {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = SchemeError> = std::result::Result<T, E>;
