//! Error types for key construction and path decoding.

use thiserror::Error;

/// Errors that can occur while building, encoding or decoding keys.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A path could not be decoded into `name_value` levels.
    #[error("could not parse path `{path}` with prefix `{prefix:?}`: {reason}")]
    Parse {
        path: String,
        prefix: Option<String>,
        reason: String,
    },

    /// A field name or value is not representable in a path segment.
    #[error("invalid field {name:?}: {reason}")]
    InvalidField { name: String, reason: String },

    /// The root prefix is not a single path component.
    #[error("invalid prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    /// The same field name was given twice within one level.
    #[error("duplicate field name: {name}")]
    DuplicateField { name: String },

    /// A level cannot expect fewer fields than it already holds.
    #[error("expected field count {expected} is smaller than the {actual} fields given")]
    ExpectedCountTooSmall { expected: usize, actual: usize },
}

/// Convenience type alias for key operations.
pub type KeyResult<T> = std::result::Result<T, KeyError>;
