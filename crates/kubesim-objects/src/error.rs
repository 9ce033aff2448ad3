//! Materialization error types.

use thiserror::Error;

/// Errors raised while building a canonical object.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaterializeError {
    #[error("{kind} \"{name}\" is missing required field {field}")]
    MissingField {
        kind: String,
        name: String,
        field: String,
    },

    #[error("{kind} \"{name}\" has invalid field {field}: {reason}")]
    InvalidField {
        kind: String,
        name: String,
        field: String,
        reason: String,
    },
}

pub type MaterializeResult<T> = Result<T, MaterializeError>;
