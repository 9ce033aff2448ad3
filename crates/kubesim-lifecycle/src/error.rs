//! Lifecycle engine error types.

use kubesim_objects::MaterializeError;
use kubesim_selector::SelectorError;
use kubesim_state::StateError;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// The API layer maps these onto HTTP status codes via
/// [`EngineError::status_code`] and [`EngineError::reason`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("namespaces \"{0}\" not found")]
    NamespaceNotFound(String),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Materialization(#[from] MaterializeError),

    #[error("state store error: {0}")]
    State(#[from] StateError),

    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// `<resource> "<name>" not found`
    pub fn not_found(resource: &str, name: &str) -> Self {
        Self::NotFound(format!("{resource} \"{name}\" not found"))
    }

    /// `<resource> "<name>" already exists`
    pub fn already_exists(resource: &str, name: &str) -> Self {
        Self::AlreadyExists(format!("{resource} \"{name}\" already exists"))
    }

    /// Path or sub-operation with no handler behind it.
    pub fn unknown_resource() -> Self {
        Self::NotFound("the server could not find the requested resource".into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::NamespaceNotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            _ => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::NamespaceNotFound(_) => "NotFound",
            Self::AlreadyExists(_) => "AlreadyExists",
            _ => "InternalServerError",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_and_codes() {
        let err = EngineError::already_exists("pods", "a");
        assert_eq!(err.to_string(), "pods \"a\" already exists");
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.reason(), "AlreadyExists");

        let err = EngineError::NamespaceNotFound("ghost".into());
        assert_eq!(err.to_string(), "namespaces \"ghost\" not found");
        assert_eq!(err.status_code(), 404);

        let err = EngineError::from(SelectorError::Syntax("a b".into()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.reason(), "InternalServerError");
    }
}
