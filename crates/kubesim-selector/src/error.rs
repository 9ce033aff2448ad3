//! Selector error types.

use thiserror::Error;

/// Errors raised while parsing selectors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("unable to parse selector '{0}'")]
    Syntax(String),

    #[error("unsupported selector operator '{0}'")]
    UnsupportedOperator(String),
}

pub type SelectorResult<T> = Result<T, SelectorError>;
