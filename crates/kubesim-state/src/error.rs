//! Resource store errors. Collection-level failures name the collection.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open resource cache at {location}: {reason}")]
    Open { location: String, reason: String },

    #[error("resource cache transaction failed: {0}")]
    Transaction(String),

    #[error("collections table unavailable: {0}")]
    Table(String),

    #[error("cannot read collection {collection}: {reason}")]
    Read { collection: String, reason: String },

    #[error("cannot write collection {collection}: {reason}")]
    Write { collection: String, reason: String },

    #[error("cannot list collections: {0}")]
    Scan(String),

    #[error("collection {collection} cannot be encoded: {reason}")]
    Encode { collection: String, reason: String },

    /// Stored bytes are not a JSON array of objects.
    #[error("collection {collection} is corrupt: {reason}")]
    Corrupt { collection: String, reason: String },
}
