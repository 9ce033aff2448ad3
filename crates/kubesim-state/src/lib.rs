//! kubesim-state — resource store for kubesim.
//!
//! Backed by [redb](https://docs.rs/redb), holds one ordered collection of
//! JSON objects per resource type, keyed by the plural resource name
//! (`pods`, `deployments`).
//!
//! # Access model
//!
//! Collections are read and written whole: `get` returns the full ordered
//! sequence and `set` replaces it in a single write transaction, so a reader
//! never observes a half-applied mutation. Callers that read-modify-write
//! must serialize among themselves.
//!
//! The `ResourceStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`).

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::ResourceStore;
