//! kubesim-core — shared building blocks for the kubesim API server.
//!
//! - **`config`**: `kubesim.toml` parsing and defaults
//! - **`schema`**: built-in resource types and discovery documents
//! - **`object`**: metadata accessors over JSON resource objects
//! - **`merge`**: recursive partial merge used by PATCH

pub mod config;
pub mod merge;
pub mod object;
pub mod schema;

pub use config::KubesimConfig;
pub use merge::merge_patch;
pub use schema::{ResourceSchema, ResourceType};
