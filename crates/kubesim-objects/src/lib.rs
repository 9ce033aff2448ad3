//! kubesim-objects — object materialization.
//!
//! Every kind has a builder that takes the partial document a client sent
//! (or the merged document on PATCH) plus an [`Ambient`] context, and
//! returns the canonical full representation a control plane would store:
//! metadata defaults, synthesized spec fields and simulated status.
//!
//! Builders never touch the store. Parameters that depend on other objects
//! (scheduling result, binding phase, deployment revision) are computed by
//! the lifecycle engine and passed in.

pub mod ambient;
pub mod cluster;
pub mod error;
pub mod meta;
pub mod network;
pub mod quantity;
pub mod storage;
pub mod workload;

pub use ambient::{Ambient, random_digits, random_suffix};
pub use error::{MaterializeError, MaterializeResult};
pub use meta::generic;
pub use storage::{ClaimPhase, VolumePhase};
pub use workload::{PodPhase, PodPlacement, RevisionStep};
