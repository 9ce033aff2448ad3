//! kubesim-lifecycle — control-plane behaviour behind every request.
//!
//! The [`Engine`] owns the resource store and dispatches each operation to
//! the [`KindHandler`] registered for the target's kind. Handlers reproduce
//! the side effects a real control plane would have:
//!
//! - Replica controllers create and trim owned pods
//! - Deployments roll out a new ReplicaSet per revision and prune history
//! - Jobs run their pods to completion; CronJobs spawn one Job
//! - Pods are placed on a random eligible node
//! - Volumes and claims bind to each other and release on delete
//!
//! # Architecture
//!
//! ```text
//! Engine
//!   ├── ResourceStore (one ordered collection per resource)
//!   ├── ResourceSchema (kind → resource type)
//!   ├── StdRng (names, node choice, ports)
//!   └── registry: kind → &'static dyn KindHandler
//!       ├── generic CRUD (trait defaults)
//!       └── per-kind overrides (pods, controllers, batch, storage)
//! ```
//!
//! Cascades run synchronously inside the triggering call and always
//! re-derive counts from a store scan; children are found by their owner
//! references, never by pointers held on the parent.

pub mod engine;
pub mod error;
pub mod registry;

mod batch;
mod cluster;
mod controllers;
mod deployment;
mod pod;
mod scheduling;
mod storage;

pub use engine::{Engine, Target};
pub use error::{EngineError, EngineResult};
pub use registry::KindHandler;
