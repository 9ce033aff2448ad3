//! Kind handlers and the kind → handler registry.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::Value;

use kubesim_objects::generic;
use kubesim_selector::Query;

use crate::batch::{CronJobHandler, JobHandler};
use crate::cluster::{NamespaceHandler, NetworkPolicyHandler, NodeHandler, ServiceHandler};
use crate::controllers::ReplicaHandler;
use crate::deployment::DeploymentHandler;
use crate::engine::{Engine, Target};
use crate::error::{EngineError, EngineResult};
use crate::pod::PodHandler;
use crate::storage::{ClaimHandler, VolumeHandler};

/// Capability set every kind supports.
///
/// The default methods are the generic behaviour used for kinds without
/// their own handler: plain store CRUD with universal materialization.
/// Handlers override only what their kind does differently.
pub trait KindHandler: Send + Sync {
    /// Canonical representation of `input`.
    ///
    /// `existing` is the stored object on update and replace.
    fn materialize(
        &self,
        engine: &mut Engine,
        target: &Target,
        input: &Value,
        existing: Option<&Value>,
    ) -> EngineResult<Value> {
        let _ = existing;
        engine.materialize(target, |amb| generic(input, amb))
    }

    fn create(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        engine.insert(self, target, body)
    }

    fn get(&self, engine: &mut Engine, target: &Target) -> EngineResult<Value> {
        engine.find(target)
    }

    fn list(&self, engine: &mut Engine, key: &str, query: &Query) -> EngineResult<Vec<Value>> {
        Ok(query.filter(engine.collection(key)?))
    }

    fn update(&self, engine: &mut Engine, target: &Target, patch: Value) -> EngineResult<Value> {
        engine.merge(self, target, &patch)
    }

    fn replace(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        engine.overwrite(self, target, body)
    }

    fn delete(&self, engine: &mut Engine, target: &Target) -> EngineResult<Value> {
        engine.remove(target)
    }

    /// Named sub-operation (`/pods/<name>/log`).
    fn operation(
        &self,
        engine: &mut Engine,
        target: &Target,
        operation: &str,
        params: &HashMap<String, String>,
    ) -> EngineResult<Value> {
        let _ = (engine, target, operation, params);
        Err(EngineError::unknown_resource())
    }
}

/// Handler for kinds with no dedicated rules.
pub struct GenericHandler;

impl KindHandler for GenericHandler {}

static REGISTRY: LazyLock<HashMap<&'static str, &'static dyn KindHandler>> = LazyLock::new(|| {
    let mut handlers: HashMap<&'static str, &'static dyn KindHandler> = HashMap::new();
    handlers.insert("Namespace", &NamespaceHandler);
    handlers.insert("Node", &NodeHandler);
    handlers.insert("Pod", &PodHandler);
    handlers.insert("ReplicationController", &ReplicaHandler::REPLICATION_CONTROLLER);
    handlers.insert("ReplicaSet", &ReplicaHandler::REPLICA_SET);
    handlers.insert("Deployment", &DeploymentHandler);
    handlers.insert("Job", &JobHandler);
    handlers.insert("CronJob", &CronJobHandler);
    handlers.insert("Service", &ServiceHandler);
    handlers.insert("NetworkPolicy", &NetworkPolicyHandler);
    handlers.insert("PersistentVolume", &VolumeHandler);
    handlers.insert("PersistentVolumeClaim", &ClaimHandler);
    handlers
});

/// Handler registered for `kind`, falling back to [`GenericHandler`].
pub fn handler(kind: &str) -> &'static dyn KindHandler {
    REGISTRY.get(kind).copied().unwrap_or(&GenericHandler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_special_kind_is_registered() {
        for kind in [
            "Namespace",
            "Node",
            "Pod",
            "ReplicationController",
            "ReplicaSet",
            "Deployment",
            "Job",
            "CronJob",
            "Service",
            "NetworkPolicy",
            "PersistentVolume",
            "PersistentVolumeClaim",
        ] {
            assert!(REGISTRY.contains_key(kind), "{kind} has no handler");
        }
        assert!(!REGISTRY.contains_key("ConfigMap"));
    }
}
