//! Replica-style controllers (ReplicationController, ReplicaSet) and the
//! child-creation helpers every owning kind shares.

use serde_json::{Map, Value, json};
use tracing::info;

use kubesim_core::object;
use kubesim_objects::{Ambient, MaterializeResult, random_suffix, workload};

use crate::engine::{Engine, Target};
use crate::error::EngineResult;
use crate::registry::KindHandler;

/// Random suffix length of controller-created pod names.
pub(crate) const POD_SUFFIX: usize = 5;

type Builder = fn(&Value, &mut Ambient<'_>) -> MaterializeResult<Value>;

/// Handler shared by ReplicationController and ReplicaSet; only the
/// builder differs.
pub struct ReplicaHandler {
    build: Builder,
}

impl ReplicaHandler {
    pub const REPLICATION_CONTROLLER: Self = Self {
        build: workload::replication_controller,
    };
    pub const REPLICA_SET: Self = Self {
        build: workload::replica_set,
    };
}

impl KindHandler for ReplicaHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        engine.materialize(target, |amb| (self.build)(input, amb))
    }

    fn create(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let obj = engine.insert(self, target, body)?;
        reconcile(engine, &obj)?;
        Ok(obj)
    }

    fn update(&self, engine: &mut Engine, target: &Target, patch: Value) -> EngineResult<Value> {
        let obj = engine.merge(self, target, &patch)?;
        reconcile(engine, &obj)?;
        Ok(obj)
    }

    fn replace(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let obj = engine.overwrite(self, target, body)?;
        reconcile(engine, &obj)?;
        Ok(obj)
    }
}

/// Converge the owned pod count on `spec.replicas`.
///
/// Creates the deficit from the template, or deletes the surplus starting
/// with the most recently created pod.
pub(crate) fn reconcile(engine: &mut Engine, owner: &Value) -> EngineResult<()> {
    let desired = workload::replicas(owner) as usize;
    let pods = engine.owned("pods", owner)?;
    let template = owner
        .pointer("/spec/template")
        .cloned()
        .unwrap_or_else(|| json!({}));
    let owner_name = object::name(owner).unwrap_or_default();

    if pods.len() < desired {
        for _ in pods.len()..desired {
            spawn_pod(engine, owner, &template)?;
        }
    } else if pods.len() > desired {
        let pod_resource = engine.resource_for("Pod")?;
        for pod in pods.iter().rev().take(pods.len() - desired) {
            if let Some(target) = Target::of(pod_resource, pod) {
                engine.delete(&target)?;
            }
        }
    }
    info!(
        owner = %owner_name,
        kind = object::kind(owner).unwrap_or_default(),
        from = pods.len(),
        to = desired,
        "replicas reconciled"
    );
    Ok(())
}

/// Create one pod from `template` owned by `owner`.
pub(crate) fn spawn_pod(engine: &mut Engine, owner: &Value, template: &Value) -> EngineResult<Value> {
    let suffix = free_suffix(engine, "pods", owner, POD_SUFFIX)?;
    create_child(engine, "Pod", owner, template, &suffix)
}

/// A random suffix such that `<owner>-<suffix>` is not taken in `key`.
pub(crate) fn free_suffix(engine: &mut Engine, key: &str, owner: &Value, len: usize) -> EngineResult<String> {
    let owner_name = object::name(owner).unwrap_or_default();
    let namespace = object::namespace(owner);
    let taken = engine.collection(key)?;
    loop {
        let suffix = random_suffix(engine.rng(), len);
        let name = format!("{owner_name}-{suffix}");
        if !taken.iter().any(|o| object::has_identity(o, &name, namespace)) {
            return Ok(suffix);
        }
    }
}

/// Create a `kind` object named `<owner>-<suffix>` in the owner's namespace.
///
/// `template` supplies `metadata` (labels, annotations) and `spec`; the
/// owner reference is appended to whatever references it already carries.
pub(crate) fn create_child(
    engine: &mut Engine,
    kind: &str,
    owner: &Value,
    template: &Value,
    suffix: &str,
) -> EngineResult<Value> {
    let resource = engine.resource_for(kind)?;
    let owner_name = object::name(owner).unwrap_or_default();
    let owner_kind = object::kind(owner).unwrap_or_default();
    let owner_api = object::str_at(owner, "/apiVersion").unwrap_or("v1");

    let mut metadata: Map<String, Value> = template
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    metadata.insert("name".into(), json!(format!("{owner_name}-{suffix}")));
    metadata.remove("namespace");
    metadata.remove("uid");
    metadata.remove("creationTimestamp");
    let mut references = metadata
        .get("ownerReferences")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    references.push(object::owner_reference(owner_api, owner_kind, owner_name));
    metadata.insert("ownerReferences".into(), Value::Array(references));

    let body = json!({
        "metadata": metadata,
        "spec": template.get("spec").cloned().unwrap_or_else(|| json!({})),
    });
    engine.create(resource, object::namespace(owner), body)
}
