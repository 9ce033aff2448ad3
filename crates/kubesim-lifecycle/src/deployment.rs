//! Deployment rollouts: one ReplicaSet per revision, old ones scaled to
//! zero and pruned down to `revisionHistoryLimit`.

use serde_json::{Map, Value, json};
use tracing::info;

use kubesim_core::object;
use kubesim_objects::workload::{self, REVISION_ANNOTATION};
use kubesim_objects::RevisionStep;

use crate::controllers::{create_child, free_suffix};
use crate::engine::{Engine, Target};
use crate::error::EngineResult;
use crate::registry::KindHandler;

/// Length of the hash suffix naming a deployment's ReplicaSets.
const TEMPLATE_HASH_LEN: usize = 10;

const TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

pub struct DeploymentHandler;

impl KindHandler for DeploymentHandler {
    /// New deployments start at revision 1; every later write bumps the
    /// stored revision.
    fn materialize(
        &self,
        engine: &mut Engine,
        target: &Target,
        input: &Value,
        existing: Option<&Value>,
    ) -> EngineResult<Value> {
        match existing {
            None => engine.materialize(target, |amb| workload::deployment(input, amb, RevisionStep::Initial)),
            Some(existing) => {
                let mut input = input.clone();
                let stored = workload::revision(existing).to_string();
                object::metadata_entry(&mut input, "annotations")
                    .insert(REVISION_ANNOTATION.into(), json!(stored));
                engine.materialize(target, |amb| workload::deployment(&input, amb, RevisionStep::Bump))
            }
        }
    }

    fn create(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let obj = engine.insert(self, target, body)?;
        rollout(engine, &obj)?;
        Ok(obj)
    }

    fn update(&self, engine: &mut Engine, target: &Target, patch: Value) -> EngineResult<Value> {
        let obj = engine.merge(self, target, &patch)?;
        rollout(engine, &obj)?;
        Ok(obj)
    }

    fn replace(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let obj = engine.overwrite(self, target, body)?;
        rollout(engine, &obj)?;
        Ok(obj)
    }

    /// Removes the deployment and its ReplicaSets. The ReplicaSets' pods
    /// are left in place.
    fn delete(&self, engine: &mut Engine, target: &Target) -> EngineResult<Value> {
        let obj = engine.remove(target)?;
        let replica_set = engine.resource_for("ReplicaSet")?;
        for rs in engine.owned("replicasets", &obj)? {
            if let Some(rs_target) = Target::of(replica_set, &rs) {
                engine.delete(&rs_target)?;
            }
        }
        Ok(obj)
    }
}

/// Retire every existing ReplicaSet of `deployment` and create the one for
/// its current revision.
fn rollout(engine: &mut Engine, deployment: &Value) -> EngineResult<()> {
    let replica_set = engine.resource_for("ReplicaSet")?;
    let previous = engine.owned("replicasets", deployment)?;

    for rs in &previous {
        if workload::replicas(rs) == 0 {
            continue;
        }
        if let Some(target) = Target::of(replica_set, rs) {
            engine.update(&target, json!({"spec": {"replicas": 0}}))?;
        }
    }

    let limit = workload::revision_history_limit(deployment);
    let excess = previous.len().saturating_sub(limit);
    for rs in previous.iter().take(excess) {
        if let Some(target) = Target::of(replica_set, rs) {
            engine.delete(&target)?;
        }
    }

    let hash = free_suffix(engine, "replicasets", deployment, TEMPLATE_HASH_LEN)?;
    let template = replica_set_template(deployment, &hash);
    let rs = create_child(engine, "ReplicaSet", deployment, &template, &hash)?;
    info!(
        deployment = object::name(deployment).unwrap_or_default(),
        replica_set = object::name(&rs).unwrap_or_default(),
        revision = workload::revision(deployment),
        retired = previous.len(),
        pruned = excess,
        "deployment rolled out"
    );
    Ok(())
}

/// ReplicaSet document for the deployment's current revision.
fn replica_set_template(deployment: &Value, hash: &str) -> Value {
    let mut pod_template = deployment
        .pointer("/spec/template")
        .cloned()
        .unwrap_or_else(|| json!({}));
    let labels = object::metadata_entry(&mut pod_template, "labels");
    labels.insert(TEMPLATE_HASH_LABEL.into(), json!(hash));
    let labels = labels.clone();

    let mut match_labels: Map<String, Value> = deployment
        .pointer("/spec/selector/matchLabels")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    match_labels.insert(TEMPLATE_HASH_LABEL.into(), json!(hash));

    let mut selector = deployment
        .pointer("/spec/selector")
        .cloned()
        .unwrap_or_else(|| json!({}));
    object::ensure_object(&mut selector).insert("matchLabels".into(), Value::Object(match_labels));

    let revision = workload::revision(deployment).to_string();
    let replicas = workload::replicas(deployment);
    json!({
        "metadata": {
            "labels": labels,
            "annotations": {
                REVISION_ANNOTATION: revision,
                "deployment.kubernetes.io/desired-replicas": replicas.to_string(),
            },
        },
        "spec": {
            "replicas": replicas,
            "selector": selector,
            "template": pod_template,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;
    use crate::error::EngineError;

    fn replica_sets(engine: &Engine, deployment: &str) -> Vec<Value> {
        engine
            .owned(
                "replicasets",
                &json!({"kind": "Deployment", "metadata": {"name": deployment, "namespace": "default"}}),
            )
            .unwrap()
    }

    fn revisions(sets: &[Value]) -> Vec<u64> {
        sets.iter().map(workload::revision).collect()
    }

    #[test]
    fn create_makes_first_revision() {
        let mut engine = engine();
        let deployments = resource(&engine, "Deployment");
        let obj = engine.create(deployments, Some("default"), template_body("web", 2)).unwrap();
        assert_eq!(workload::revision(&obj), 1);

        let sets = replica_sets(&engine, "web");
        assert_eq!(sets.len(), 1);
        assert_eq!(revisions(&sets), vec![1]);
        let rs = &sets[0];
        let name = object::name(rs).unwrap();
        let hash = object::label(rs, TEMPLATE_HASH_LABEL).unwrap();
        assert_eq!(hash.len(), TEMPLATE_HASH_LEN);
        assert_eq!(name, format!("web-{hash}"));
        assert_eq!(rs["spec"]["selector"]["matchLabels"][TEMPLATE_HASH_LABEL], hash);
        assert_eq!(rs["spec"]["template"]["metadata"]["labels"][TEMPLATE_HASH_LABEL], hash);
        assert_eq!(rs["spec"]["replicas"], 2);

        let pods = engine.owned("pods", rs).unwrap();
        assert_eq!(pods.len(), 2);
    }

    #[test]
    fn update_rolls_out_new_revision() {
        let mut engine = engine();
        let deployments = resource(&engine, "Deployment");
        engine.create(deployments, Some("default"), template_body("web", 2)).unwrap();

        let target = target(&engine, "Deployment", "web");
        let obj = engine.update(&target, json!({"spec": {"replicas": 3}})).unwrap();
        assert_eq!(workload::revision(&obj), 2);

        let sets = replica_sets(&engine, "web");
        assert_eq!(revisions(&sets), vec![1, 2]);
        assert_eq!(sets[0]["spec"]["replicas"], 0);
        assert!(engine.owned("pods", &sets[0]).unwrap().is_empty());
        assert_eq!(sets[1]["spec"]["replicas"], 3);
        assert_eq!(engine.owned("pods", &sets[1]).unwrap().len(), 3);
    }

    #[test]
    fn replace_bumps_from_stored_revision() {
        let mut engine = engine();
        let deployments = resource(&engine, "Deployment");
        engine.create(deployments, Some("default"), template_body("web", 1)).unwrap();
        let target = target(&engine, "Deployment", "web");
        engine.update(&target, json!({"spec": {"replicas": 1}})).unwrap();

        let obj = engine.replace(&target, template_body("web", 1)).unwrap();
        assert_eq!(workload::revision(&obj), 3);
    }

    #[test]
    fn history_is_pruned_oldest_first() {
        let mut engine = engine();
        let deployments = resource(&engine, "Deployment");
        let mut body = template_body("web", 1);
        body["spec"]["revisionHistoryLimit"] = json!(1);
        engine.create(deployments, Some("default"), body).unwrap();

        let target = target(&engine, "Deployment", "web");
        for _ in 0..3 {
            engine.update(&target, json!({"metadata": {"labels": {"touch": "yes"}}})).unwrap();
        }
        let sets = replica_sets(&engine, "web");
        assert_eq!(revisions(&sets), vec![3, 4]);
    }

    #[test]
    fn malformed_selector_leaves_nothing_behind() {
        let mut engine = engine();
        let deployments = resource(&engine, "Deployment");
        let mut body = template_body("web", 2);
        body["spec"]["selector"] = json!("app=web");

        let err = engine.create(deployments, Some("default"), body).unwrap_err();
        assert!(matches!(err, EngineError::Materialization(_)));
        assert_eq!(err.status_code(), 500);
        let target = target(&engine, "Deployment", "web");
        assert!(engine.lookup(&target).unwrap().is_none());
        assert!(replica_sets(&engine, "web").is_empty());
    }

    #[test]
    fn malformed_update_keeps_stored_revision() {
        let mut engine = engine();
        let deployments = resource(&engine, "Deployment");
        engine.create(deployments, Some("default"), template_body("web", 2)).unwrap();
        let target = target(&engine, "Deployment", "web");

        assert!(engine.update(&target, json!({"spec": {"replicas": "3"}})).is_err());
        let stored = engine.get(&target).unwrap();
        assert_eq!(workload::revision(&stored), 1);
        assert_eq!(stored["spec"]["replicas"], 2);
        assert_eq!(revisions(&replica_sets(&engine, "web")), vec![1]);
    }

    #[test]
    fn delete_removes_replica_sets_but_not_pods() {
        let mut engine = engine();
        let deployments = resource(&engine, "Deployment");
        engine.create(deployments, Some("default"), template_body("web", 2)).unwrap();
        let rs = replica_sets(&engine, "web").remove(0);

        let target = target(&engine, "Deployment", "web");
        engine.delete(&target).unwrap();
        assert!(replica_sets(&engine, "web").is_empty());
        assert_eq!(engine.owned("pods", &rs).unwrap().len(), 2);
    }
}
