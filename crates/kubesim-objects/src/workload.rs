//! Workload kinds: Pod and the controllers that own pods.

use serde_json::{Map, Value, json};

use crate::ambient::{Ambient, random_digits};
use crate::error::MaterializeResult;
use crate::meta::{default_field, skeleton, spec_of};

/// Annotation holding a deployment's (and its replica sets') revision.
pub const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

// ── Pod ────────────────────────────────────────────────────────────

/// Simulated pod lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    /// No eligible node.
    Pending,
    Running,
    /// Owned by a batch job; containers ran to completion.
    Succeeded,
}

impl PodPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
        }
    }
}

/// Outcome of the scheduling simulation for one pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodPlacement {
    pub phase: PodPhase,
    pub node: Option<String>,
}

impl PodPlacement {
    pub fn pending() -> Self {
        Self {
            phase: PodPhase::Pending,
            node: None,
        }
    }
}

fn normalize_container(container: &Value) -> Value {
    let mut c = container.as_object().cloned().unwrap_or_default();
    if let Some(ports) = c.get_mut("ports").and_then(Value::as_array_mut) {
        for port in ports.iter_mut().filter_map(Value::as_object_mut) {
            default_field(port, "protocol", json!("TCP"));
        }
    } else {
        c.insert("ports".into(), json!([]));
    }
    default_field(&mut c, "resources", json!({}));
    default_field(&mut c, "volumeMounts", json!([]));
    default_field(&mut c, "imagePullPolicy", json!("IfNotPresent"));
    default_field(&mut c, "terminationMessagePath", json!("/dev/termination-log"));
    Value::Object(c)
}

fn pod_conditions(phase: PodPhase, ts: &str) -> Value {
    let condition = |kind: &str, status: &str, reason: Option<&str>| {
        let mut c = json!({
            "type": kind,
            "status": status,
            "lastProbeTime": null,
            "lastTransitionTime": ts,
        });
        if let Some(reason) = reason {
            c["reason"] = json!(reason);
        }
        c
    };
    match phase {
        PodPhase::Pending => json!([{
            "type": "PodScheduled",
            "status": "False",
            "reason": "Unschedulable",
            "message": "0 nodes are available to run this pod",
            "lastProbeTime": null,
            "lastTransitionTime": ts,
        }]),
        PodPhase::Running => json!([
            condition("Initialized", "True", None),
            condition("Ready", "True", None),
            condition("ContainersReady", "True", None),
            condition("PodScheduled", "True", None),
        ]),
        PodPhase::Succeeded => json!([
            condition("Initialized", "True", Some("PodCompleted")),
            condition("Ready", "False", Some("PodCompleted")),
            condition("ContainersReady", "False", Some("PodCompleted")),
            condition("PodScheduled", "True", None),
        ]),
    }
}

fn container_status(container: &Value, phase: PodPhase, started: &str, now: &str, id: String) -> Value {
    let image = container.get("image").cloned().unwrap_or(Value::Null);
    let state = match phase {
        PodPhase::Succeeded => json!({
            "terminated": {
                "containerID": format!("docker://{id}"),
                "exitCode": 0,
                "reason": "Completed",
                "startedAt": started,
                "finishedAt": now,
            }
        }),
        _ => json!({ "running": { "startedAt": started } }),
    };
    json!({
        "containerID": format!("docker://{id}"),
        "image": image,
        "imageID": format!("docker-pullable://{}", image.as_str().unwrap_or_default()),
        "name": container.get("name").cloned().unwrap_or(Value::Null),
        "ready": phase == PodPhase::Running,
        "restartCount": 0,
        "state": state,
    })
}

/// Canonical Pod.
///
/// `placement` comes from the scheduling simulation; a pending pod has no
/// node, no container statuses and an `Unschedulable` condition.
pub fn pod(input: &Value, amb: &mut Ambient<'_>, placement: &PodPlacement) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let mut spec = spec_of(input);

    let containers: Vec<Value> = spec
        .get("containers")
        .and_then(Value::as_array)
        .ok_or_else(|| amb.missing("spec.containers"))?
        .iter()
        .map(normalize_container)
        .collect();
    spec.insert("containers".into(), Value::Array(containers.clone()));
    default_field(&mut spec, "restartPolicy", json!("Always"));
    default_field(&mut spec, "dnsPolicy", json!("ClusterFirst"));
    default_field(&mut spec, "schedulerName", json!("default-scheduler"));
    default_field(&mut spec, "terminationGracePeriodSeconds", json!(30));
    if let Some(node) = &placement.node {
        spec.insert("nodeName".into(), json!(node));
    }
    obj["spec"] = Value::Object(spec);

    let now = amb.timestamp();
    let mut status = Map::new();
    status.insert("phase".into(), json!(placement.phase.as_str()));
    status.insert("conditions".into(), pod_conditions(placement.phase, &now));
    status.insert("qosClass".into(), json!("BestEffort"));
    if placement.phase != PodPhase::Pending {
        let started = input
            .pointer("/status/startTime")
            .and_then(Value::as_str)
            .unwrap_or(&now)
            .to_string();
        let statuses: Vec<Value> = containers
            .iter()
            .map(|c| {
                let id = random_digits(amb.rng, 12);
                container_status(c, placement.phase, &started, &now, id)
            })
            .collect();
        status.insert("containerStatuses".into(), Value::Array(statuses));
        status.insert("hostIP".into(), json!("127.0.0.1"));
        status.insert("podIP".into(), json!("127.0.0.1"));
        status.insert("startTime".into(), json!(started));
    }
    obj["status"] = Value::Object(status);
    Ok(obj)
}

// ── Replica controllers ────────────────────────────────────────────

/// Desired replica count of a materialized object (`spec.replicas`, default 1).
pub fn replicas(obj: &Value) -> u64 {
    obj.pointer("/spec/replicas")
        .and_then(Value::as_u64)
        .unwrap_or(1)
}

/// Non-negative integer at `pointer` of an input document, `default` when
/// absent or null.
fn count(input: &Value, amb: &Ambient<'_>, pointer: &str, field: &str, default: u64) -> MaterializeResult<u64> {
    match input.pointer(pointer) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| amb.invalid(field, "expected a non-negative integer")),
    }
}

/// `spec.selector`, when given, must be a mapping.
fn check_selector(input: &Value, amb: &Ambient<'_>) -> MaterializeResult<()> {
    match input.pointer("/spec/selector") {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(amb.invalid("spec.selector", "expected a mapping")),
    }
}

/// The pod template of a controller, or a missing-field error.
fn template(input: &Value, amb: &Ambient<'_>, pointer: &str, field: &str) -> MaterializeResult<Map<String, Value>> {
    input
        .pointer(pointer)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| amb.missing(field))
}

/// Template with `metadata.labels`/`metadata.annotations` defaulted.
fn normalize_template(mut template: Map<String, Value>) -> Map<String, Value> {
    let meta = template
        .entry("metadata")
        .or_insert_with(|| json!({}));
    if let Some(meta) = meta.as_object_mut() {
        default_field(meta, "labels", json!({}));
        default_field(meta, "annotations", json!({}));
    }
    default_field(&mut template, "spec", json!({}));
    template
}

fn template_labels(template: &Map<String, Value>) -> Value {
    template
        .get("metadata")
        .and_then(|m| m.get("labels"))
        .cloned()
        .unwrap_or_else(|| json!({}))
}

fn replica_status(replicas: u64) -> Value {
    json!({
        "replicas": replicas,
        "fullyLabeledReplicas": replicas,
        "readyReplicas": replicas,
        "availableReplicas": replicas,
        "observedGeneration": 1,
    })
}

/// Canonical ReplicationController. Selector defaults to the template labels.
pub fn replication_controller(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let template = normalize_template(template(input, amb, "/spec/template", "spec.template")?);
    check_selector(input, amb)?;
    let replicas = count(input, amb, "/spec/replicas", "spec.replicas", 1)?;

    let mut spec = spec_of(input);
    default_field(&mut spec, "selector", template_labels(&template));
    spec.insert("replicas".into(), json!(replicas));
    spec.insert("template".into(), Value::Object(template));
    obj["spec"] = Value::Object(spec);
    obj["status"] = replica_status(replicas);
    Ok(obj)
}

/// Canonical ReplicaSet. Selector defaults to `matchLabels` of the template labels.
pub fn replica_set(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let template = normalize_template(template(input, amb, "/spec/template", "spec.template")?);
    check_selector(input, amb)?;
    let replicas = count(input, amb, "/spec/replicas", "spec.replicas", 1)?;

    let mut spec = spec_of(input);
    default_field(&mut spec, "selector", json!({ "matchLabels": template_labels(&template) }));
    spec.insert("replicas".into(), json!(replicas));
    spec.insert("template".into(), Value::Object(template));
    obj["spec"] = Value::Object(spec);
    obj["status"] = replica_status(replicas);
    Ok(obj)
}

// ── Deployment ─────────────────────────────────────────────────────

/// How a deployment's revision moves during materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionStep {
    /// New deployment: revision 1.
    Initial,
    /// Rollout: previous revision + 1.
    Bump,
}

/// Revision recorded in the revision annotation (0 when absent).
pub fn revision(obj: &Value) -> u64 {
    obj.pointer("/metadata/annotations")
        .and_then(|a| a.get(REVISION_ANNOTATION))
        .and_then(Value::as_str)
        .and_then(|r| r.parse().ok())
        .unwrap_or(0)
}

/// Canonical Deployment with its revision annotation advanced by `step`.
pub fn deployment(input: &Value, amb: &mut Ambient<'_>, step: RevisionStep) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let template = normalize_template(template(input, amb, "/spec/template", "spec.template")?);
    check_selector(input, amb)?;
    let replicas = count(input, amb, "/spec/replicas", "spec.replicas", 1)?;
    let revision = match step {
        RevisionStep::Initial => 1,
        RevisionStep::Bump => revision(input) + 1,
    };
    obj["metadata"]["annotations"][REVISION_ANNOTATION] = json!(revision.to_string());

    let mut spec = spec_of(input);
    default_field(&mut spec, "selector", json!({ "matchLabels": template_labels(&template) }));
    default_field(
        &mut spec,
        "strategy",
        json!({
            "type": "RollingUpdate",
            "rollingUpdate": {"maxSurge": "25%", "maxUnavailable": "25%"},
        }),
    );
    let history = count(input, amb, "/spec/revisionHistoryLimit", "spec.revisionHistoryLimit", 10)?;
    spec.insert("revisionHistoryLimit".into(), json!(history));
    default_field(&mut spec, "progressDeadlineSeconds", json!(600));
    spec.insert("replicas".into(), json!(replicas));
    spec.insert("template".into(), Value::Object(template));
    obj["spec"] = Value::Object(spec);

    let ts = amb.timestamp();
    obj["status"] = json!({
        "observedGeneration": revision,
        "replicas": replicas,
        "updatedReplicas": replicas,
        "readyReplicas": replicas,
        "availableReplicas": replicas,
        "conditions": [
            {
                "type": "Available",
                "status": "True",
                "reason": "MinimumReplicasAvailable",
                "message": "Deployment has minimum availability.",
                "lastUpdateTime": ts,
                "lastTransitionTime": ts,
            },
            {
                "type": "Progressing",
                "status": "True",
                "reason": "NewReplicaSetAvailable",
                "message": format!("ReplicaSet has successfully progressed (revision {revision})."),
                "lastUpdateTime": ts,
                "lastTransitionTime": ts,
            },
        ],
    });
    Ok(obj)
}

/// `spec.revisionHistoryLimit` of a materialized deployment.
pub fn revision_history_limit(obj: &Value) -> usize {
    obj.pointer("/spec/revisionHistoryLimit")
        .and_then(Value::as_u64)
        .unwrap_or(10) as usize
}

// ── Batch ──────────────────────────────────────────────────────────

/// `spec.completions` of a materialized job (default 1).
pub fn completions(obj: &Value) -> u64 {
    obj.pointer("/spec/completions")
        .and_then(Value::as_u64)
        .unwrap_or(1)
}

/// Canonical Job. Every completion is reported as already succeeded.
pub fn job(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let mut template = normalize_template(template(input, amb, "/spec/template", "spec.template")?);
    if let Some(labels) = template
        .get_mut("metadata")
        .and_then(|m| m.get_mut("labels"))
        .and_then(Value::as_object_mut)
    {
        labels.insert("job-name".into(), json!(amb.name));
    }
    let completions = count(input, amb, "/spec/completions", "spec.completions", 1)?;

    let mut spec = spec_of(input);
    default_field(&mut spec, "parallelism", json!(1));
    default_field(&mut spec, "backoffLimit", json!(6));
    spec.insert("completions".into(), json!(completions));
    spec.insert("template".into(), Value::Object(template));
    obj["spec"] = Value::Object(spec);

    let ts = amb.timestamp();
    let started = input
        .pointer("/status/startTime")
        .and_then(Value::as_str)
        .unwrap_or(&ts)
        .to_string();
    obj["status"] = json!({
        "succeeded": completions,
        "startTime": started,
        "completionTime": ts,
        "conditions": [{
            "type": "Complete",
            "status": "True",
            "lastProbeTime": ts,
            "lastTransitionTime": ts,
        }],
    });
    Ok(obj)
}

/// Canonical CronJob.
pub fn cron_job(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let mut spec = spec_of(input);
    if !spec.get("schedule").is_some_and(Value::is_string) {
        return Err(amb.missing("spec.schedule"));
    }
    let job_template = template(input, amb, "/spec/jobTemplate", "spec.jobTemplate")?;
    if !job_template.get("spec").is_some_and(Value::is_object) {
        return Err(amb.missing("spec.jobTemplate.spec"));
    }
    default_field(&mut spec, "concurrencyPolicy", json!("Allow"));
    default_field(&mut spec, "suspend", json!(false));
    default_field(&mut spec, "successfulJobsHistoryLimit", json!(3));
    default_field(&mut spec, "failedJobsHistoryLimit", json!(1));
    obj["spec"] = Value::Object(spec);
    obj["status"] = json!({ "lastScheduleTime": amb.timestamp() });
    Ok(obj)
}
