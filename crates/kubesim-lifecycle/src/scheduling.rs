//! Scheduling simulation: choose a random node whose labels and fields
//! satisfy the pod's node selector and required node affinity.

use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::{debug, warn};

use kubesim_core::object;
use kubesim_objects::cluster::node_is_schedulable;
use kubesim_objects::{PodPhase, PodPlacement};
use kubesim_selector::{FieldRequirement, FieldSelector, LabelSelector, Requirement, Selector};

use crate::engine::Engine;
use crate::error::EngineResult;

/// One `nodeSelectorTerms` entry: its label and field requirements are ANDed.
#[derive(Debug, Default)]
struct NodeTerm {
    labels: LabelSelector,
    fields: FieldSelector,
}

impl NodeTerm {
    fn parse(term: &Value) -> EngineResult<Self> {
        let mut parsed = Self::default();
        for expr in term.get("matchExpressions").and_then(Value::as_array).into_iter().flatten() {
            parsed.labels.push(Requirement::from_expression(expr)?);
        }
        for expr in term.get("matchFields").and_then(Value::as_array).into_iter().flatten() {
            parsed.fields.push(FieldRequirement::from_expression(expr)?);
        }
        Ok(parsed)
    }

    fn matches(&self, node: &Value) -> bool {
        self.labels.matches(node) && self.fields.matches(node)
    }
}

/// Node constraints of a pod spec.
#[derive(Debug, Default)]
struct NodeConstraints {
    node_selector: LabelSelector,
    /// Alternatives; empty means no affinity constraint.
    terms: Vec<NodeTerm>,
}

impl NodeConstraints {
    fn of(pod: &Value) -> EngineResult<Self> {
        let node_selector = pod
            .pointer("/spec/nodeSelector")
            .and_then(Value::as_object)
            .map(LabelSelector::from_map)
            .unwrap_or_default();
        let terms = pod
            .pointer("/spec/affinity/nodeAffinity/requiredDuringSchedulingIgnoredDuringExecution/nodeSelectorTerms")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(NodeTerm::parse)
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { node_selector, terms })
    }

    fn admits(&self, node: &Value) -> bool {
        node_is_schedulable(node)
            && self.node_selector.matches(node)
            && (self.terms.is_empty() || self.terms.iter().any(|t| t.matches(node)))
    }
}

/// Decide where `pod` runs.
///
/// A pod owned by a Job runs to completion; any other placed pod is running.
pub(crate) fn place(engine: &mut Engine, pod: &Value) -> EngineResult<PodPlacement> {
    let phase = if object::has_owner_kind(pod, "Job") {
        PodPhase::Succeeded
    } else {
        PodPhase::Running
    };
    let nodes = engine.collection("nodes")?;
    let pod_name = object::name(pod).unwrap_or_default();

    if let Some(node_name) = object::str_at(pod, "/spec/nodeName") {
        if nodes.iter().any(|n| object::name(n) == Some(node_name)) {
            return Ok(PodPlacement {
                phase,
                node: Some(node_name.to_string()),
            });
        }
        warn!(pod = %pod_name, node = %node_name, "requested node does not exist, pod stays pending");
        return Ok(PodPlacement::pending());
    }

    let constraints = NodeConstraints::of(pod)?;
    let eligible: Vec<&Value> = nodes.iter().filter(|n| constraints.admits(n)).collect();
    match eligible.choose(engine.rng()).and_then(|n| object::name(n)) {
        Some(node) => {
            debug!(pod = %pod_name, %node, candidates = eligible.len(), "pod scheduled");
            Ok(PodPlacement {
                phase,
                node: Some(node.to_string()),
            })
        }
        None => {
            warn!(pod = %pod_name, "no eligible node, pod stays pending");
            Ok(PodPlacement::pending())
        }
    }
}
