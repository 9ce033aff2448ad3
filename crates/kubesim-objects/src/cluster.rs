//! Cluster-scoped infrastructure kinds: Node and Namespace.

use serde_json::{Map, Value, json};

use crate::ambient::Ambient;
use crate::error::MaterializeResult;
use crate::meta::skeleton;

pub fn node(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);

    let mut labels = Map::new();
    labels.insert("beta.kubernetes.io/arch".into(), json!("amd64"));
    labels.insert("beta.kubernetes.io/os".into(), json!("linux"));
    if let Some(given) = input.pointer("/metadata/labels").and_then(Value::as_object) {
        labels.extend(given.clone());
    }
    labels.insert("kubernetes.io/hostname".into(), json!(amb.name));
    obj["metadata"]["labels"] = Value::Object(labels);

    let mut spec = json!({
        "externalID": amb.name,
        "podCIDR": "127.0.0.0/24",
    });
    if let Some(taints) = input.pointer("/spec/taints") {
        spec["taints"] = taints.clone();
    }
    if input.pointer("/spec/unschedulable") == Some(&Value::Bool(true)) {
        spec["unschedulable"] = json!(true);
    }
    obj["spec"] = spec;

    let resources = json!({
        "cpu": "8",
        "ephemeral-storage": "104857600Ki",
        "hugepages-2Mi": "0",
        "memory": "16777216Ki",
        "pods": "110",
    });
    obj["status"] = json!({
        "addresses": [
            {"address": "127.0.0.1", "type": "InternalIP"},
            {"address": amb.name, "type": "Hostname"},
        ],
        "allocatable": resources,
        "capacity": resources,
        "conditions": [{
            "type": "Ready",
            "status": "True",
            "reason": "KubeletReady",
            "message": "kubelet is posting ready status",
            "lastHeartbeatTime": amb.timestamp(),
            "lastTransitionTime": amb.timestamp(),
        }],
        "daemonEndpoints": {"kubeletEndpoint": {"Port": 10250}},
        "images": [],
        "nodeInfo": {
            "architecture": "amd64",
            "bootID": "f391568e-1adb-4b09-bcf1-bd4a4656e241",
            "containerRuntimeVersion": "docker://18.6.1",
            "kernelVersion": "4.4.0-101-generic",
            "kubeProxyVersion": "v1.10.4",
            "kubeletVersion": "v1.10.4",
            "machineID": "66f3f4cf26c749d29b2d23ca6d229664",
            "operatingSystem": "linux",
            "osImage": "Ubuntu 16.04.3 LTS",
            "systemUUID": "205FC311-D1E4-4C77-6FD4-9D041AC3070F",
        },
    });
    Ok(obj)
}

/// Whether the scheduler may place pods on this node.
pub fn node_is_schedulable(node: &Value) -> bool {
    node.pointer("/spec/unschedulable") != Some(&Value::Bool(true))
}

pub fn namespace(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    obj["spec"] = json!({ "finalizers": ["kubernetes"] });
    obj["status"] = json!({ "phase": "Active" });
    Ok(obj)
}
