//! Handlers whose only difference from the generic path is the builder.

use serde_json::Value;

use kubesim_objects::{cluster, network};

use crate::engine::{Engine, Target};
use crate::error::EngineResult;
use crate::registry::KindHandler;

pub struct NamespaceHandler;

impl KindHandler for NamespaceHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        engine.materialize(target, |amb| cluster::namespace(input, amb))
    }
}

pub struct NodeHandler;

impl KindHandler for NodeHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        engine.materialize(target, |amb| cluster::node(input, amb))
    }
}

pub struct ServiceHandler;

impl KindHandler for ServiceHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        engine.materialize(target, |amb| network::service(input, amb))
    }
}

pub struct NetworkPolicyHandler;

impl KindHandler for NetworkPolicyHandler {
    fn materialize(&self, engine: &mut Engine, target: &Target, input: &Value, _: Option<&Value>) -> EngineResult<Value> {
        engine.materialize(target, |amb| network::network_policy(input, amb))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::engine::Target;
    use crate::engine::testing::*;

    #[test]
    fn namespaces_are_cluster_scoped() {
        let mut engine = engine();
        let namespaces = resource(&engine, "Namespace");
        let obj = engine
            .create(namespaces, Some("default"), json!({"metadata": {"name": "dev"}}))
            .unwrap();
        assert!(obj["metadata"].get("namespace").is_none());
        assert_eq!(obj["status"]["phase"], "Active");

        let pods = resource(&engine, "Pod");
        engine.create(pods, Some("dev"), pod_body("p")).unwrap();
    }

    #[test]
    fn cordoning_a_node_round_trips() {
        let mut engine = engine();
        let nodes = resource(&engine, "Node");
        let target = Target::new(nodes, None, "node-1");
        let obj = engine.update(&target, json!({"spec": {"unschedulable": true}})).unwrap();
        assert_eq!(obj["spec"]["unschedulable"], true);
        let obj = engine.update(&target, json!({"spec": {"unschedulable": false}})).unwrap();
        assert!(obj["spec"].get("unschedulable").is_none());
    }

    #[test]
    fn node_port_service_keeps_port_on_update() {
        let mut engine = engine();
        let services = resource(&engine, "Service");
        let created = engine
            .create(
                services,
                Some("default"),
                json!({"metadata": {"name": "web"}, "spec": {"type": "NodePort", "ports": [{"port": 80}]}}),
            )
            .unwrap();
        let port = created["spec"]["ports"][0]["nodePort"].clone();
        assert!(port.is_u64());

        let target = target(&engine, "Service", "web");
        let updated = engine
            .update(&target, json!({"metadata": {"labels": {"a": "b"}}}))
            .unwrap();
        assert_eq!(updated["spec"]["ports"][0]["nodePort"], port);
    }
}
