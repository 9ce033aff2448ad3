//! Service and NetworkPolicy.

use rand::Rng;
use serde_json::{Value, json};

use crate::ambient::Ambient;
use crate::error::MaterializeResult;
use crate::meta::{default_field, skeleton, spec_of};

/// Range the API server allocates node ports from.
pub const NODE_PORT_RANGE: std::ops::RangeInclusive<u16> = 30000..=32767;

pub fn service(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let mut spec = spec_of(input);

    default_field(&mut spec, "type", json!("ClusterIP"));
    let kind = spec
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("ClusterIP")
        .to_string();
    let exposes_node_port = matches!(kind.as_str(), "NodePort" | "LoadBalancer");

    let mut ports = Vec::new();
    for (i, port) in spec
        .get("ports")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
    {
        let mut port = port
            .as_object()
            .cloned()
            .ok_or_else(|| amb.invalid(&format!("spec.ports[{i}]"), "expected a mapping"))?;
        let number = port
            .get("port")
            .cloned()
            .ok_or_else(|| amb.missing(&format!("spec.ports[{i}].port")))?;
        default_field(&mut port, "protocol", json!("TCP"));
        default_field(&mut port, "targetPort", number);
        if exposes_node_port && port.get("nodePort").is_none_or(Value::is_null) {
            port.insert("nodePort".into(), json!(amb.rng.gen_range(NODE_PORT_RANGE)));
        }
        ports.push(Value::Object(port));
    }
    spec.insert("ports".into(), Value::Array(ports));
    default_field(&mut spec, "selector", json!({}));
    default_field(&mut spec, "clusterIP", json!("127.0.0.1"));
    default_field(&mut spec, "sessionAffinity", json!("None"));
    if exposes_node_port {
        default_field(&mut spec, "externalTrafficPolicy", json!("Cluster"));
    }
    obj["spec"] = Value::Object(spec);

    obj["status"] = if kind == "LoadBalancer" {
        json!({ "loadBalancer": { "ingress": [{"ip": "127.0.0.1"}] } })
    } else {
        json!({ "loadBalancer": {} })
    };
    Ok(obj)
}

pub fn network_policy(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let mut spec = spec_of(input);
    default_field(&mut spec, "podSelector", json!({}));

    let listed: Vec<&str> = spec
        .get("policyTypes")
        .and_then(Value::as_array)
        .map(|types| types.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let has_rules = |key: &str| {
        spec.get(key)
            .and_then(Value::as_array)
            .is_some_and(|rules| !rules.is_empty())
    };

    let mut types = Vec::new();
    if has_rules("ingress") || listed.contains(&"Ingress") || listed.is_empty() {
        types.push("Ingress");
    }
    if has_rules("egress") || listed.contains(&"Egress") {
        types.push("Egress");
    }
    let types = json!(types);
    spec.insert("policyTypes".into(), types);
    obj["spec"] = Value::Object(spec);
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::testing::*;

    #[test]
    fn cluster_ip_service_defaults() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "v1", "Service", "web", Some("default"));
        let input = json!({"spec": {"selector": {"app": "web"}, "ports": [{"port": 80}]}});

        let obj = service(&input, &mut amb).unwrap();
        assert_eq!(obj["spec"]["type"], "ClusterIP");
        assert_eq!(obj["spec"]["clusterIP"], "127.0.0.1");
        let port = &obj["spec"]["ports"][0];
        assert_eq!(port["protocol"], "TCP");
        assert_eq!(port["targetPort"], 80);
        assert!(port.get("nodePort").is_none());
        assert_eq!(obj["status"]["loadBalancer"], json!({}));
    }

    #[test]
    fn load_balancer_gets_node_port_and_ingress() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "v1", "Service", "web", Some("default"));
        let input = json!({
            "spec": {
                "type": "LoadBalancer",
                "ports": [{"port": 80, "targetPort": 8080}, {"port": 443, "nodePort": 31443}]
            }
        });

        let obj = service(&input, &mut amb).unwrap();
        let ports = obj["spec"]["ports"].as_array().unwrap();
        let synthesized = ports[0]["nodePort"].as_u64().unwrap() as u16;
        assert!(NODE_PORT_RANGE.contains(&synthesized));
        assert_eq!(ports[0]["targetPort"], 8080);
        assert_eq!(ports[1]["nodePort"], 31443);
        assert_eq!(obj["status"]["loadBalancer"]["ingress"][0]["ip"], "127.0.0.1");
    }

    #[test]
    fn port_without_number_is_rejected() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "v1", "Service", "web", Some("default"));
        let err = service(&json!({"spec": {"ports": [{"name": "http"}]}}), &mut amb).unwrap_err();
        assert!(err.to_string().contains("spec.ports[0].port"));
    }

    #[test]
    fn policy_types_are_derived() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "networking.k8s.io/v1", "NetworkPolicy", "deny", Some("default"));

        let bare = network_policy(&json!({"spec": {}}), &mut amb).unwrap();
        assert_eq!(bare["spec"]["policyTypes"], json!(["Ingress"]));
        assert_eq!(bare["spec"]["podSelector"], json!({}));

        let egress_only = network_policy(
            &json!({"spec": {"policyTypes": ["Egress"], "egress": [{"to": []}]}}),
            &mut amb,
        )
        .unwrap();
        assert_eq!(egress_only["spec"]["policyTypes"], json!(["Egress"]));

        let both = network_policy(
            &json!({"spec": {"ingress": [{"from": []}], "egress": [{"to": []}]}}),
            &mut amb,
        )
        .unwrap();
        assert_eq!(both["spec"]["policyTypes"], json!(["Ingress", "Egress"]));
    }
}
