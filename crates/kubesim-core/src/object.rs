//! Accessors over JSON resource objects.
//!
//! Objects are kept as `serde_json::Value` trees end to end; these helpers
//! read the well-known metadata paths without committing to a typed model.

use serde_json::{Map, Value, json};

/// Namespace assumed for namespaced kinds when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

pub fn name(obj: &Value) -> Option<&str> {
    obj.pointer("/metadata/name").and_then(Value::as_str)
}

pub fn namespace(obj: &Value) -> Option<&str> {
    obj.pointer("/metadata/namespace").and_then(Value::as_str)
}

pub fn kind(obj: &Value) -> Option<&str> {
    obj.get("kind").and_then(Value::as_str)
}

pub fn labels(obj: &Value) -> Option<&Map<String, Value>> {
    obj.pointer("/metadata/labels").and_then(Value::as_object)
}

pub fn label<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    labels(obj)?.get(key).and_then(Value::as_str)
}

pub fn annotation<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.pointer("/metadata/annotations")?
        .get(key)
        .and_then(Value::as_str)
}

/// Read a string at a JSON pointer.
pub fn str_at<'a>(obj: &'a Value, pointer: &str) -> Option<&'a str> {
    obj.pointer(pointer).and_then(Value::as_str)
}

/// Status phase of an object (`status.phase`).
pub fn phase(obj: &Value) -> Option<&str> {
    str_at(obj, "/status/phase")
}

/// True when `obj` has the given name within the given namespace.
///
/// Cluster-scoped lookups pass `None` and only match objects without a
/// namespace.
pub fn has_identity(obj: &Value, name: &str, namespace: Option<&str>) -> bool {
    self::name(obj) == Some(name) && self::namespace(obj) == namespace
}

pub fn owner_references(obj: &Value) -> &[Value] {
    obj.pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// True when any owner reference names `kind`/`name`.
pub fn is_owned_by(obj: &Value, kind: &str, name: &str) -> bool {
    owner_references(obj).iter().any(|r| {
        r.get("kind").and_then(Value::as_str) == Some(kind)
            && r.get("name").and_then(Value::as_str) == Some(name)
    })
}

/// True when any owner reference is of the given kind.
pub fn has_owner_kind(obj: &Value, kind: &str) -> bool {
    owner_references(obj)
        .iter()
        .any(|r| r.get("kind").and_then(Value::as_str) == Some(kind))
}

pub fn owner_reference(api_version: &str, kind: &str, name: &str) -> Value {
    json!({
        "apiVersion": api_version,
        "kind": kind,
        "name": name,
    })
}

/// Mutable access to `metadata`, creating it when missing.
pub fn metadata_mut(obj: &mut Value) -> &mut Map<String, Value> {
    object_entry(obj, "metadata")
}

/// Mutable access to a mapping under `metadata` (`labels`, `annotations`).
pub fn metadata_entry<'a>(obj: &'a mut Value, key: &str) -> &'a mut Map<String, Value> {
    let entry = metadata_mut(obj)
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    ensure_object(entry)
}

/// Mutable access to a child mapping, replacing non-mappings with `{}`.
pub fn object_entry<'a>(obj: &'a mut Value, key: &str) -> &'a mut Map<String, Value> {
    let entry = ensure_object(obj)
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    ensure_object(entry)
}

/// Coerce `value` into a mapping and return it.
pub fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_metadata() {
        let pod = json!({
            "kind": "Pod",
            "metadata": {
                "name": "web-1",
                "namespace": "default",
                "labels": {"app": "web"},
                "annotations": {"a": "b"},
                "ownerReferences": [{"apiVersion": "v1", "kind": "ReplicationController", "name": "web"}]
            }
        });
        assert_eq!(name(&pod), Some("web-1"));
        assert_eq!(namespace(&pod), Some("default"));
        assert_eq!(kind(&pod), Some("Pod"));
        assert_eq!(label(&pod, "app"), Some("web"));
        assert_eq!(annotation(&pod, "a"), Some("b"));
        assert!(is_owned_by(&pod, "ReplicationController", "web"));
        assert!(!is_owned_by(&pod, "ReplicaSet", "web"));
        assert!(has_owner_kind(&pod, "ReplicationController"));
        assert!(has_identity(&pod, "web-1", Some("default")));
        assert!(!has_identity(&pod, "web-1", None));
    }

    #[test]
    fn metadata_mut_creates_mapping() {
        let mut obj = json!({"kind": "Pod"});
        metadata_mut(&mut obj).insert("name".into(), json!("x"));
        assert_eq!(name(&obj), Some("x"));
    }

    #[test]
    fn metadata_entry_replaces_non_mappings() {
        let mut obj = json!({"metadata": {"labels": null}});
        metadata_entry(&mut obj, "labels").insert("a".into(), json!("b"));
        metadata_entry(&mut obj, "annotations").insert("c".into(), json!("d"));
        assert_eq!(label(&obj, "a"), Some("b"));
        assert_eq!(annotation(&obj, "c"), Some("d"));
    }

    #[test]
    fn ensure_object_keeps_mappings_and_replaces_scalars() {
        let mut selector = json!({"app": "web"});
        ensure_object(&mut selector).insert("tier".into(), json!("front"));
        assert_eq!(selector, json!({"app": "web", "tier": "front"}));

        for scalar in [json!("app=web"), json!(3), json!(null), json!(["a"])] {
            let mut value = scalar;
            assert!(ensure_object(&mut value).is_empty());
            assert_eq!(value, json!({}));
        }
    }
}
