//! Universal defaults and the generic builder used for kinds without their own.

use serde_json::{Map, Value, json};

use crate::ambient::Ambient;
use crate::error::MaterializeResult;

/// Canonical `metadata` block.
///
/// Keeps whatever metadata the input carries, then pins identity, defaults
/// `labels`/`annotations` to `{}` and stamps `uid` and `creationTimestamp`
/// if they are not already present.
pub fn metadata(input: &Value, amb: &Ambient<'_>) -> Map<String, Value> {
    let mut meta = input
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    meta.insert("name".into(), json!(amb.name));
    match amb.namespace {
        Some(ns) => {
            meta.insert("namespace".into(), json!(ns));
        }
        None => {
            meta.remove("namespace");
        }
    }
    meta.remove("generateName");
    for key in ["labels", "annotations"] {
        if !meta.get(key).is_some_and(Value::is_object) {
            meta.insert(key.into(), json!({}));
        }
    }
    if !meta.get("uid").is_some_and(Value::is_string) {
        meta.insert("uid".into(), json!(uuid::Uuid::new_v4().to_string()));
    }
    if !meta.get("creationTimestamp").is_some_and(Value::is_string) {
        meta.insert("creationTimestamp".into(), json!(amb.timestamp()));
    }
    meta
}

/// `{apiVersion, kind, metadata}` skeleton every builder starts from.
pub fn skeleton(input: &Value, amb: &Ambient<'_>) -> Value {
    let api_version = input
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or(amb.api_version);
    json!({
        "apiVersion": api_version,
        "kind": amb.kind,
        "metadata": metadata(input, amb),
    })
}

/// Input `spec` as a mapping (empty when absent).
pub fn spec_of(input: &Value) -> Map<String, Value> {
    input
        .get("spec")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Insert `value` under `key` unless a non-null value is already there.
pub fn default_field(map: &mut Map<String, Value>, key: &str, value: Value) {
    if map.get(key).is_none_or(Value::is_null) {
        map.insert(key.to_string(), value);
    }
}

/// Builder for kinds without dedicated rules: universal defaults plus every
/// other top-level field of the input as given.
pub fn generic(input: &Value, amb: &mut Ambient<'_>) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    if let (Some(fields), Some(out)) = (input.as_object(), obj.as_object_mut()) {
        for (key, value) in fields {
            if !matches!(key.as_str(), "apiVersion" | "kind" | "metadata") {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(obj)
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::ambient::Ambient;

    pub fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    pub fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2018-06-06T08:00:59Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    pub fn ambient<'a>(
        rng: &'a mut StdRng,
        api_version: &'a str,
        kind: &'a str,
        name: &'a str,
        namespace: Option<&'a str>,
    ) -> Ambient<'a> {
        Ambient {
            api_version,
            kind,
            name,
            namespace,
            now: now(),
            rng,
        }
    }
}
