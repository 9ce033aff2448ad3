//! Recursive partial merge over JSON trees.
//!
//! Rules per key of the patch document:
//! - `null` removes the key from the target
//! - a mapping merges into an existing mapping recursively
//! - anything else overwrites the target value

use serde_json::Value;

/// Merge `patch` into `target` in place.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    let Value::Object(target_map) = target else {
        return;
    };

    for (key, value) in patch_map {
        if value.is_null() {
            target_map.remove(key);
            continue;
        }
        if let Some(existing) = target_map.get_mut(key) {
            if existing.is_object() && value.is_object() {
                merge_patch(existing, value);
                continue;
            }
        }
        target_map.insert(key.clone(), strip_nulls(value));
    }
}

/// Nulls inside freshly inserted subtrees have nothing to delete.
fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
