//! PersistentVolume / PersistentVolumeClaim and the mutations that bind them.

use kubesim_core::object::DEFAULT_NAMESPACE;
use serde_json::{Value, json};

use crate::ambient::Ambient;
use crate::error::MaterializeResult;
use crate::meta::{default_field, skeleton, spec_of};

/// Set on a claim once the binder has paired it with a volume.
pub const BIND_COMPLETED_ANNOTATION: &str = "pv.kubernetes.io/bind-completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumePhase {
    Available,
    Bound,
    /// The claim is gone; the volume keeps its data.
    Released,
    /// Deletion requested while a claim still references the volume.
    Terminating,
}

impl VolumePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Bound => "Bound",
            Self::Released => "Released",
            Self::Terminating => "Terminating",
        }
    }

    pub fn of(volume: &Value) -> Option<Self> {
        match volume.pointer("/status/phase").and_then(Value::as_str)? {
            "Available" => Some(Self::Available),
            "Bound" => Some(Self::Bound),
            "Released" => Some(Self::Released),
            "Terminating" => Some(Self::Terminating),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimPhase {
    Pending,
    Bound,
}

impl ClaimPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Bound => "Bound",
        }
    }

    pub fn of(claim: &Value) -> Option<Self> {
        match claim.pointer("/status/phase").and_then(Value::as_str)? {
            "Pending" => Some(Self::Pending),
            "Bound" => Some(Self::Bound),
            _ => None,
        }
    }
}

pub fn persistent_volume(input: &Value, amb: &mut Ambient<'_>, phase: VolumePhase) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let mut spec = spec_of(input);
    if !spec.get("capacity").is_some_and(Value::is_object) {
        return Err(amb.missing("spec.capacity"));
    }
    default_field(&mut spec, "persistentVolumeReclaimPolicy", json!("Retain"));
    default_field(&mut spec, "accessModes", json!(["ReadWriteOnce"]));
    default_field(&mut spec, "storageClassName", json!(""));
    if phase == VolumePhase::Available {
        spec.remove("claimRef");
    }
    obj["spec"] = Value::Object(spec);
    obj["status"] = json!({ "phase": phase.as_str() });
    Ok(obj)
}

pub fn persistent_volume_claim(input: &Value, amb: &mut Ambient<'_>, phase: ClaimPhase) -> MaterializeResult<Value> {
    let mut obj = skeleton(input, amb);
    let mut spec = spec_of(input);
    default_field(&mut spec, "accessModes", json!(["ReadWriteOnce"]));
    default_field(&mut spec, "resources", json!({}));
    default_field(&mut spec, "storageClassName", json!(""));
    obj["spec"] = Value::Object(spec);

    let mut status = json!({ "phase": phase.as_str() });
    if phase == ClaimPhase::Bound {
        for key in ["accessModes", "capacity"] {
            if let Some(v) = input.pointer(&format!("/status/{key}")) {
                status[key] = v.clone();
            }
        }
    }
    obj["status"] = status;
    Ok(obj)
}

// ── Binding mutations ──────────────────────────────────────────────

/// Point `volume` at `claim` and mark it `Bound`.
pub fn bind_volume(volume: &mut Value, claim: &Value) {
    volume["spec"]["claimRef"] = json!({
        "apiVersion": "v1",
        "kind": "PersistentVolumeClaim",
        "name": claim.pointer("/metadata/name").cloned().unwrap_or(Value::Null),
        "namespace": claim.pointer("/metadata/namespace").cloned().unwrap_or(Value::Null),
        "uid": claim.pointer("/metadata/uid").cloned().unwrap_or(Value::Null),
    });
    set_volume_phase(volume, VolumePhase::Bound);
}

/// Point `claim` at `volume`, copy the volume's capacity and access modes and
/// mark it `Bound`.
pub fn bind_claim(claim: &mut Value, volume: &Value) {
    let volume_name = volume.pointer("/metadata/name").cloned().unwrap_or(Value::Null);
    claim["spec"]["volumeName"] = volume_name;
    claim["metadata"]["annotations"][BIND_COMPLETED_ANNOTATION] = json!("yes");
    claim["status"] = json!({
        "phase": ClaimPhase::Bound.as_str(),
        "accessModes": volume.pointer("/spec/accessModes").cloned().unwrap_or_else(|| json!([])),
        "capacity": volume.pointer("/spec/capacity").cloned().unwrap_or_else(|| json!({})),
    });
}

pub fn set_volume_phase(volume: &mut Value, phase: VolumePhase) {
    volume["status"]["phase"] = json!(phase.as_str());
}

/// `(namespace, name)` of the claim a volume points at, if any.
pub fn claim_ref(volume: &Value) -> Option<(&str, &str)> {
    let claim = volume.pointer("/spec/claimRef")?;
    let name = claim.get("name").and_then(Value::as_str)?;
    let namespace = claim
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_NAMESPACE);
    Some((namespace, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::testing::*;

    fn volume_input() -> Value {
        json!({
            "metadata": {"name": "pv1", "labels": {"speed": "fast"}},
            "spec": {"capacity": {"storage": "10Gi"}, "accessModes": ["ReadWriteOnce", "ReadOnlyMany"]}
        })
    }

    #[test]
    fn volume_defaults() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "v1", "PersistentVolume", "pv1", None);
        let obj = persistent_volume(&volume_input(), &mut amb, VolumePhase::Available).unwrap();
        assert_eq!(obj["spec"]["persistentVolumeReclaimPolicy"], "Retain");
        assert_eq!(obj["status"]["phase"], "Available");
        assert_eq!(VolumePhase::of(&obj), Some(VolumePhase::Available));
        assert!(obj["metadata"].get("namespace").is_none());
    }

    #[test]
    fn volume_requires_capacity() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "v1", "PersistentVolume", "pv1", None);
        assert!(persistent_volume(&json!({"spec": {}}), &mut amb, VolumePhase::Available).is_err());
    }

    #[test]
    fn binding_is_mutual() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "v1", "PersistentVolume", "pv1", None);
        let mut volume = persistent_volume(&volume_input(), &mut amb, VolumePhase::Available).unwrap();
        let mut amb = ambient(&mut rng, "v1", "PersistentVolumeClaim", "data", Some("default"));
        let mut claim = persistent_volume_claim(
            &json!({"spec": {"resources": {"requests": {"storage": "1Gi"}}}}),
            &mut amb,
            ClaimPhase::Pending,
        )
        .unwrap();
        assert_eq!(ClaimPhase::of(&claim), Some(ClaimPhase::Pending));

        bind_volume(&mut volume, &claim);
        bind_claim(&mut claim, &volume);

        assert_eq!(VolumePhase::of(&volume), Some(VolumePhase::Bound));
        assert_eq!(claim_ref(&volume), Some(("default", "data")));
        assert_eq!(ClaimPhase::of(&claim), Some(ClaimPhase::Bound));
        assert_eq!(claim["spec"]["volumeName"], "pv1");
        assert_eq!(claim["status"]["capacity"]["storage"], "10Gi");
        assert_eq!(claim["metadata"]["annotations"][BIND_COMPLETED_ANNOTATION], "yes");
    }

    #[test]
    fn rematerializing_a_bound_claim_keeps_status() {
        let mut rng = rng();
        let mut amb = ambient(&mut rng, "v1", "PersistentVolumeClaim", "data", Some("default"));
        let input = json!({
            "spec": {"volumeName": "pv1"},
            "status": {"phase": "Bound", "capacity": {"storage": "10Gi"}, "accessModes": ["ReadWriteOnce"]}
        });
        let obj = persistent_volume_claim(&input, &mut amb, ClaimPhase::Bound).unwrap();
        assert_eq!(obj["status"]["capacity"]["storage"], "10Gi");
        assert_eq!(obj["spec"]["volumeName"], "pv1");
    }

    #[test]
    fn released_volume_keeps_claim_ref() {
        let mut volume = json!({"spec": {"claimRef": {"name": "data", "namespace": "apps"}}, "status": {}});
        set_volume_phase(&mut volume, VolumePhase::Released);
        assert_eq!(VolumePhase::of(&volume), Some(VolumePhase::Released));
        assert_eq!(claim_ref(&volume), Some(("apps", "data")));
    }
}
