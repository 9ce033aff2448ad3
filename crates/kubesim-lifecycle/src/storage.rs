//! Volume ↔ claim binding.
//!
//! ```text
//! volume: Available ──bind──▶ Bound ──claim deleted──▶ Released
//!                               │
//!                               └──volume deleted while claimed──▶ Terminating
//!                                                                   │
//!                                         claim deleted ────────────┴──▶ removed
//! ```
//!
//! Binding always updates both sides inside the same call.

use serde_json::Value;
use tracing::{debug, info};

use kubesim_core::object;
use kubesim_objects::quantity;
use kubesim_objects::storage::{self, ClaimPhase, VolumePhase};
use kubesim_selector::{LabelSelector, Selector};

use crate::engine::{Engine, Target};
use crate::error::EngineResult;
use crate::registry::KindHandler;

// ── Matching ───────────────────────────────────────────────────────

fn storage_class(obj: &Value) -> &str {
    object::str_at(obj, "/spec/storageClassName").unwrap_or_default()
}

fn access_modes(obj: &Value) -> Vec<&str> {
    obj.pointer("/spec/accessModes")
        .and_then(Value::as_array)
        .map(|modes| modes.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Whether an `Available` volume can satisfy `claim`.
///
/// A claim naming a volume only matches that volume; otherwise the claim's
/// selector, storage class, requested size and access modes must all fit.
fn satisfies(volume: &Value, claim: &Value) -> EngineResult<bool> {
    if VolumePhase::of(volume) != Some(VolumePhase::Available) {
        return Ok(false);
    }
    if let Some(wanted) = object::str_at(claim, "/spec/volumeName") {
        return Ok(object::name(volume) == Some(wanted));
    }
    if let Some(selector) = claim.pointer("/spec/selector").filter(|s| s.is_object()) {
        if !LabelSelector::from_match_spec(selector)?.matches(volume) {
            return Ok(false);
        }
    }
    if storage_class(volume) != storage_class(claim) {
        return Ok(false);
    }
    if let Some(request) = quantity::storage_at(claim, "/spec/resources/requests/storage") {
        let capacity = quantity::storage_at(volume, "/spec/capacity/storage").unwrap_or(0.0);
        if capacity < request {
            return Ok(false);
        }
    }
    let offered = access_modes(volume);
    Ok(access_modes(claim).iter().all(|mode| offered.contains(mode)))
}

/// Bind `volume` and `claim` and persist both.
fn bind(engine: &Engine, volume: &mut Value, claim: &mut Value) -> EngineResult<()> {
    storage::bind_volume(volume, claim);
    storage::bind_claim(claim, volume);
    let volume_target = Target::of(engine.resource_for("PersistentVolume")?, volume);
    let claim_target = Target::of(engine.resource_for("PersistentVolumeClaim")?, claim);
    if let (Some(volume_target), Some(claim_target)) = (volume_target, claim_target) {
        engine.put(&volume_target, volume.clone())?;
        engine.put(&claim_target, claim.clone())?;
        info!(
            volume = %volume_target.name,
            claim = %claim_target.name,
            namespace = claim_target.namespace().unwrap_or_default(),
            "volume bound"
        );
    }
    Ok(())
}

/// Claim currently holding `volume`, if it still exists and points back.
fn holder(engine: &Engine, volume: &Value) -> EngineResult<Option<Value>> {
    let Some((namespace, name)) = storage::claim_ref(volume) else {
        return Ok(None);
    };
    let volume_name = object::name(volume);
    Ok(engine
        .collection("persistentvolumeclaims")?
        .into_iter()
        .find(|c| {
            object::has_identity(c, name, Some(namespace))
                && object::str_at(c, "/spec/volumeName") == volume_name
        }))
}

// ── Handlers ───────────────────────────────────────────────────────

pub struct VolumeHandler;

impl KindHandler for VolumeHandler {
    /// Update and replace keep the current binding.
    fn materialize(
        &self,
        engine: &mut Engine,
        target: &Target,
        input: &Value,
        existing: Option<&Value>,
    ) -> EngineResult<Value> {
        let phase = existing
            .and_then(VolumePhase::of)
            .unwrap_or(VolumePhase::Available);
        let mut volume = engine.materialize(target, |amb| storage::persistent_volume(input, amb, phase))?;
        if phase != VolumePhase::Available {
            if let Some(claim_ref) = existing.and_then(|e| e.pointer("/spec/claimRef")) {
                volume["spec"]["claimRef"] = claim_ref.clone();
            }
        }
        Ok(volume)
    }

    /// New volumes pick up the first pending claim they satisfy.
    fn create(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let mut volume = engine.insert(self, target, body)?;
        for mut claim in engine.collection("persistentvolumeclaims")? {
            if ClaimPhase::of(&claim) == Some(ClaimPhase::Pending) && satisfies(&volume, &claim)? {
                bind(engine, &mut volume, &mut claim)?;
                break;
            }
        }
        Ok(volume)
    }

    /// A volume still held by a claim is marked `Terminating` instead of
    /// removed; it goes away once the claim is deleted.
    fn delete(&self, engine: &mut Engine, target: &Target) -> EngineResult<Value> {
        let mut volume = engine.find(target)?;
        if holder(engine, &volume)?.is_some() {
            storage::set_volume_phase(&mut volume, VolumePhase::Terminating);
            engine.put(target, volume.clone())?;
            info!(volume = %target.name, "volume in use, terminating");
            return Ok(volume);
        }
        engine.remove(target)
    }
}

pub struct ClaimHandler;

impl KindHandler for ClaimHandler {
    /// Update and replace keep the current binding.
    fn materialize(
        &self,
        engine: &mut Engine,
        target: &Target,
        input: &Value,
        existing: Option<&Value>,
    ) -> EngineResult<Value> {
        let phase = existing
            .and_then(ClaimPhase::of)
            .unwrap_or(ClaimPhase::Pending);
        let mut claim = engine.materialize(target, |amb| storage::persistent_volume_claim(input, amb, phase))?;
        if phase == ClaimPhase::Bound {
            let bound_to = existing.and_then(|e| object::str_at(e, "/spec/volumeName"));
            if let Some(name) = bound_to {
                let volumes = engine.resource_for("PersistentVolume")?;
                if let Some(volume) = engine.lookup(&Target::new(volumes, None, name))? {
                    storage::bind_claim(&mut claim, &volume);
                }
            }
        }
        Ok(claim)
    }

    /// New claims bind to the first matching available volume, in
    /// collection order.
    fn create(&self, engine: &mut Engine, target: &Target, body: Value) -> EngineResult<Value> {
        let mut claim = engine.insert(self, target, body)?;
        for mut volume in engine.collection("persistentvolumes")? {
            if satisfies(&volume, &claim)? {
                bind(engine, &mut volume, &mut claim)?;
                return Ok(claim);
            }
        }
        debug!(claim = %target.name, "no matching volume, claim pending");
        Ok(claim)
    }

    /// Releases the bound volume, or removes it if its deletion was
    /// already requested.
    fn delete(&self, engine: &mut Engine, target: &Target) -> EngineResult<Value> {
        let claim = engine.remove(target)?;
        if ClaimPhase::of(&claim) != Some(ClaimPhase::Bound) {
            return Ok(claim);
        }
        let Some(volume_name) = object::str_at(&claim, "/spec/volumeName") else {
            return Ok(claim);
        };
        let volume_target = Target::new(engine.resource_for("PersistentVolume")?, None, volume_name);
        if let Some(mut volume) = engine.lookup(&volume_target)? {
            if VolumePhase::of(&volume) == Some(VolumePhase::Terminating) {
                engine.remove(&volume_target)?;
            } else {
                storage::set_volume_phase(&mut volume, VolumePhase::Released);
                engine.put(&volume_target, volume)?;
                info!(volume = %volume_name, "volume released");
            }
        }
        Ok(claim)
    }
}
