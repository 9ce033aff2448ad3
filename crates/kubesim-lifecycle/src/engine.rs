//! Engine — request dispatch and the store primitives handlers build on.
//!
//! Every public operation resolves the target's namespace, checks it
//! exists, and hands off to the registered [`KindHandler`]. Handlers call
//! back into the `pub(crate)` primitives here for the actual
//! read-modify-write cycles against the store.

use std::collections::HashMap;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use tracing::{debug, info};

use kubesim_core::object::{self, DEFAULT_NAMESPACE};
use kubesim_core::{ResourceSchema, ResourceType, merge_patch};
use kubesim_objects::{Ambient, MaterializeError, MaterializeResult, random_suffix};
use kubesim_selector::Query;
use kubesim_state::ResourceStore;

use crate::error::{EngineError, EngineResult};
use crate::registry::{KindHandler, handler};

/// Length of the random suffix appended to `metadata.generateName`.
const GENERATE_NAME_SUFFIX: usize = 5;

/// Fully resolved identity of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub resource: ResourceType,
    /// Always `Some` for namespaced kinds and `None` for cluster-scoped ones.
    pub namespace: Option<String>,
    pub name: String,
}

impl Target {
    /// Normalize `namespace` against the resource's scope: namespaced kinds
    /// fall back to `default`, cluster-scoped kinds drop it.
    pub fn new(resource: ResourceType, namespace: Option<&str>, name: &str) -> Self {
        let namespace = resource
            .namespaced
            .then(|| namespace.unwrap_or(DEFAULT_NAMESPACE).to_string());
        Self {
            resource,
            namespace,
            name: name.to_string(),
        }
    }

    /// Store key of the target's collection.
    pub fn key(&self) -> &'static str {
        self.resource.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn matches(&self, obj: &Value) -> bool {
        object::has_identity(obj, &self.name, self.namespace())
    }

    /// Target for a stored object of `resource`.
    pub fn of(resource: ResourceType, obj: &Value) -> Option<Self> {
        Some(Self::new(resource, object::namespace(obj), object::name(obj)?))
    }
}

/// The lifecycle engine.
///
/// Owns the store and serializes every mutation through `&mut self`.
pub struct Engine {
    store: ResourceStore,
    schema: ResourceSchema,
    rng: StdRng,
}

impl Engine {
    /// Create an engine. `seed` fixes the RNG used for generated names,
    /// node choice and port allocation.
    pub fn new(store: ResourceStore, schema: ResourceSchema, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { store, schema, rng }
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// Seed namespaces and nodes that are not already stored.
    pub fn bootstrap(&mut self, namespaces: &[String], nodes: &[String]) -> EngineResult<()> {
        let namespace = self.resource_for("Namespace")?;
        for name in namespaces {
            let target = Target::new(namespace, None, name);
            if self.lookup(&target)?.is_none() {
                self.create(namespace, None, json!({"metadata": {"name": name}}))?;
            }
        }
        let node = self.resource_for("Node")?;
        for name in nodes {
            let target = Target::new(node, None, name);
            if self.lookup(&target)?.is_none() {
                self.create(node, None, json!({"metadata": {"name": name}}))?;
            }
        }
        info!(namespaces = namespaces.len(), nodes = nodes.len(), "cluster bootstrapped");
        Ok(())
    }

    // ── Public operations ──────────────────────────────────────────

    /// Create an object. For namespaced kinds the path namespace wins over
    /// the body's, which wins over `default`.
    pub fn create(
        &mut self,
        resource: ResourceType,
        namespace: Option<&str>,
        body: Value,
    ) -> EngineResult<Value> {
        if !body.is_object() {
            return Err(EngineError::Internal("request body must be a JSON object".into()));
        }
        let namespace = namespace.or_else(|| object::namespace(&body));
        let name = self.resolve_name(resource, &body)?;
        let target = Target::new(resource, namespace, &name);
        self.ensure_namespace(target.namespace())?;
        handler(resource.kind).create(self, &target, body)
    }

    pub fn get(&mut self, target: &Target) -> EngineResult<Value> {
        self.ensure_namespace(target.namespace())?;
        handler(target.resource.kind).get(self, target)
    }

    /// List a collection. `namespace` restricts namespaced kinds; `None`
    /// lists across all namespaces.
    pub fn list(
        &mut self,
        resource: ResourceType,
        namespace: Option<&str>,
        label_selector: Option<&str>,
        field_selector: Option<&str>,
    ) -> EngineResult<Vec<Value>> {
        if resource.namespaced {
            self.ensure_namespace(namespace)?;
        }
        let query = Query::parse(namespace, resource.namespaced, label_selector, field_selector)?;
        handler(resource.kind).list(self, resource.name, &query)
    }

    /// Recursive partial merge of `patch` into the stored object.
    pub fn update(&mut self, target: &Target, patch: Value) -> EngineResult<Value> {
        self.ensure_namespace(target.namespace())?;
        handler(target.resource.kind).update(self, target, patch)
    }

    /// Full overwrite of the stored object.
    pub fn replace(&mut self, target: &Target, body: Value) -> EngineResult<Value> {
        if !body.is_object() {
            return Err(EngineError::Internal("request body must be a JSON object".into()));
        }
        self.ensure_namespace(target.namespace())?;
        handler(target.resource.kind).replace(self, target, body)
    }

    /// Delete an object, returning its last stored representation.
    pub fn delete(&mut self, target: &Target) -> EngineResult<Value> {
        self.ensure_namespace(target.namespace())?;
        handler(target.resource.kind).delete(self, target)
    }

    /// Kind-specific named sub-operation.
    pub fn operation(
        &mut self,
        target: &Target,
        operation: &str,
        params: &HashMap<String, String>,
    ) -> EngineResult<Value> {
        self.ensure_namespace(target.namespace())?;
        handler(target.resource.kind).operation(self, target, operation, params)
    }

    // ── Primitives for handlers ────────────────────────────────────

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub(crate) fn resource_for(&self, kind: &str) -> EngineResult<ResourceType> {
        self.schema
            .by_kind(kind)
            .ok_or_else(|| EngineError::Internal(format!("no resource registered for kind {kind}")))
    }

    pub(crate) fn collection(&self, key: &str) -> EngineResult<Vec<Value>> {
        Ok(self.store.get(key)?)
    }

    pub(crate) fn save(&self, key: &str, objects: &[Value]) -> EngineResult<()> {
        self.store.set(key, objects)?;
        debug!(%key, count = objects.len(), "collection saved");
        Ok(())
    }

    pub(crate) fn lookup(&self, target: &Target) -> EngineResult<Option<Value>> {
        Ok(self
            .collection(target.key())?
            .into_iter()
            .find(|o| target.matches(o)))
    }

    pub(crate) fn find(&self, target: &Target) -> EngineResult<Value> {
        self.lookup(target)?
            .ok_or_else(|| EngineError::not_found(target.key(), &target.name))
    }

    /// Objects in `key` owned by `owner` and sharing its namespace, in
    /// collection order.
    pub(crate) fn owned(&self, key: &str, owner: &Value) -> EngineResult<Vec<Value>> {
        let kind = object::kind(owner).unwrap_or_default();
        let name = object::name(owner).unwrap_or_default();
        let namespace = object::namespace(owner);
        Ok(self
            .collection(key)?
            .into_iter()
            .filter(|o| object::is_owned_by(o, kind, name) && object::namespace(o) == namespace)
            .collect())
    }

    /// Run a builder with an ambient context for `target`.
    pub(crate) fn materialize<F>(&mut self, target: &Target, build: F) -> EngineResult<Value>
    where
        F: FnOnce(&mut Ambient<'_>) -> MaterializeResult<Value>,
    {
        let api_version = target.resource.group_version();
        let mut amb = Ambient {
            api_version: &api_version,
            kind: target.resource.kind,
            name: &target.name,
            namespace: target.namespace(),
            now: Utc::now(),
            rng: &mut self.rng,
        };
        Ok(build(&mut amb)?)
    }

    /// Materialize `body` and append it to the collection.
    pub(crate) fn insert<H>(&mut self, handler: &H, target: &Target, body: Value) -> EngineResult<Value>
    where
        H: KindHandler + ?Sized,
    {
        if self.lookup(target)?.is_some() {
            return Err(EngineError::already_exists(target.key(), &target.name));
        }
        let obj = handler.materialize(self, target, &body, None)?;
        let mut objects = self.collection(target.key())?;
        objects.push(obj.clone());
        self.save(target.key(), &objects)?;
        info!(
            kind = target.resource.kind,
            name = %target.name,
            namespace = target.namespace().unwrap_or_default(),
            "object created"
        );
        Ok(obj)
    }

    /// Merge `patch` into the stored object and re-materialize it in place.
    pub(crate) fn merge<H>(&mut self, handler: &H, target: &Target, patch: &Value) -> EngineResult<Value>
    where
        H: KindHandler + ?Sized,
    {
        let existing = self.find(target)?;
        let mut merged = existing.clone();
        merge_patch(&mut merged, patch);
        let obj = handler.materialize(self, target, &merged, Some(&existing))?;
        self.put(target, obj.clone())?;
        info!(kind = target.resource.kind, name = %target.name, "object updated");
        Ok(obj)
    }

    /// Replace the stored object with `body`, keeping its `uid` and
    /// `creationTimestamp` unless the body carries its own.
    pub(crate) fn overwrite<H>(&mut self, handler: &H, target: &Target, mut body: Value) -> EngineResult<Value>
    where
        H: KindHandler + ?Sized,
    {
        let existing = self.find(target)?;
        let meta = object::metadata_mut(&mut body);
        for key in ["uid", "creationTimestamp"] {
            if !meta.contains_key(key) {
                if let Some(value) = existing.pointer(&format!("/metadata/{key}")) {
                    meta.insert(key.to_string(), value.clone());
                }
            }
        }
        let obj = handler.materialize(self, target, &body, Some(&existing))?;
        self.put(target, obj.clone())?;
        info!(kind = target.resource.kind, name = %target.name, "object replaced");
        Ok(obj)
    }

    /// Write `obj` over the stored object with `target`'s identity, keeping
    /// its position; appends when absent.
    pub(crate) fn put(&self, target: &Target, obj: Value) -> EngineResult<()> {
        let mut objects = self.collection(target.key())?;
        match objects.iter_mut().find(|o| target.matches(o)) {
            Some(slot) => *slot = obj,
            None => objects.push(obj),
        }
        self.save(target.key(), &objects)
    }

    /// Remove the object and return it.
    pub(crate) fn remove(&mut self, target: &Target) -> EngineResult<Value> {
        let mut objects = self.collection(target.key())?;
        let index = objects
            .iter()
            .position(|o| target.matches(o))
            .ok_or_else(|| EngineError::not_found(target.key(), &target.name))?;
        let removed = objects.remove(index);
        self.save(target.key(), &objects)?;
        info!(kind = target.resource.kind, name = %target.name, "object deleted");
        Ok(removed)
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn ensure_namespace(&self, namespace: Option<&str>) -> EngineResult<()> {
        let Some(namespace) = namespace else {
            return Ok(());
        };
        let exists = self
            .collection("namespaces")?
            .iter()
            .any(|ns| object::name(ns) == Some(namespace));
        if exists {
            Ok(())
        } else {
            Err(EngineError::NamespaceNotFound(namespace.to_string()))
        }
    }

    /// `metadata.name`, or `metadata.generateName` plus a random suffix.
    fn resolve_name(&mut self, resource: ResourceType, body: &Value) -> EngineResult<String> {
        if let Some(name) = object::name(body) {
            return Ok(name.to_string());
        }
        if let Some(prefix) = object::str_at(body, "/metadata/generateName") {
            let suffix = random_suffix(&mut self.rng, GENERATE_NAME_SUFFIX);
            return Ok(format!("{prefix}{suffix}"));
        }
        Err(MaterializeError::MissingField {
            kind: resource.kind.to_string(),
            name: String::new(),
            field: "metadata.name".into(),
        }
        .into())
    }
}
