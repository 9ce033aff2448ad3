//! Built-in resource schema and discovery documents.
//!
//! Maps the plural resource segment of a REST path (`pods`, `deployments`)
//! to its kind, group/version and scope, and renders the discovery payloads
//! served under `/api` and `/apis`.

use serde_json::{Value, json};

/// Verbs advertised for every built-in resource.
const VERBS: &[&str] = &[
    "create",
    "delete",
    "deletecollection",
    "get",
    "list",
    "patch",
    "update",
    "watch",
];

/// A resource type known to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    /// Plural path segment, also the store key (`pods`).
    pub name: &'static str,
    pub singular: &'static str,
    pub kind: &'static str,
    /// API group; empty for the legacy core group.
    pub group: &'static str,
    pub version: &'static str,
    pub namespaced: bool,
    pub short_names: &'static [&'static str],
}

impl ResourceType {
    /// `v1` for the core group, `<group>/<version>` otherwise.
    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Path base under which this resource is served.
    pub fn base(&self) -> &'static str {
        if self.group.is_empty() { "api" } else { "apis" }
    }

    /// Kind of the list wrapper (`PodList`).
    pub fn list_kind(&self) -> String {
        format!("{}List", self.kind)
    }

    /// Entry in an `APIResourceList`.
    pub fn discovery_entry(&self) -> Value {
        let mut entry = json!({
            "name": self.name,
            "singularName": self.singular,
            "namespaced": self.namespaced,
            "kind": self.kind,
            "verbs": VERBS,
            "categories": ["all"],
        });
        if !self.short_names.is_empty() {
            entry["shortNames"] = json!(self.short_names);
        }
        entry
    }
}

macro_rules! resource {
    ($name:literal, $singular:literal, $kind:literal, $group:literal, $version:literal, $namespaced:literal, [$($short:literal),*]) => {
        ResourceType {
            name: $name,
            singular: $singular,
            kind: $kind,
            group: $group,
            version: $version,
            namespaced: $namespaced,
            short_names: &[$($short),*],
        }
    };
}

/// Resources served out of the box. Earlier entries win kind lookups.
pub static BUILTIN_RESOURCES: &[ResourceType] = &[
    resource!("namespaces", "namespace", "Namespace", "", "v1", false, ["ns"]),
    resource!("nodes", "node", "Node", "", "v1", false, ["no"]),
    resource!("pods", "pod", "Pod", "", "v1", true, ["po"]),
    resource!("replicationcontrollers", "replicationcontroller", "ReplicationController", "", "v1", true, ["rc"]),
    resource!("services", "service", "Service", "", "v1", true, ["svc"]),
    resource!("endpoints", "endpoints", "Endpoints", "", "v1", true, ["ep"]),
    resource!("configmaps", "configmap", "ConfigMap", "", "v1", true, ["cm"]),
    resource!("secrets", "secret", "Secret", "", "v1", true, []),
    resource!("serviceaccounts", "serviceaccount", "ServiceAccount", "", "v1", true, ["sa"]),
    resource!("events", "event", "Event", "", "v1", true, ["ev"]),
    resource!("persistentvolumes", "persistentvolume", "PersistentVolume", "", "v1", false, ["pv"]),
    resource!("persistentvolumeclaims", "persistentvolumeclaim", "PersistentVolumeClaim", "", "v1", true, ["pvc"]),
    resource!("deployments", "deployment", "Deployment", "apps", "v1", true, ["deploy"]),
    resource!("replicasets", "replicaset", "ReplicaSet", "apps", "v1", true, ["rs"]),
    resource!("statefulsets", "statefulset", "StatefulSet", "apps", "v1", true, ["sts"]),
    resource!("daemonsets", "daemonset", "DaemonSet", "apps", "v1", true, ["ds"]),
    resource!("deployments", "deployment", "Deployment", "extensions", "v1beta1", true, ["deploy"]),
    resource!("replicasets", "replicaset", "ReplicaSet", "extensions", "v1beta1", true, ["rs"]),
    resource!("networkpolicies", "networkpolicy", "NetworkPolicy", "extensions", "v1beta1", true, ["netpol"]),
    resource!("jobs", "job", "Job", "batch", "v1", true, []),
    resource!("cronjobs", "cronjob", "CronJob", "batch", "v1beta1", true, ["cj"]),
    resource!("networkpolicies", "networkpolicy", "NetworkPolicy", "networking.k8s.io", "v1", true, ["netpol"]),
    resource!("storageclasses", "storageclass", "StorageClass", "storage.k8s.io", "v1", false, ["sc"]),
];

/// Lookup table over the resources the server knows about.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    resources: Vec<ResourceType>,
}

impl Default for ResourceSchema {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ResourceSchema {
    pub fn builtin() -> Self {
        Self::new(BUILTIN_RESOURCES.to_vec())
    }

    pub fn new(resources: Vec<ResourceType>) -> Self {
        Self { resources }
    }

    pub fn resources(&self) -> &[ResourceType] {
        &self.resources
    }

    /// Resolve a plural path segment within a group/version.
    pub fn resolve(&self, group_version: &str, plural: &str) -> Option<ResourceType> {
        self.resources
            .iter()
            .find(|r| r.name == plural && r.group_version() == group_version)
            .copied()
    }

    /// Preferred resource type for a kind.
    pub fn by_kind(&self, kind: &str) -> Option<ResourceType> {
        self.resources.iter().find(|r| r.kind == kind).copied()
    }

    /// Whether anything is served under `group_version`.
    pub fn has_group_version(&self, group_version: &str) -> bool {
        self.resources
            .iter()
            .any(|r| r.group_version() == group_version)
    }

    /// Distinct named groups, in first-seen order.
    fn groups(&self) -> Vec<&'static str> {
        let mut groups = Vec::new();
        for r in &self.resources {
            if !r.group.is_empty() && !groups.contains(&r.group) {
                groups.push(r.group);
            }
        }
        groups
    }

    /// Versions of a group (empty string for core), in first-seen order.
    fn versions(&self, group: &str) -> Vec<&'static str> {
        let mut versions = Vec::new();
        for r in self.resources.iter().filter(|r| r.group == group) {
            if !versions.contains(&r.version) {
                versions.push(r.version);
            }
        }
        versions
    }

    // ── Discovery documents ────────────────────────────────────────

    /// `GET /`: every discovery path.
    pub fn root_paths(&self) -> Value {
        let mut paths = vec!["/api".to_string()];
        for version in self.versions("") {
            paths.push(format!("/api/{version}"));
        }
        paths.push("/apis".to_string());
        for group in self.groups() {
            paths.push(format!("/apis/{group}"));
            for version in self.versions(group) {
                paths.push(format!("/apis/{group}/{version}"));
            }
        }
        paths.push("/openapi/v2".to_string());
        paths.push("/version".to_string());
        json!({ "paths": paths })
    }

    /// `GET /api`
    pub fn api_versions(&self, server_address: &str) -> Value {
        json!({
            "kind": "APIVersions",
            "versions": self.versions(""),
            "serverAddressByClientCIDRs": [{
                "clientCIDR": "0.0.0.0/0",
                "serverAddress": server_address,
            }],
        })
    }

    fn api_group_body(&self, group: &str) -> Value {
        let versions: Vec<Value> = self
            .versions(group)
            .into_iter()
            .map(|v| json!({ "groupVersion": format!("{group}/{v}"), "version": v }))
            .collect();
        json!({
            "name": group,
            "versions": versions,
            "preferredVersion": versions.first().cloned().unwrap_or(Value::Null),
            "serverAddressByClientCIDRs": null,
        })
    }

    /// `GET /apis`
    pub fn api_group_list(&self) -> Value {
        let groups: Vec<Value> = self
            .groups()
            .into_iter()
            .map(|g| self.api_group_body(g))
            .collect();
        json!({
            "apiVersion": "v1",
            "kind": "APIGroupList",
            "groups": groups,
        })
    }

    /// `GET /apis/{group}`
    pub fn api_group(&self, group: &str) -> Option<Value> {
        if !self.groups().contains(&group) {
            return None;
        }
        let mut body = self.api_group_body(group);
        body["apiVersion"] = json!("v1");
        body["kind"] = json!("APIGroup");
        Some(body)
    }

    /// `GET /api/v1`, `GET /apis/{group}/{version}`
    pub fn resource_list(&self, group_version: &str) -> Option<Value> {
        let resources: Vec<Value> = self
            .resources
            .iter()
            .filter(|r| r.group_version() == group_version)
            .map(ResourceType::discovery_entry)
            .collect();
        if resources.is_empty() {
            return None;
        }
        let mut body = json!({
            "kind": "APIResourceList",
            "groupVersion": group_version,
            "resources": resources,
        });
        if group_version.contains('/') {
            body["apiVersion"] = json!("v1");
        }
        Some(body)
    }

    /// Minimal swagger document listing every object path.
    pub fn openapi(&self, git_version: &str) -> Value {
        let mut paths = serde_json::Map::new();
        for r in &self.resources {
            let prefix = format!("/{}/{}", r.base(), r.group_version());
            let gvk = json!({ "group": r.group, "version": r.version, "kind": r.kind });
            let collection = if r.namespaced {
                format!("{prefix}/namespaces/{{namespace}}/{}", r.name)
            } else {
                format!("{prefix}/{}", r.name)
            };
            for path in [collection.clone(), format!("{collection}/{{name}}")] {
                paths.insert(
                    path,
                    json!({ "get": { "x-kubernetes-group-version-kind": gvk } }),
                );
            }
        }
        json!({
            "swagger": "2.0",
            "info": { "title": "Kubernetes", "version": git_version },
            "paths": paths,
        })
    }
}
