//! REST path parsing.
//!
//! ```text
//! /api/v1[/namespaces/<ns>]/<resource>[/<name>][/<operation>]
//! /apis/<group>/<version>[/namespaces/<ns>]/<resource>[/<name>][/<operation>]
//! ```
//!
//! Anything shorter is a discovery request.

/// Parsed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiPath {
    /// `/`
    Root,
    /// `/api`
    CoreVersions,
    /// `/apis`
    Groups,
    /// `/apis/<group>`
    Group(String),
    /// `/api/v1`, `/apis/<group>/<version>`
    Resources(String),
    Object(ObjectPath),
    /// Not under `/api` or `/apis`, or too many segments.
    Unknown,
}

/// Path addressing a collection, an object, or an object sub-operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    pub group_version: String,
    /// Plural resource segment.
    pub resource: String,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub operation: Option<String>,
}

impl ApiPath {
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::Root,
            ["api"] => Self::CoreVersions,
            ["api", version] => Self::Resources(version.to_string()),
            ["api", version, rest @ ..] => Self::object(version.to_string(), rest),
            ["apis"] => Self::Groups,
            ["apis", group] => Self::Group(group.to_string()),
            ["apis", group, version] => Self::Resources(format!("{group}/{version}")),
            ["apis", group, version, rest @ ..] => Self::object(format!("{group}/{version}"), rest),
            _ => Self::Unknown,
        }
    }

    fn object(group_version: String, rest: &[&str]) -> Self {
        let (namespace, rest) = match rest {
            ["namespaces", namespace, tail @ ..] if !tail.is_empty() => (Some(namespace.to_string()), tail),
            _ => (None, rest),
        };
        match rest {
            [resource, tail @ ..] if tail.len() <= 2 => Self::Object(ObjectPath {
                group_version,
                resource: resource.to_string(),
                namespace,
                name: tail.first().map(|s| s.to_string()),
                operation: tail.get(1).map(|s| s.to_string()),
            }),
            _ => Self::Unknown,
        }
    }
}
