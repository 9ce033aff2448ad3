//! REST API handlers.
//!
//! Object requests go through [`dispatch`], which resolves the path against
//! the schema and runs the matching engine operation under the engine lock.

use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use serde_json::{Value, json};
use tracing::{debug, warn};

use kubesim_core::{ResourceType, object};
use kubesim_lifecycle::Target;

use crate::ApiState;
use crate::output::ApiOutput;
use crate::path::{ApiPath, ObjectPath};

/// Version this server reports itself as.
pub const GIT_VERSION: &str = "v1.10.4";

/// Static `/version` document.
pub fn version_info() -> Value {
    json!({
        "buildDate": "2018-06-06T08:00:59Z",
        "compiler": "gc",
        "gitCommit": "5ca598b4ba5abb89bb773071ce452e33fb66339d",
        "gitTreeState": "clean",
        "gitVersion": GIT_VERSION,
        "goVersion": "go1.9.3",
        "major": "1",
        "minor": "10",
        "platform": "linux/amd64",
    })
}

// ── Fixed endpoints ────────────────────────────────────────────

/// GET /version
pub async fn version() -> Json<Value> {
    Json(version_info())
}

/// GET /openapi/v2
///
/// Serves the configured swagger file, or a document generated from the
/// schema when none is configured.
pub async fn openapi(State(state): State<ApiState>) -> ApiOutput {
    let Some(path) = &state.openapi_path else {
        return ApiOutput::ok(state.schema.openapi(GIT_VERSION));
    };
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "openapi document unreadable");
            return ApiOutput::internal(&e.to_string());
        }
    };
    match serde_json::from_slice(&content) {
        Ok(doc) => ApiOutput::ok(doc),
        Err(e) => ApiOutput::internal(&e.to_string()),
    }
}

// ── Catch-all ──────────────────────────────────────────────────

/// Every other path: discovery documents and object operations.
pub async fn dispatch(
    State(state): State<ApiState>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> ApiOutput {
    debug!(%method, path = uri.path(), "request");
    match ApiPath::parse(uri.path()) {
        ApiPath::Root => ApiOutput::ok(state.schema.root_paths()),
        ApiPath::CoreVersions => ApiOutput::ok(state.schema.api_versions(&state.server_address)),
        ApiPath::Groups => ApiOutput::ok(state.schema.api_group_list()),
        ApiPath::Group(group) => discovery(state.schema.api_group(&group)),
        ApiPath::Resources(group_version) => discovery(state.schema.resource_list(&group_version)),
        ApiPath::Object(path) => match state.schema.resolve(&path.group_version, &path.resource) {
            Some(resource) => object_request(&state, &method, resource, &path, &params, &body).await,
            None => discovery(state.schema.resource_list(&path.group_version)),
        },
        ApiPath::Unknown => ApiOutput::not_found("the server could not find the requested resource"),
    }
}

fn discovery(document: Option<Value>) -> ApiOutput {
    document.map(ApiOutput::ok).unwrap_or_else(|| {
        ApiOutput::not_found("the server could not find the requested resource")
    })
}

fn parse_body(body: &Bytes) -> Result<Value, ApiOutput> {
    serde_json::from_slice(body).map_err(|e| ApiOutput::internal(&format!("malformed request body: {e}")))
}

/// Run one object operation.
async fn object_request(
    state: &ApiState,
    method: &Method,
    resource: ResourceType,
    path: &ObjectPath,
    params: &HashMap<String, String>,
    body: &Bytes,
) -> ApiOutput {
    let namespace = path.namespace.as_deref();
    let mut engine = state.engine.lock().await;

    let Some(name) = path.name.as_deref() else {
        return match *method {
            Method::GET => {
                let listed = engine.list(
                    resource,
                    namespace,
                    params.get("labelSelector").map(String::as_str),
                    params.get("fieldSelector").map(String::as_str),
                );
                match listed {
                    Ok(items) => ApiOutput::ok(json!({
                        "items": items,
                        "kind": resource.list_kind(),
                        "apiVersion": resource.group_version(),
                    })),
                    Err(e) => e.into(),
                }
            }
            Method::POST => match parse_body(body) {
                Ok(body) => engine
                    .create(resource, namespace, body)
                    .map_or_else(ApiOutput::from, ApiOutput::created),
                Err(out) => out,
            },
            _ => method_not_allowed(method),
        };
    };

    let target = Target::new(resource, namespace, name);
    if let Some(operation) = path.operation.as_deref() {
        return engine
            .operation(&target, operation, params)
            .map_or_else(ApiOutput::from, ApiOutput::ok);
    }
    match *method {
        Method::GET => engine.get(&target).map_or_else(ApiOutput::from, ApiOutput::ok),
        Method::DELETE => engine.delete(&target).map_or_else(ApiOutput::from, ApiOutput::ok),
        Method::PATCH => match parse_body(body) {
            Ok(patch) => engine.update(&target, patch).map_or_else(ApiOutput::from, ApiOutput::ok),
            Err(out) => out,
        },
        Method::PUT => match parse_body(body) {
            Ok(body) => engine.replace(&target, body).map_or_else(ApiOutput::from, ApiOutput::created),
            Err(out) => out,
        },
        // The path name wins over the body's.
        Method::POST => match parse_body(body) {
            Ok(mut body) => {
                if body.is_object() {
                    object::metadata_mut(&mut body).insert("name".into(), json!(name));
                }
                engine
                    .create(resource, namespace, body)
                    .map_or_else(ApiOutput::from, ApiOutput::created)
            }
            Err(out) => out,
        },
        _ => method_not_allowed(method),
    }
}

/// Methods the path cannot serve, such as PUT on a collection.
fn method_not_allowed(method: &Method) -> ApiOutput {
    ApiOutput::failure(
        StatusCode::METHOD_NOT_ALLOWED,
        "MethodNotAllowed",
        &format!("method {method} is not supported on this path"),
    )
}
