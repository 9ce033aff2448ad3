//! kubesim-api — REST API for kubesim.
//!
//! Serves the Kubernetes REST surface on top of a lifecycle [`Engine`].
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/version` | Static version document |
//! | GET | `/openapi/v2` | Swagger document |
//! | GET | `/`, `/api`, `/apis`, `/apis/<group>` | Discovery |
//! | GET | `/api/v1`, `/apis/<group>/<version>` | Resource lists |
//! | GET, POST | `.../[namespaces/<ns>/]<resource>` | List, create |
//! | GET, PUT, PATCH, DELETE | `.../<resource>/<name>` | Read, replace, merge, delete |
//! | any | `.../<resource>/<name>/<operation>` | Kind operation (`log`, `exec`) |
//!
//! Failures are returned as `Status` documents.

pub mod handlers;
pub mod output;
pub mod path;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio::sync::Mutex;

use kubesim_core::{KubesimConfig, ResourceSchema};
use kubesim_lifecycle::Engine;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    /// Requests are serialized through this lock.
    pub engine: Arc<Mutex<Engine>>,
    pub schema: Arc<ResourceSchema>,
    /// Address advertised in `/api` discovery.
    pub server_address: String,
    pub openapi_path: Option<PathBuf>,
}

impl ApiState {
    pub fn new(engine: Engine, config: &KubesimConfig) -> Self {
        let schema = Arc::new(engine.schema().clone());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            schema,
            server_address: config.server_address(),
            openapi_path: config.api.openapi_path.clone(),
        }
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/version", get(handlers::version))
        .route("/openapi/v2", get(handlers::openapi))
        .fallback(handlers::dispatch)
        .with_state(state)
}
