//! kubesim.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KubesimConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub cluster: ClusterConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 6443,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the on-disk cache. In-memory when unset.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Namespaces created at startup if absent.
    pub namespaces: Vec<String>,
    /// Nodes registered at startup if absent.
    pub nodes: Vec<String>,
    /// Fixed RNG seed for reproducible names, node picks and ports.
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespaces: vec![
                "default".to_string(),
                "kube-system".to_string(),
                "kube-public".to_string(),
            ],
            nodes: Vec::new(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Swagger document served at `/openapi/v2`. Generated from the schema when unset.
    pub openapi_path: Option<PathBuf>,
}

impl KubesimConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KubesimConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Address advertised in discovery documents.
    pub fn server_address(&self) -> String {
        let host = if self.server.bind == "0.0.0.0" {
            "127.0.0.1"
        } else {
            self.server.bind.as_str()
        };
        format!("{host}:{}", self.server.port)
    }

    /// Path of the redb cache file, if persistence is enabled.
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.store
            .cache_dir
            .as_ref()
            .map(|dir| dir.join("kubesim.redb"))
    }
}
