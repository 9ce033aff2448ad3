//! kubesimd — the kubesim daemon.
//!
//! Single binary that assembles the fake API server:
//! - Resource store (redb, on disk or in memory)
//! - Lifecycle engine with the seeded cluster
//! - REST API
//!
//! # Usage
//!
//! ```text
//! kubesimd serve --port 6443 --cache-dir /var/lib/kubesim --node node-1
//! kubesimd config --config kubesim.toml
//! kubesimd reset --cache-dir /var/lib/kubesim
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use kubesim_api::{ApiState, build_router};
use kubesim_core::{KubesimConfig, ResourceSchema};
use kubesim_lifecycle::Engine;
use kubesim_state::ResourceStore;

#[derive(Parser)]
#[command(name = "kubesimd", about = "Local fake Kubernetes API server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the API until interrupted.
    Serve {
        #[command(flatten)]
        overrides: Overrides,

        /// Emit logs as JSON lines.
        #[arg(long)]
        json_logs: bool,
    },
    /// Print the effective configuration as TOML.
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Drop every stored collection from the on-disk cache.
    Reset {
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Flags layered over `kubesim.toml`.
#[derive(Args)]
struct Overrides {
    /// Path to kubesim.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Directory for the persistent cache.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Node registered at startup (repeatable).
    #[arg(long = "node")]
    nodes: Vec<String>,

    /// Fixed RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Swagger document served at /openapi/v2.
    #[arg(long)]
    openapi: Option<PathBuf>,
}

impl Overrides {
    fn load(self) -> anyhow::Result<KubesimConfig> {
        let mut config = match &self.config {
            Some(path) => KubesimConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => KubesimConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.cache_dir.is_some() {
            config.store.cache_dir = self.cache_dir;
        }
        if !self.nodes.is_empty() {
            config.cluster.nodes = self.nodes;
        }
        if self.seed.is_some() {
            config.cluster.seed = self.seed;
        }
        if self.openapi.is_some() {
            config.api.openapi_path = self.openapi;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            overrides,
            json_logs,
        } => {
            init_tracing(json_logs);
            run_serve(overrides.load()?).await
        }
        Command::Config { overrides } => {
            print!("{}", overrides.load()?.to_toml_string()?);
            Ok(())
        }
        Command::Reset { overrides } => {
            init_tracing(false);
            run_reset(&overrides.load()?)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,kubesimd=debug,kubesim=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_store(config: &KubesimConfig) -> anyhow::Result<ResourceStore> {
    match config.cache_file() {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let store = ResourceStore::open(&path)?;
            info!(path = ?path, "resource store opened");
            Ok(store)
        }
        None => {
            info!("no cache directory configured, state is in-memory");
            Ok(ResourceStore::open_in_memory()?)
        }
    }
}

async fn run_serve(config: KubesimConfig) -> anyhow::Result<()> {
    info!("kubesim daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let store = open_store(&config)?;
    let mut engine = Engine::new(store, ResourceSchema::default(), config.cluster.seed);
    engine.bootstrap(&config.cluster.namespaces, &config.cluster.nodes)?;

    // ── Start API server ───────────────────────────────────────

    let router = build_router(ApiState::new(engine, &config));
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;

    info!(%addr, advertised = %config.server_address(), "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("kubesim daemon stopped");
    Ok(())
}

fn run_reset(config: &KubesimConfig) -> anyhow::Result<()> {
    let Some(path) = config.cache_file() else {
        anyhow::bail!("no cache directory configured");
    };
    if !path.exists() {
        info!(path = ?path, "nothing to reset");
        return Ok(());
    }
    let store = ResourceStore::open(&path)?;
    let keys = store.keys()?;
    for key in &keys {
        store.clear(key)?;
    }
    info!(path = ?path, collections = keys.len(), "cache reset");
    Ok(())
}
