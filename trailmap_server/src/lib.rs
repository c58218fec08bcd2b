use std::path::PathBuf;
use std::sync::Arc;

use trailmap::{EngineConfig, MemoryLedger, SessionHandle, SharedStore, SqliteLedger, TrackingSession};

#[cfg(feature = "web")]
pub mod api;

/// Where the visit ledger lives.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    /// Process memory; lost on exit.
    Memory,
    /// A SQLite database file, created on first use.
    Sqlite(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub storage: StorageBackend,
    /// Keep every accepted raw sample in the store for audit/replay.
    pub retain_history: bool,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            storage: StorageBackend::Sqlite(PathBuf::from("trailmap.db")),
            retain_history: true,
            engine: EngineConfig::default(),
        }
    }
}

pub fn open_store(cfg: &ServerConfig) -> anyhow::Result<SharedStore> {
    let store: SharedStore = match &cfg.storage {
        StorageBackend::Memory => Arc::new(MemoryLedger::new(cfg.retain_history)),
        StorageBackend::Sqlite(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            Arc::new(SqliteLedger::open(path, cfg.retain_history)?)
        }
    };
    Ok(store)
}

/// Opens the configured store and starts its session worker. Needs a tokio runtime.
pub fn spawn_session(cfg: &ServerConfig) -> anyhow::Result<SessionHandle> {
    let store = open_store(cfg)?;
    Ok(SessionHandle::spawn(TrackingSession::new(store, cfg.engine.clone())))
}

#[cfg(feature = "web")]
pub async fn start_server(cfg: ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    use tracing::{error, info};

    let session = spawn_session(&cfg)?;
    let app = api::router(api::AppState::new(session.clone()));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!(
        "trailmap server listening on http://{} (storage={:?}, history={})",
        listener.local_addr()?,
        cfg.storage,
        cfg.retain_history
    );

    let server = tokio::spawn(async move {
        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
        };
        if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!(%err, "server stopped with an error");
        }
        session.shutdown().await;
    });

    Ok(server)
}

#[cfg(not(feature = "web"))]
pub async fn start_server(_cfg: ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    Err(anyhow::anyhow!("web feature not enabled for trailmap_server"))
}
