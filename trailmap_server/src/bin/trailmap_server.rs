use std::path::PathBuf;

use clap::Parser;
use trailmap_server::{ServerConfig, StorageBackend, start_server};

/// Serves the trailmap ingestion and map-data endpoints.
#[derive(Debug, Parser)]
#[command(name = "trailmap_server", version)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "TRAILMAP_BIND", default_value = "127.0.0.1:8000")]
    bind: String,

    /// SQLite database file holding the map
    #[arg(long, env = "TRAILMAP_DB", default_value = "trailmap.db")]
    db: PathBuf,

    /// Keep the map in memory only (ignores --db)
    #[arg(long)]
    in_memory: bool,

    /// Do not record raw pings, only the aggregated map
    #[arg(long)]
    no_history: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let storage = if args.in_memory {
        StorageBackend::Memory
    } else {
        StorageBackend::Sqlite(args.db)
    };
    let cfg = ServerConfig {
        bind_addr: args.bind,
        storage,
        retain_history: !args.no_history,
        ..ServerConfig::default()
    };

    let handle = start_server(cfg).await?;
    handle.await?;
    Ok(())
}
