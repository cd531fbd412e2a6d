//! ferry server entry point.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ferry_transfer::{FileStore, TransferServer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Stores uploaded files and serves downloads over TCP.
#[derive(Parser, Debug)]
#[command(name = "ferry-server", version, about, long_about = None)]
struct Args {
    /// Port to listen on (0 picks a free port)
    port: Option<u16>,

    /// Directory files are stored in and served from
    dir: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize structured logging.
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = config::Config::load(args.config.as_deref())?;
    config.override_with(args.port, args.dir, args.bind);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting ferry server"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}

async fn run(config: config::Config) -> anyhow::Result<()> {
    let root = config
        .dir
        .canonicalize()
        .with_context(|| format!("serving directory {}", config.dir.display()))?;
    anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());

    let cancel = CancellationToken::new();
    let server = TransferServer::new(FileStore::new(root), cancel.clone())
        .with_buffer_size(config.buffer_size);
    let listener = server.listen(config.listen_addr()).await?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            cancel.cancel();
        }
    });

    server.serve(listener).await?;
    Ok(())
}
