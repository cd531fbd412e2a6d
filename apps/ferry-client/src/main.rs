//! ferry client entry point.

mod config;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ferry_protocol::checksum::to_hex;
use ferry_transfer::{FileStore, TransferClient};
use tracing_subscriber::EnvFilter;

/// Uploads files to or downloads files from a ferry server.
#[derive(Parser, Debug)]
#[command(name = "ferry-client", version, about, long_about = None)]
struct Args {
    /// Server address (host:port)
    server: String,

    /// Transfer direction
    #[arg(value_enum, ignore_case = true)]
    action: Action,

    /// File to upload or download
    file_name: String,

    /// Working directory (source for put, destination for get)
    dir: Option<PathBuf>,

    /// Seconds to wait for the connection
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    Put,
    Get,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = config::Config::load(args.config.as_deref())?;
    config.override_with(args.dir.clone(), args.connect_timeout);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(&args, config))
}

async fn run(args: &Args, config: config::Config) -> anyhow::Result<()> {
    let connect = TransferClient::connect_with_buffer_size(
        args.server.as_str(),
        FileStore::new(&config.dir),
        config.buffer_size,
    );
    let mut client = tokio::time::timeout(config.connect_timeout(), connect)
        .await
        .with_context(|| format!("timed out connecting to {}", args.server))?
        .with_context(|| format!("connecting to {}", args.server))?;

    let summary = match args.action {
        Action::Put => {
            tracing::info!(file = %args.file_name, "PUT");
            client.put(Path::new(&args.file_name)).await?
        }
        Action::Get => {
            tracing::info!(file = %args.file_name, "GET");
            client.retrieve(&args.file_name).await?
        }
    };

    tracing::info!(
        file = %summary.file_name,
        bytes = summary.bytes,
        checksum = %to_hex(&summary.checksum),
        "transfer complete"
    );

    client.close().await?;
    Ok(())
}
