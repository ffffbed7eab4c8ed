// obox-server/src/main.rs
mod server;
mod tools;

use anyhow::{Context, Result};
use clap::Parser;
use obox_core::OboxConfig;
use rmcp::{service::*, transport::io};
use server::OboxServer;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "obox-server", version, about = "MCP server for command-line developer tools")]
struct Args {
    /// Path to a TOML config file (default: <config dir>/obox/config.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to treat as the current directory for every tool.
    #[arg(long)]
    workdir: Option<PathBuf>,
}

fn init_tracing() {
    // stdout carries the MCP transport, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(explicit: Option<PathBuf>) -> Result<OboxConfig> {
    if let Some(path) = explicit {
        return OboxConfig::load(&path);
    }
    match dirs::config_dir().map(|dir| dir.join("obox").join("config.toml")) {
        Some(path) if path.is_file() => OboxConfig::load(&path),
        _ => Ok(OboxConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    if let Some(dir) = &args.workdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to change directory to {:?}", dir))?;
    }
    let config = load_config(args.config)?;

    let server = OboxServer::new(config);
    let transport = io::stdio();
    let ct = CancellationToken::new();

    info!("Starting obox MCP server...");

    if let Err(e) = server.serve_with_ct(transport, ct.clone()).await {
        error!(error = %e, "Server loop failed");
    }

    tokio::select! {
        _ = ct.cancelled() => {}
        _ = tokio::signal::ctrl_c() => ct.cancel(),
    }

    info!("obox MCP server stopped.");
    Ok(())
}
