#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sow_core::CreatorCalendar;
use sow_core::config::{Config, DEFAULT_BIND};
use sow_server::{AppState, CRATE_NAME, build_router};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "sow-server",
    version,
    about = "Serves creator calendar snapshots over HTTP"
)]
struct Args {
    /// Address to listen on; defaults to `server.bind` from the sowrc.
    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    sowrc: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    sow_core::cli::init_tracing(&args.log_level)?;

    let cfg = Config::load(args.sowrc.as_deref())?;
    let calendar = CreatorCalendar::from_config(&cfg)?;
    let bind = args
        .bind
        .or_else(|| cfg.get("server.bind"))
        .unwrap_or_else(|| DEFAULT_BIND.to_string());

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(
        crate_name = CRATE_NAME,
        addr = %listener.local_addr()?,
        timezone = %calendar.settings().timezone,
        "listening"
    );

    axum::serve(listener, build_router(AppState::new(calendar)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
    }
}
