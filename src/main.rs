use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod workers;

use config::AppConfig;
use infrastructure::transcoder::ffmpeg::FfmpegTranscoder;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("invalid configuration")?;
    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("cannot create work dir {}", config.work_dir.display()))?;
    info!(work_dir = %config.work_dir.display(), quality = %config.default_quality, "Configuration loaded");

    let transcoder = Arc::new(FfmpegTranscoder::new(config.ffmpeg_bin.clone()));
    let state = AppState::build(config, transcoder);

    let shutdown = CancellationToken::new();
    let worker = state.scheduler.spawn(shutdown.clone());
    let janitor = state.config.session_ttl.map(|ttl| {
        workers::janitor::spawn(
            state.sessions.clone(),
            ttl,
            state.config.session_sweep_interval,
            shutdown.clone(),
        )
    });

    let addr = format!("0.0.0.0:{}", state.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("Server running on http://{}", addr);

    let app = app::create_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Stopping workers...");
    shutdown.cancel();
    if let Err(e) = worker.await {
        warn!(error = %e, "Transcode worker ended abnormally");
    }
    if let Some(janitor) = janitor {
        if let Err(e) = janitor.await {
            warn!(error = %e, "Session janitor ended abnormally");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
