//! Launch generator - Kubernetes manifests for Weave Scope
//!
//! Serves ready-to-apply manifests for the Scope app and probe, pinned to
//! the latest stable Scope release unless the caller asks for a version.

use anyhow::{Context, Result};
use launch_core::{
    api::{self, AppState},
    health::{components, HealthRegistry},
    observability::{LauncherMetrics, StructuredLogger},
    release::{GithubReleases, ReleaseCache, ReleasePollerBuilder},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const SERVICE_NAME: &str = "launch-generator";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_REASON: &str = "SIGINT received";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting launch-generator");

    let config = config::LauncherConfig::load()?;
    info!(
        port = config.port,
        path_prefix = %config.path_prefix,
        releases_url = %config.releases_url,
        poll_interval_secs = config.poll_interval_secs,
        "Launch generator configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::RELEASE_POLLER).await;
    health_registry.register(components::HTTP_SERVER).await;

    let metrics = LauncherMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);
    logger.log_startup(SERVICE_VERSION, &config.path_prefix);

    let cache = ReleaseCache::new();
    let fetcher = GithubReleases::new(&config.releases_url, config.fetch_timeout())
        .context("Failed to create release fetcher")?;
    let poller = ReleasePollerBuilder::new()
        .fetcher(Arc::new(fetcher))
        .cache(cache.clone())
        .health(health_registry.clone())
        .logger(logger.clone())
        .interval(config.poll_interval())
        .build()?;
    let poller_handle = poller.start()?;

    let state = Arc::new(AppState::new(
        cache,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));
    let app = api::create_router(&config.path_prefix, state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Listening");
    health_registry.set_ready(true).await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(health_registry.clone()))
        .await
        .inspect_err(|e| warn!(error = %e, "HTTP server failed"))?;

    logger.log_shutdown(SHUTDOWN_REASON);
    poller_handle.stop().await;
    info!("Shut down");

    Ok(())
}

async fn shutdown_signal(health_registry: HealthRegistry) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    health_registry.begin_shutdown(SHUTDOWN_REASON).await;
}
