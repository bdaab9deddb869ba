//! Background refresh of the release cache
//!
//! The poller fetches once immediately on start, then once per interval.
//! A failed fetch leaves the cached tag in place and marks the poller
//! component degraded; it never stops the loop.

use super::{ReleaseCache, ReleaseFetcher};
use crate::error::{PollerError, ReleaseError};
use crate::health::{components, HealthRegistry};
use crate::observability::{LauncherMetrics, StructuredLogger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration for the release poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between fetches (default: 15 minutes)
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
        }
    }
}

/// State shared between the poller and its spawned task
#[derive(Clone)]
struct PollTask {
    fetcher: Arc<dyn ReleaseFetcher>,
    cache: ReleaseCache,
    health: Option<HealthRegistry>,
    metrics: LauncherMetrics,
    logger: StructuredLogger,
    config: PollerConfig,
}

impl PollTask {
    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting release poller"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!("Shutting down release poller");
                    break;
                }
                _ = ticker.tick() => {
                    // Failures are already logged and recorded
                    let _ = self.poll_once().await;
                }
            }
        }
    }

    async fn poll_once(&self) -> Result<String, ReleaseError> {
        let start = Instant::now();
        let result = self.fetcher.latest_stable().await;
        self.metrics
            .observe_release_fetch_latency(start.elapsed().as_secs_f64());

        match result {
            Ok(tag) => {
                let previous = self.cache.set(tag.clone());
                if previous.as_deref() != Some(tag.as_str()) {
                    self.logger.log_release_update(previous.as_deref(), &tag);
                    self.metrics.set_latest_release(&tag);
                } else {
                    debug!(tag = %tag, "Latest release unchanged");
                }
                if let Some(health) = &self.health {
                    health.set_healthy(components::RELEASE_POLLER).await;
                }
                Ok(tag)
            }
            Err(e) => {
                self.metrics.inc_release_fetch_errors();
                self.logger
                    .log_release_fetch_failed(&e.to_string(), self.cache.get().as_deref());
                if let Some(health) = &self.health {
                    health
                        .set_degraded(components::RELEASE_POLLER, e.to_string())
                        .await;
                }
                Err(e)
            }
        }
    }
}

/// Keeps the release cache fresh from a [`ReleaseFetcher`]
pub struct ReleasePoller {
    task: PollTask,
    started: AtomicBool,
}

impl ReleasePoller {
    fn new(fetcher: Arc<dyn ReleaseFetcher>, cache: ReleaseCache, config: PollerConfig) -> Self {
        Self {
            task: PollTask {
                fetcher,
                cache,
                health: None,
                metrics: LauncherMetrics::new(),
                logger: StructuredLogger::default(),
                config,
            },
            started: AtomicBool::new(false),
        }
    }

    /// Run a single fetch-and-update cycle
    pub async fn poll_once(&self) -> Result<String, ReleaseError> {
        self.task.poll_once().await
    }

    /// Spawn the polling loop.
    ///
    /// The first fetch happens immediately. A poller can only be started
    /// once; the returned handle stops it, and dropping the handle stops it
    /// as well.
    pub fn start(&self) -> Result<PollerHandle, PollerError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PollerError::AlreadyStarted);
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let join = tokio::spawn(self.task.clone().run(shutdown_rx));

        Ok(PollerHandle { shutdown_tx, join })
    }
}

/// Handle to a running poller
pub struct PollerHandle {
    shutdown_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the poller and wait for an in-flight fetch to finish
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "Release poller task failed");
        }
    }
}

/// Builder for creating a release poller
pub struct ReleasePollerBuilder {
    fetcher: Option<Arc<dyn ReleaseFetcher>>,
    cache: Option<ReleaseCache>,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
    config: PollerConfig,
}

impl ReleasePollerBuilder {
    pub fn new() -> Self {
        Self {
            fetcher: None,
            cache: None,
            health: None,
            logger: None,
            config: PollerConfig::default(),
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ReleaseFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn cache(mut self, cache: ReleaseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Report fetch outcomes to a health registry
    pub fn health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn build(self) -> Result<ReleasePoller, PollerError> {
        let fetcher = self.fetcher.ok_or(PollerError::Missing("fetcher"))?;
        let cache = self.cache.ok_or(PollerError::Missing("cache"))?;
        if self.config.interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        let mut poller = ReleasePoller::new(fetcher, cache, self.config);
        poller.task.health = self.health;
        if let Some(logger) = self.logger {
            poller.task.logger = logger;
        }
        Ok(poller)
    }
}

impl Default for ReleasePollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
