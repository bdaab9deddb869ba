//! Observability infrastructure for the launch generator
//!
//! Provides:
//! - Prometheus metrics (manifests served, validation failures, release fetches)
//! - Structured logging of lifecycle and release events

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for release fetch latency (in seconds)
const FETCH_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

static GLOBAL_METRICS: OnceLock<LauncherMetricsInner> = OnceLock::new();

struct LauncherMetricsInner {
    manifests_generated: IntCounterVec,
    validation_errors: IntCounter,
    release_fetch_latency_seconds: Histogram,
    release_fetch_errors: IntCounter,
    latest_release_info: GaugeVec,
}

impl LauncherMetricsInner {
    fn new() -> Self {
        Self {
            manifests_generated: register_int_counter_vec!(
                "launch_generator_manifests_generated_total",
                "Manifests served, by output format and deployment mode",
                &["format", "mode"]
            )
            .expect("Failed to register manifests_generated_total"),

            validation_errors: register_int_counter!(
                "launch_generator_validation_errors_total",
                "Manifest requests rejected for invalid parameters"
            )
            .expect("Failed to register validation_errors_total"),

            release_fetch_latency_seconds: register_histogram!(
                "launch_generator_release_fetch_latency_seconds",
                "Time spent fetching the upstream release list",
                FETCH_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register release_fetch_latency_seconds"),

            release_fetch_errors: register_int_counter!(
                "launch_generator_release_fetch_errors_total",
                "Failed fetches of the upstream release list"
            )
            .expect("Failed to register release_fetch_errors_total"),

            latest_release_info: register_gauge_vec!(
                "launch_generator_latest_release_info",
                "Latest stable release tag known to the generator",
                &["tag"]
            )
            .expect("Failed to register latest_release_info"),
        }
    }
}

/// Handle to the process-wide launch generator metrics.
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct LauncherMetrics {
    _private: (),
}

impl Default for LauncherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LauncherMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(LauncherMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &LauncherMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_manifests_generated(&self, format: &str, mode: &str) {
        self.inner()
            .manifests_generated
            .with_label_values(&[format, mode])
            .inc();
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors.inc();
    }

    pub fn observe_release_fetch_latency(&self, duration_secs: f64) {
        self.inner()
            .release_fetch_latency_seconds
            .observe(duration_secs);
    }

    pub fn inc_release_fetch_errors(&self) {
        self.inner().release_fetch_errors.inc();
    }

    /// Replace the advertised latest release
    pub fn set_latest_release(&self, tag: &str) {
        self.inner().latest_release_info.reset();
        self.inner()
            .latest_release_info
            .with_label_values(&[tag])
            .set(1.0);
    }
}

/// Structured logger for launch generator events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("launch-generator")
    }
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn log_startup(&self, version: &str, path_prefix: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            path_prefix = %path_prefix,
            "Launch generator started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Launch generator shutting down"
        );
    }

    pub fn log_release_update(&self, previous: Option<&str>, current: &str) {
        info!(
            event = "release_updated",
            service = %self.service,
            previous = previous.unwrap_or("none"),
            current = %current,
            "Latest release tag updated"
        );
    }

    /// Log a failed release fetch along with the tag still in use
    pub fn log_release_fetch_failed(&self, error: &str, cached: Option<&str>) {
        warn!(
            event = "release_fetch_failed",
            service = %self.service,
            error = %error,
            cached_tag = cached.unwrap_or("none"),
            "Failed to fetch release list, keeping cached tag"
        );
    }

    pub fn log_manifest(&self, mode: &str, format: &str, tag: &str, tag_source: &str) {
        info!(
            event = "manifest_generated",
            service = %self.service,
            mode = %mode,
            format = %format,
            tag = %tag,
            tag_source = %tag_source,
            "Generated manifest"
        );
    }
}
