//! HTTP API: manifest endpoints, health checks and Prometheus metrics

use crate::error::ManifestError;
use crate::health::{ComponentStatus, HealthRegistry, HealthResponse};
use crate::manifest::{make_manifest, ManifestParams, OutputFormat, SERVICE_TOKEN_PARAM};
use crate::observability::{LauncherMetrics, StructuredLogger};
use crate::release::ReleaseCache;
use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info};

/// Path prefix of the launch service deployment
pub const DEFAULT_PATH_PREFIX: &str = "launch/k8s";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: ReleaseCache,
    pub health_registry: HealthRegistry,
    pub metrics: LauncherMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        cache: ReleaseCache,
        health_registry: HealthRegistry,
        metrics: LauncherMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            cache,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Route for a manifest file under `prefix`, e.g. `/launch/k8s/weavescope.json`
pub fn manifest_route(prefix: &str, format: OutputFormat) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("/weavescope.{}", format.extension())
    } else {
        format!("/{prefix}/weavescope.{}", format.extension())
    }
}

fn render(
    state: &AppState,
    pairs: Vec<(String, String)>,
    format: OutputFormat,
) -> Result<Response, ManifestError> {
    let params = ManifestParams::from_query_pairs(pairs);

    let generated = make_manifest(&params, &state.cache)
        .inspect_err(|_| state.metrics.inc_validation_errors())?;
    let body = generated
        .manifest
        .encode(format)
        .inspect_err(|e| error!(error = %e, "Failed to encode manifest"))?;

    let mode = generated.manifest.mode();
    state
        .metrics
        .inc_manifests_generated(format.extension(), mode.as_str());
    state.logger.log_manifest(
        mode.as_str(),
        format.extension(),
        &generated.image_tag.tag,
        generated.image_tag.source.as_str(),
    );

    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

async fn manifest_json(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ManifestError> {
    render(&state, pairs, OutputFormat::Json)
}

async fn manifest_yaml(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ManifestError> {
    render(&state, pairs, OutputFormat::Yaml)
}

#[derive(Serialize)]
struct HealthBody {
    #[serde(flatten)]
    health: HealthResponse,
    latest_release: Option<String>,
    release_updated_at: Option<i64>,
}

/// Health check: 200 while operational, 503 once anything is unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let release = state.cache.info();
    let body = HealthBody {
        health,
        latest_release: release.latest_tag,
        release_updated_at: release.updated_at,
    };

    (status_code, Json(body))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

const REDACTED: &str = "REDACTED";

/// Request URI with the service token value masked
fn redacted_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };

    let pairs = url::form_urlencoded::parse(query.as_bytes()).map(|(key, value)| {
        if key == SERVICE_TOKEN_PARAM {
            (key, Cow::Borrowed(REDACTED))
        } else {
            (key, value)
        }
    });
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    format!("{}?{query}", uri.path())
}

/// Log a `started`/`finished` pair for every request
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = redacted_uri(request.uri());
    let start = Instant::now();

    info!(method = %method, uri = %uri, "started");
    let response = next.run(request).await;
    info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "finished"
    );

    response
}

/// Create the API router with manifest routes mounted under `prefix`
pub fn create_router(prefix: &str, state: Arc<AppState>) -> Router {
    Router::new()
        .route(&manifest_route(prefix, OutputFormat::Json), get(manifest_json))
        .route(&manifest_route(prefix, OutputFormat::Yaml), get(manifest_yaml))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_routes() {
        assert_eq!(
            manifest_route(DEFAULT_PATH_PREFIX, OutputFormat::Json),
            "/launch/k8s/weavescope.json"
        );
        assert_eq!(
            manifest_route("/k8s-gen/", OutputFormat::Yaml),
            "/k8s-gen/weavescope.yaml"
        );
        assert_eq!(manifest_route("", OutputFormat::Json), "/weavescope.json");
    }

    #[test]
    fn test_logged_uri_masks_service_token() {
        let uri: Uri = "/launch/k8s/weavescope.json?v=1.2.3&service-token=s3cr3t"
            .parse()
            .unwrap();

        let logged = redacted_uri(&uri);
        assert_eq!(
            logged,
            "/launch/k8s/weavescope.json?v=1.2.3&service-token=REDACTED"
        );
        assert!(!logged.contains("s3cr3t"));
    }

    #[test]
    fn test_logged_uri_without_query() {
        let uri: Uri = "/healthz".parse().unwrap();
        assert_eq!(redacted_uri(&uri), "/healthz");
    }
}
