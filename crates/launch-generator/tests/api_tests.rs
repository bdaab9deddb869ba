//! Integration tests for the launch generator HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use launch_core::{
    api::{create_router, AppState, DEFAULT_PATH_PREFIX},
    health::{components, HealthRegistry},
    observability::{LauncherMetrics, StructuredLogger},
    release::ReleaseCache,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app(prefix: &str, cache: ReleaseCache) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::RELEASE_POLLER).await;
    health_registry.register(components::HTTP_SERVER).await;

    let state = Arc::new(AppState::new(
        cache,
        health_registry,
        LauncherMetrics::new(),
        StructuredLogger::new("launch-generator-test"),
    ));
    let router = create_router(prefix, state.clone());

    (router, state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .map(|value| value.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn images(manifest: &Value) -> Vec<&str> {
    manifest["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["spec"]["template"]["spec"]["containers"][0]["image"].as_str())
        .collect()
}

#[tokio::test]
async fn test_default_manifest_without_cached_release() {
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    let (status, manifest) = get_json(app, "/launch/k8s/weavescope.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(manifest["kind"], "List");

    let kinds: Vec<&str> = manifest["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["ReplicationController", "Service", "DaemonSet"]);

    assert_eq!(manifest["items"][1]["spec"]["type"], "NodePort");
    assert_eq!(
        images(&manifest),
        vec!["weaveworks/scope:latest", "weaveworks/scope:latest"]
    );
}

#[tokio::test]
async fn test_cached_release_is_default_tag() {
    let (app, _state) =
        setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::with_tag("v1.9.1")).await;

    let (_, manifest) = get_json(app, "/launch/k8s/weavescope.json?v=").await;

    assert_eq!(
        images(&manifest),
        vec!["weaveworks/scope:v1.9.1", "weaveworks/scope:v1.9.1"]
    );
}

#[tokio::test]
async fn test_version_parameter_pins_tag() {
    let (app, _state) =
        setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::with_tag("v1.9.1")).await;

    let (_, manifest) = get_json(app, "/launch/k8s/weavescope.json?v=1.2.3").await;

    assert_eq!(
        images(&manifest),
        vec!["weaveworks/scope:1.2.3", "weaveworks/scope:1.2.3"]
    );
}

#[tokio::test]
async fn test_custom_tag_passes_through() {
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    let (status, manifest) =
        get_json(app, "/launch/k8s/weavescope.json?v=master-a1b2c3d").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        images(&manifest),
        vec![
            "weaveworks/scope:master-a1b2c3d",
            "weaveworks/scope:master-a1b2c3d"
        ]
    );
}

#[tokio::test]
async fn test_service_token_returns_probe_only() {
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    let (status, manifest) =
        get_json(app, "/launch/k8s/weavescope.json?service-token=abc123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(manifest["kind"], "DaemonSet");
    assert!(manifest.get("items").is_none());

    let args = manifest["spec"]["template"]["spec"]["containers"][0]["args"]
        .as_array()
        .unwrap();
    assert!(args.iter().any(|arg| arg == "--service-token=abc123"));
}

#[tokio::test]
async fn test_empty_service_token_is_rejected() {
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    let (status, body) = get_json(app, "/launch/k8s/weavescope.json?service-token=").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "service token must be set");
}

#[tokio::test]
async fn test_service_type_parameter() {
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    let (_, manifest) = get_json(
        app.clone(),
        "/launch/k8s/weavescope.json?k8s-service-type=LoadBalancer",
    )
    .await;
    assert_eq!(manifest["items"][1]["spec"]["type"], "LoadBalancer");

    let (status, manifest) =
        get_json(app, "/launch/k8s/weavescope.json?k8s-service-type=bogus").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(manifest["items"][1]["spec"]["type"], "NodePort");
}

#[tokio::test]
async fn test_yaml_manifest() {
    let (app, _state) =
        setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::with_tag("v1.9.1")).await;

    let (status, content_type, body) = get(app, "/launch/k8s/weavescope.yaml").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/x-yaml"));

    let manifest: serde_yaml::Value = serde_yaml::from_slice(&body).unwrap();
    assert_eq!(manifest["kind"], "List");
    assert_eq!(manifest["items"][2]["kind"], "DaemonSet");
    assert_eq!(
        manifest["items"][0]["spec"]["template"]["spec"]["containers"][0]["image"],
        "weaveworks/scope:v1.9.1"
    );
}

#[tokio::test]
async fn test_json_content_type() {
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    let (_, content_type, _) = get(app, "/launch/k8s/weavescope.json").await;

    assert_eq!(content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_configurable_prefix() {
    let (app, _state) = setup_test_app("k8s-gen", ReleaseCache::new()).await;

    let (status, _, _) = get(app.clone(), "/k8s-gen/weavescope.json").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = get(app, "/launch/k8s/weavescope.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_release_update_visible_to_next_request() {
    let cache = ReleaseCache::new();
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, cache.clone()).await;

    let (_, before) = get_json(app.clone(), "/launch/k8s/weavescope.json").await;
    cache.set("v1.9.1");
    let (_, after) = get_json(app, "/launch/k8s/weavescope.json").await;

    assert_eq!(images(&before)[0], "weaveworks/scope:latest");
    assert_eq!(images(&after)[0], "weaveworks/scope:v1.9.1");
}

#[tokio::test]
async fn test_healthz_reports_release_poller() {
    let (app, state) =
        setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::with_tag("v1.9.1")).await;
    state
        .health_registry
        .set_degraded(components::RELEASE_POLLER, "release feed returned 502")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    // Degraded still serves manifests
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["release_poller"]["status"], "degraded");
    assert_eq!(health["latest_release"], "v1.9.1");
}

#[tokio::test]
async fn test_readyz_follows_listener_state() {
    let (app, state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    let (status, readiness) = get_json(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, readiness) = get_json(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_count_manifests() {
    let (app, _state) = setup_test_app(DEFAULT_PATH_PREFIX, ReleaseCache::new()).await;

    get(app.clone(), "/launch/k8s/weavescope.yaml?service-token=abc123").await;
    get(app.clone(), "/launch/k8s/weavescope.json?service-token=").await;

    let (status, content_type, body) = get(app, "/metrics").await;
    let metrics_text = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().contains("text/plain"));
    assert!(metrics_text.contains("launch_generator_manifests_generated_total"));
    assert!(metrics_text.contains(r#"format="yaml",mode="agent-only""#));
    assert!(metrics_text.contains("launch_generator_validation_errors_total"));
}
