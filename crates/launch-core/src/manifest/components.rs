//! Scope app and probe resources

use super::resource::{make_resource, resource_name, Resource, ResourceKind};
use serde_json::json;
use std::fmt;

pub const IMAGE_REPOSITORY: &str = "weaveworks/scope";

/// Port the Scope app listens on inside its container
pub const APP_PORT: u16 = 4040;

/// Port the app Service exposes
pub const SERVICE_PORT: u16 = 80;

pub const APP_COMPONENT: &str = "app";
pub const PROBE_COMPONENT: &str = "probe";

const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Kubernetes Service types a caller may request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServiceType {
    #[default]
    NodePort,
    LoadBalancer,
}

impl ServiceType {
    /// Parse a requested service type. Unknown values yield `None` and are
    /// meant to be ignored rather than rejected.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "NodePort" => Some(ServiceType::NodePort),
            "LoadBalancer" => Some(ServiceType::LoadBalancer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::NodePort => "NodePort",
            ServiceType::LoadBalancer => "LoadBalancer",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized inputs for building components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentParams {
    pub tag: String,
    pub token: Option<String>,
    pub service_type: ServiceType,
}

impl ComponentParams {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            token: None,
            service_type: ServiceType::default(),
        }
    }

    fn image(&self) -> String {
        format!("{IMAGE_REPOSITORY}:{}", self.tag)
    }
}

/// Scope app, a single replica running without a local probe
pub fn app_replication_controller(params: &ComponentParams) -> Resource {
    let spec = json!({
        "spec": {
            "containers": [{
                "name": resource_name(APP_COMPONENT),
                "image": params.image(),
                "args": ["--no-probe"],
                "ports": [{ "containerPort": APP_PORT }],
            }],
        },
    });

    make_resource(
        "v1",
        ResourceKind::ReplicationController,
        APP_COMPONENT,
        spec,
        json!({ "replicas": 1 }),
    )
}

/// Service in front of the app pods
pub fn app_service(params: &ComponentParams) -> Resource {
    let service_params = json!({
        "ports": [{
            "name": APP_COMPONENT,
            "port": SERVICE_PORT,
            "targetPort": APP_PORT,
            "protocol": "TCP",
        }],
        "type": params.service_type.as_str(),
    });

    make_resource(
        "v1",
        ResourceKind::Service,
        APP_COMPONENT,
        json!({}),
        service_params,
    )
}

/// Probe on every node.
///
/// With a service token the probe reports to Weave Cloud; without one it
/// reports to the in-cluster app through the environment variables
/// Kubernetes injects for the app Service.
pub fn probe_daemon_set(params: &ComponentParams) -> Resource {
    let target = match &params.token {
        Some(token) => format!("--service-token={token}"),
        None => app_service_address(),
    };

    let spec = json!({
        "spec": {
            "hostPID": true,
            "hostNetwork": true,
            "containers": [{
                "name": resource_name(PROBE_COMPONENT),
                "image": params.image(),
                "args": [
                    "--no-app",
                    "--probe.docker.bridge=docker0",
                    "--probe.docker=true",
                    "--probe.kubernetes=true",
                    target,
                ],
                "securityContext": { "privileged": true },
                "resources": {
                    "limits": { "cpu": "50m" },
                },
                "volumeMounts": [{
                    "name": "docker-sock",
                    "mountPath": DOCKER_SOCKET,
                }],
            }],
            "volumes": [{
                "name": "docker-sock",
                "hostPath": { "path": DOCKER_SOCKET },
            }],
        },
    });

    make_resource(
        "extensions/v1beta1",
        ResourceKind::DaemonSet,
        PROBE_COMPONENT,
        spec,
        json!({}),
    )
}

/// `$(WEAVESCOPE_APP_SERVICE_HOST):$(WEAVESCOPE_APP_SERVICE_PORT)`
fn app_service_address() -> String {
    let env_prefix = resource_name(APP_COMPONENT)
        .to_uppercase()
        .replace('-', "_");
    format!("$({env_prefix}_SERVICE_HOST):$({env_prefix}_SERVICE_PORT)")
}
