//! Kubernetes manifest generation for Weave Scope
//!
//! A request either gets the combined deployment (app ReplicationController,
//! app Service and probe DaemonSet wrapped in a `List`) or, when it carries
//! a service token, a single probe DaemonSet reporting to Weave Cloud.

mod components;
mod resource;
mod tag;

pub use components::{
    app_replication_controller, app_service, probe_daemon_set, ComponentParams, ServiceType,
    APP_PORT, IMAGE_REPOSITORY,
};
pub use resource::{
    component_labels, make_resource, merge, resource_name, Labels, ObjectMeta, Resource,
    ResourceKind, COMPONENT_LABEL, PROJECT,
};
pub use tag::{is_valid_semver, resolve_image_tag, ImageTag, TagSource, FALLBACK_TAG};

use crate::error::ManifestError;
use crate::release::ReleaseCache;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const VERSION_PARAM: &str = "v";
pub const SERVICE_TOKEN_PARAM: &str = "service-token";
pub const SERVICE_TYPE_PARAM: &str = "k8s-service-type";

/// Manifest request parameters as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestParams {
    pub version_override: Option<String>,
    pub service_token: Option<String>,
    pub service_type: Option<String>,
}

impl ManifestParams {
    /// Collect parameters from decoded query pairs.
    ///
    /// A key given more than once is treated as absent.
    pub fn from_query_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut seen: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            seen.entry(key).or_default().push(value);
        }

        let mut single = |key: &str| match seen.remove(key) {
            Some(mut values) if values.len() == 1 => values.pop(),
            _ => None,
        };

        Self {
            version_override: single(VERSION_PARAM),
            service_token: single(SERVICE_TOKEN_PARAM),
            service_type: single(SERVICE_TYPE_PARAM),
        }
    }
}

/// Which resource graph a manifest contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestMode {
    /// App, Service and probe
    Combined,
    /// Probe only, reporting with a service token
    AgentOnly,
}

impl ManifestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestMode::Combined => "combined",
            ManifestMode::AgentOnly => "agent-only",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    pub api_version: String,
    pub kind: String,
    pub items: Vec<Resource>,
}

impl ResourceList {
    pub fn new(items: Vec<Resource>) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "List".to_string(),
            items,
        }
    }
}

/// A generated manifest, ready to serialize
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    List(ResourceList),
    Single(Resource),
}

impl Manifest {
    pub fn mode(&self) -> ManifestMode {
        match self {
            Manifest::List(_) => ManifestMode::Combined,
            Manifest::Single(_) => ManifestMode::AgentOnly,
        }
    }

    pub fn resources(&self) -> Vec<&Resource> {
        match self {
            Manifest::List(list) => list.items.iter().collect(),
            Manifest::Single(resource) => vec![resource],
        }
    }

    pub fn encode(&self, format: OutputFormat) -> Result<String, ManifestError> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string(self)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(self)?),
        }
    }
}

/// Serialization format of a manifest response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Yaml => "application/x-yaml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

/// A manifest together with the tag it was built for
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedManifest {
    pub manifest: Manifest,
    pub image_tag: ImageTag,
}

/// Build the manifest for a request.
///
/// An empty service token is the only rejected input. Unknown service types
/// are ignored and any version string is accepted as an image tag.
pub fn make_manifest(
    params: &ManifestParams,
    cache: &ReleaseCache,
) -> Result<GeneratedManifest, ManifestError> {
    let image_tag = resolve_image_tag(params.version_override.as_deref(), cache);
    let mut component_params = ComponentParams::new(image_tag.tag.clone());

    let manifest = match params.service_token.as_deref() {
        Some("") => {
            return Err(ManifestError::Validation(
                "service token must be set".to_string(),
            ))
        }
        Some(token) => {
            component_params.token = Some(token.to_string());
            Manifest::Single(probe_daemon_set(&component_params))
        }
        None => {
            if let Some(service_type) = params.service_type.as_deref() {
                match ServiceType::from_param(service_type) {
                    Some(parsed) => component_params.service_type = parsed,
                    None => {
                        debug!(service_type = %service_type, "Ignoring unknown service type")
                    }
                }
            }
            Manifest::List(ResourceList::new(vec![
                app_replication_controller(&component_params),
                app_service(&component_params),
                probe_daemon_set(&component_params),
            ]))
        }
    };

    Ok(GeneratedManifest {
        manifest,
        image_tag,
    })
}
