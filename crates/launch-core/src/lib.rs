//! Core library for the Weave Scope launch generator
//!
//! This crate provides:
//! - Tracking of the latest stable Scope release
//! - Kubernetes manifest generation for the Scope app and probe
//! - The HTTP API serving manifests, health checks and metrics

pub mod api;
pub mod error;
pub mod health;
pub mod manifest;
pub mod observability;
pub mod release;

pub use error::{ManifestError, PollerError, ReleaseError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use observability::{LauncherMetrics, StructuredLogger};
pub use release::{ReleaseCache, ReleaseFetcher};
