//! Error types for manifest generation and release tracking

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while building or encoding a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Caller-supplied parameters were rejected
    #[error("{0}")]
    Validation(String),

    #[error("failed to encode manifest as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode manifest as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ManifestError {
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Json(_) | Self::Yaml(_) => "encode_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Json(_) | Self::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ManifestError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Validation(reason) => reason.clone(),
            Self::Json(_) | Self::Yaml(_) => "Internal server error".to_owned(),
        };

        let body = json!({
            "error": self.error_type(),
            "message": message,
        });

        (self.status_code(), Json(body)).into_response()
    }
}

/// Errors raised while fetching the upstream release list
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("invalid releases URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("release request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("release feed returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed release list: {0}")]
    Malformed(#[source] reqwest::Error),

    #[error("release list has {0} entries, need at least 2")]
    NotEnoughReleases(usize),
}

/// Errors raised by the release poller lifecycle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollerError {
    #[error("release poller already started")]
    AlreadyStarted,

    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("{0} is required")]
    Missing(&'static str),
}
