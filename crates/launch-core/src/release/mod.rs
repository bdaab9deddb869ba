//! Tracking of the latest published Scope release
//!
//! This module provides:
//! - A shared cache holding the most recently observed stable release tag
//! - A fetcher for the GitHub releases API
//! - A background poller that refreshes the cache on a fixed interval

mod cache;
mod github;
mod poller;

pub use cache::{ReleaseCache, ReleaseInfo};
pub use github::GithubReleases;
pub use poller::{PollerConfig, PollerHandle, ReleasePoller, ReleasePollerBuilder};

use crate::error::ReleaseError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single entry of the upstream release list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

/// Pick the stable release out of a newest-first release list.
///
/// The newest entry may be a pre-release build, so the second entry is
/// taken as the latest stable release.
pub fn stable_tag(releases: &[Release]) -> Result<&str, ReleaseError> {
    releases
        .get(1)
        .map(|release| release.tag_name.as_str())
        .ok_or(ReleaseError::NotEnoughReleases(releases.len()))
}

/// Source of the latest stable release tag
#[async_trait]
pub trait ReleaseFetcher: Send + Sync {
    /// Fetch the latest stable release tag
    async fn latest_stable(&self) -> Result<String, ReleaseError>;
}
