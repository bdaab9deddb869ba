//! Image tag resolution

use crate::release::ReleaseCache;
use std::fmt;

/// Tag used when no version is requested and no release is cached yet
pub const FALLBACK_TAG: &str = "latest";

/// Where a resolved image tag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// Requested explicitly and a valid semantic version
    Pinned,
    /// Requested explicitly but not a semantic version (branch, commit, ...)
    Custom,
    /// Latest stable release from the release cache
    Release,
    /// Nothing requested and nothing cached
    Fallback,
}

impl TagSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagSource::Pinned => "pinned",
            TagSource::Custom => "custom",
            TagSource::Release => "release",
            TagSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for TagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTag {
    pub tag: String,
    pub source: TagSource,
}

/// Whether `version` is a semantic version, accepting a leading `v` or `=`
pub fn is_valid_semver(version: &str) -> bool {
    let version = version.trim();
    let version = version.strip_prefix('=').unwrap_or(version);
    let version = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(version).is_ok()
}

/// Resolve the image tag for a manifest.
///
/// Any non-empty override is used verbatim, semver or not. An empty
/// override counts as absent, in which case the cached release is used,
/// then [`FALLBACK_TAG`].
pub fn resolve_image_tag(version_override: Option<&str>, cache: &ReleaseCache) -> ImageTag {
    match version_override {
        Some(version) if !version.is_empty() => {
            let source = if is_valid_semver(version) {
                TagSource::Pinned
            } else {
                TagSource::Custom
            };
            ImageTag {
                tag: version.to_string(),
                source,
            }
        }
        _ => match cache.get() {
            Some(tag) => ImageTag {
                tag,
                source: TagSource::Release,
            },
            None => ImageTag {
                tag: FALLBACK_TAG.to_string(),
                source: TagSource::Fallback,
            },
        },
    }
}
