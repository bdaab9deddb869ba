//! Shared cache of the latest release tag

use std::sync::{Arc, PoisonError, RwLock};

/// Snapshot of the release cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub latest_tag: Option<String>,
    /// Unix timestamp of the last successful update
    pub updated_at: Option<i64>,
}

/// Handle to the latest observed release tag.
///
/// Clones share the same value. Reads never block on I/O, so request
/// handlers can consult the cache inline.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCache {
    inner: Arc<RwLock<ReleaseInfo>>,
}

impl ReleaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that already holds a tag
    pub fn with_tag(tag: impl Into<String>) -> Self {
        let cache = Self::new();
        cache.set(tag);
        cache
    }

    /// Current tag, or `None` before the first successful poll
    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .latest_tag
            .clone()
    }

    /// Store a new tag and return the previous one
    pub fn set(&self, tag: impl Into<String>) -> Option<String> {
        let mut info = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        info.updated_at = Some(chrono::Utc::now().timestamp());
        info.latest_tag.replace(tag.into())
    }

    pub fn info(&self) -> ReleaseInfo {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
