//! Launch generator configuration

use anyhow::{ensure, Context, Result};
use launch_core::api::DEFAULT_PATH_PREFIX;
use launch_core::release::GithubReleases;
use serde::Deserialize;
use std::time::Duration;

/// Launch generator configuration, read from `LAUNCH_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct LauncherConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path prefix for the manifest routes (`launch/k8s` or `k8s-gen`)
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Upstream release list
    #[serde(default = "default_releases_url")]
    pub releases_url: String,

    /// Release poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout for a single release fetch in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_port() -> u16 {
    8080
}

fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_string()
}

fn default_releases_url() -> String {
    GithubReleases::DEFAULT_URL.to_string()
}

fn default_poll_interval() -> u64 {
    15 * 60
}

fn default_fetch_timeout() -> u64 {
    30
}

impl LauncherConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("LAUNCH").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Self = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
            .context("Invalid launch generator configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.poll_interval_secs > 0, "poll_interval_secs must be greater than zero");
        ensure!(self.fetch_timeout_secs > 0, "fetch_timeout_secs must be greater than zero");
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
