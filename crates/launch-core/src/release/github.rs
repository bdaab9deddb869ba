//! GitHub releases API client

use super::{stable_tag, Release, ReleaseFetcher};
use crate::error::ReleaseError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches the Scope release list from the GitHub releases API
pub struct GithubReleases {
    client: Client,
    url: Url,
}

impl GithubReleases {
    pub const DEFAULT_URL: &'static str =
        "https://api.github.com/repos/weaveworks/scope/releases";

    /// Create a client for the given releases URL.
    ///
    /// The timeout bounds the whole request, including reading the body.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ReleaseError> {
        let client = Client::builder()
            .timeout(timeout)
            // GitHub rejects API requests without a User-Agent
            .user_agent(concat!("launch-generator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ReleaseError::Client)?;

        let url = Url::parse(url)?;

        Ok(Self { client, url })
    }

    /// Fetch the full release list, newest first
    pub async fn releases(&self) -> Result<Vec<Release>, ReleaseError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(ReleaseError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ReleaseError::Status { status, body });
        }

        response.json().await.map_err(ReleaseError::Malformed)
    }
}

#[async_trait]
impl ReleaseFetcher for GithubReleases {
    async fn latest_stable(&self) -> Result<String, ReleaseError> {
        let releases = self.releases().await?;
        let tag = stable_tag(&releases)?;
        debug!(url = %self.url, releases = releases.len(), tag = %tag, "Fetched release list");
        Ok(tag.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/repos/weaveworks/scope/releases";

    fn fetcher(server: &mockito::ServerGuard) -> GithubReleases {
        GithubReleases::new(&format!("{}{}", server.url(), PATH), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_latest_stable_reads_second_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"tag_name":"v2.0.0-rc1"},{"tag_name":"v1.9.1"}]"#)
            .create_async()
            .await;

        let tag = fetcher(&server).latest_stable().await.unwrap();

        assert_eq!(tag, "v1.9.1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_extra_release_fields_are_ignored() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(
                r#"[
                    {"tag_name":"v1.10.0","prerelease":true,"name":"Scope 1.10.0"},
                    {"tag_name":"v1.9.1","prerelease":false,"name":"Scope 1.9.1"}
                ]"#,
            )
            .create_async()
            .await;

        let tag = fetcher(&server).latest_stable().await.unwrap();
        assert_eq!(tag, "v1.9.1");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .with_status(403)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = fetcher(&server).latest_stable().await.unwrap_err();

        match err {
            ReleaseError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(r#"{"message":"not a list"}"#)
            .create_async()
            .await;

        let err = fetcher(&server).latest_stable().await.unwrap_err();
        assert!(matches!(err, ReleaseError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_single_release_is_not_enough() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", PATH)
            .with_status(200)
            .with_body(r#"[{"tag_name":"v2.0.0-rc1"}]"#)
            .create_async()
            .await;

        let err = fetcher(&server).latest_stable().await.unwrap_err();
        assert!(matches!(err, ReleaseError::NotEnoughReleases(1)));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = GithubReleases::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(ReleaseError::InvalidUrl(_))));
    }
}
