use std::time::Duration;

use crate::error::{Error, Result};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Body and status of a fetched changelog page. Never persisted.
#[derive(Debug, Clone)]
pub struct RawContent {
    pub status: u16,
    pub body: String,
}

impl RawContent {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct ContentFetcher {
    client: reqwest::Client,
}

impl ContentFetcher {
    /// `accept_invalid_certs` lets self-signed or misconfigured TLS through.
    pub fn new(accept_invalid_certs: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("changelog-checker/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Single attempt; a timeout surfaces like any other transport failure.
    pub async fn fetch(&self, url: &str) -> Result<RawContent> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response body: {}", e)))?;
        Ok(RawContent { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/changelog"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>1.0</p>"))
            .mount(&server)
            .await;

        let fetcher = ContentFetcher::new(false).unwrap();
        let raw = fetcher
            .fetch(&format!("{}/changelog", server.uri()))
            .await
            .unwrap();
        assert_eq!(raw.status, 200);
        assert!(raw.is_success());
        assert_eq!(raw.body, "<p>1.0</p>");
    }

    #[tokio::test]
    async fn non_success_status_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let fetcher = ContentFetcher::new(true).unwrap();
        let raw = fetcher.fetch(&server.uri()).await.unwrap();
        assert_eq!(raw.status, 404);
        assert!(!raw.is_success());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let fetcher = ContentFetcher::new(true).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:1/changelog").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
