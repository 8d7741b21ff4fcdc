use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Some hosts in front of the fantasy API reject anything that does not look
/// like a desktop browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";
const FANTASY_ORIGIN: &str = "https://fantasy.premierleague.com";

/// Any HTTP response, successful or not.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// DNS, connect, TLS, timeout or body-read failure.
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
}

/// A single GET against one candidate URL.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, UpstreamError>;
}

/// reqwest-backed client sending browser-like headers.
#[derive(Clone)]
pub struct HttpUpstream {
    http: Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));
        headers.insert(ORIGIN, HeaderValue::from_static(FANTASY_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static("https://fantasy.premierleague.com/"));

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpUpstream { http })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, UpstreamError> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;
        debug!("← {} ({} bytes) from {}", status, body.len(), url);
        Ok(FetchResponse { status, body })
    }
}
