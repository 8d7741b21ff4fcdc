pub mod images;

pub use images::ImageRelay;

use anyhow::{Context, Result};
use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::RapidSettings;

/// An upstream response relayed verbatim: status, content type and body.
#[derive(Debug, Clone)]
pub struct Proxied {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

/// Forwards GET sub-paths and query strings to a fixed API base, attaching
/// server-held credentials.
#[derive(Clone)]
pub struct Passthrough {
    http: Client,
    base_url: String,
    label: &'static str,
}

impl Passthrough {
    /// football-data.org v4, authenticated with `X-Auth-Token`.
    pub fn football_data(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-auth-token"),
            HeaderValue::from_str(token).context("FD_TOKEN is not a valid header value")?,
        );
        Self::build("football-data", base_url, headers, timeout)
    }

    /// API-Football via RapidAPI.
    pub fn rapid(settings: &RapidSettings, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-rapidapi-key"),
            HeaderValue::from_str(&settings.key).context("RAPID_KEY is not a valid header value")?,
        );
        if let Some(host) = &settings.host {
            headers.insert(
                HeaderName::from_static("x-rapidapi-host"),
                HeaderValue::from_str(host).context("RAPID_HOST is not a valid header value")?,
            );
        }
        Self::build("rapid", &settings.base, headers, timeout)
    }

    fn build(
        label: &'static str,
        base_url: &str,
        mut headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Self> {
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Passthrough {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            label,
        })
    }

    /// The upstream URL for a sub-path (with or without a leading slash) and
    /// an optional raw query string.
    pub fn target_url(&self, subpath: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.base_url, subpath.trim_start_matches('/'));
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(q);
        }
        url
    }

    pub async fn forward(&self, subpath: &str, query: Option<&str>) -> Result<Proxied> {
        let url = self.target_url(subpath, query);
        debug!("[{}] → {}", self.label, url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("{} request failed", self.label))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read {} response", self.label))?;
        debug!("[{}] ← {} ({} bytes)", self.label, status, body.len());

        Ok(Proxied {
            status,
            content_type,
            body,
        })
    }
}
