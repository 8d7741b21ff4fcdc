//! Player headshot relay.
//!
//! Only two sizes and a strict `p<digits>.png` file name are accepted, so the
//! relay cannot be used to fetch arbitrary paths from the image host.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Sizes published by the image host.
pub const SIZES: [&str; 2] = ["110x140", "250x250"];

/// Headshots never change for a given code.
pub const CACHE_CONTROL: &str = "public, max-age=604800, immutable";

static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^p\d{1,10}\.png$").expect("valid image file regex"));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("unsupported image size: {0}")]
    BadSize(String),
    #[error("invalid image name: {0}")]
    BadName(String),
}

/// Check a requested size and file name before any network access.
pub fn validate(size: &str, file: &str) -> Result<(), ImageError> {
    if !SIZES.contains(&size) {
        return Err(ImageError::BadSize(size.to_string()));
    }
    if !FILE_NAME.is_match(file) {
        return Err(ImageError::BadName(file.to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ImageRelay {
    http: Client,
    host_url: String,
}

impl ImageRelay {
    pub fn new(host_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ImageRelay {
            http,
            host_url: host_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn image_url(&self, size: &str, file: &str) -> String {
        format!("{}/{}/{}", self.host_url, size, file)
    }

    /// Fetch a validated image. The response is returned unread so the
    /// caller can stream the body.
    pub async fn fetch(&self, size: &str, file: &str) -> Result<reqwest::Response> {
        let url = self.image_url(size, file);
        debug!("Image relay → {}", url);
        self.http
            .get(&url)
            .send()
            .await
            .context("Image host request failed")
    }
}
