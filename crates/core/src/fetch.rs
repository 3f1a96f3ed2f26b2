//! Content fetching from URLs and files.
//!
//! This module retrieves raw HTML for the extractors. URLs are validated up
//! front so malformed input never reaches the network, and every request
//! carries browser-like headers to reduce anti-bot rejections.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};
use url::Url;

use crate::{AssayError, Result};

/// Default desktop browser User-Agent.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent string sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: BROWSER_USER_AGENT.to_string() }
    }
}

/// Parses a URL and checks that it has both a scheme and a host.
pub fn validate_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AssayError::InvalidUrl("no URL provided".to_string()));
    }

    let parsed = Url::parse(trimmed).map_err(|e| AssayError::InvalidUrl(format!("{trimmed}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AssayError::InvalidUrl(format!("unsupported scheme '{}'", parsed.scheme())));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AssayError::InvalidUrl(format!("{trimmed}: missing host")));
    }

    Ok(parsed)
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// Fetches HTML content from a URL.
///
/// Performs a single HTTP GET (no retries) with the configured timeout.
/// Redirects are followed; a non-success final status is an error.
#[tracing::instrument(skip(config), fields(timeout = config.timeout))]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = validate_url(url)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .user_agent(config.user_agent.as_str())
        .default_headers(browser_headers())
        .build()?;

    let response = client.get(parsed_url.clone()).send().await.map_err(|e| {
        if e.is_timeout() { AssayError::Timeout { timeout: config.timeout } } else { AssayError::Http(e) }
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "fetch returned error status");
        return Err(AssayError::HttpStatus { status: status.as_u16(), url: parsed_url.to_string() });
    }

    let content = response.text().await.map_err(|e| {
        if e.is_timeout() { AssayError::Timeout { timeout: config.timeout } } else { AssayError::Http(e) }
    })?;

    tracing::debug!(bytes = content.len(), "fetched page");
    Ok(content)
}

/// Reads HTML content from a local file.
pub async fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);
    Ok(tokio::fs::read_to_string(&path_buf).await?)
}

/// Reads HTML content from stdin until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}
