//! The `extract(url)` facade.
//!
//! [`WebExtractor`] chains fetching, body text extraction and metadata
//! extraction into one call whose failures come back as data on
//! [`ExtractionResult`]. Only a malformed URL is returned as an `Err`.
//!
//! # Example
//!
//! ```rust
//! use assay_core::WebExtractor;
//!
//! let html = "<html><head><title>Widget</title></head><body><p>Coming soon.</p></body></html>";
//! let result = WebExtractor::default().extract_html(html, "https://example.com/widget");
//!
//! assert_eq!(result.content, "");
//! assert_eq!(result.error.as_deref(), Some("insufficient content"));
//! assert_eq!(result.metadata.get("title").map(String::as_str), Some("Widget"));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::content::{ContentExtractor, Strategy};
use crate::fetch::{FetchConfig, fetch_url, validate_url};
use crate::metadata::MetadataExtractor;
use crate::{AssayError, Result};

/// Body text and metadata for one page
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionResult {
    /// Extracted body text, empty on failure
    pub content: String,
    /// Metadata field name to value; always contains `url`
    pub metadata: BTreeMap<String, String>,
    /// Failure reason, `None` on success
    pub error: Option<String>,
    /// Strategy that produced `content`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
}

impl ExtractionResult {
    fn failed(url: &str, error: String) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("url".to_string(), url.to_string());
        Self { content: String::new(), metadata, error: Some(error), strategy: None }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetches a page and extracts its body text and metadata.
#[derive(Debug, Clone, Default)]
pub struct WebExtractor {
    fetch: FetchConfig,
    content: ContentExtractor,
    metadata: MetadataExtractor,
}

impl WebExtractor {
    pub fn new(fetch: FetchConfig, content: ContentExtractor) -> Self {
        Self { fetch, content, metadata: MetadataExtractor::new() }
    }

    pub fn fetch_config(&self) -> &FetchConfig {
        &self.fetch
    }

    /// Fetches `url` and extracts it.
    ///
    /// HTML processing runs on the blocking pool so concurrent requests keep
    /// making progress.
    ///
    /// # Errors
    ///
    /// Returns [`AssayError::InvalidUrl`] before any network I/O when the URL
    /// is malformed. Fetch and extraction failures are reported through
    /// [`ExtractionResult::error`] instead.
    #[tracing::instrument(skip(self))]
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let url = validate_url(url)?.to_string();

        let html = match fetch_url(&url, &self.fetch).await {
            Ok(html) => html,
            Err(AssayError::InvalidUrl(reason)) => return Err(AssayError::InvalidUrl(reason)),
            Err(e) => {
                tracing::warn!(error = %e, "fetch failed");
                return Ok(ExtractionResult::failed(&url, format!("failed to fetch URL: {e}")));
            }
        };

        let extractor = self.clone();
        let task_url = url.clone();
        match tokio::task::spawn_blocking(move || extractor.extract_html(&html, &task_url)).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(error = %e, "extraction task failed");
                Ok(ExtractionResult::failed(&url, format!("extraction error: {e}")))
            }
        }
    }

    /// Extracts body text and metadata from HTML already in memory.
    ///
    /// Metadata is extracted even when the body text is insufficient.
    pub fn extract_html(&self, html: &str, url: &str) -> ExtractionResult {
        let metadata = self.metadata.extract(html, url).into_map();

        match self.content.extract(html) {
            Ok(extracted) => {
                let chars = extracted.text.chars().count();
                tracing::info!(chars, strategy = ?extracted.strategy, "extracted content");
                ExtractionResult { content: extracted.text, metadata, error: None, strategy: Some(extracted.strategy) }
            }
            Err(e) => {
                tracing::warn!(error = %e, "content extraction failed");
                ExtractionResult { content: String::new(), metadata, error: Some(e.to_string()), strategy: None }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_content_keeps_metadata() {
        let html = r#"<html><head><title>Widget</title></head><body><span class="price">$5</span></body></html>"#;
        let result = WebExtractor::default().extract_html(html, "https://example.com/w");

        assert!(!result.is_ok());
        assert_eq!(result.content, "");
        assert_eq!(result.error.as_deref(), Some("insufficient content"));
        assert_eq!(result.metadata.get("price").map(String::as_str), Some("5"));
        assert_eq!(result.metadata.get("url").map(String::as_str), Some("https://example.com/w"));
    }

    #[test]
    fn test_success_has_no_error() {
        let body = "<p>A long and detailed description of the widget, its materials, and its many uses.</p>".repeat(3);
        let html = format!("<html><body>{body}</body></html>");
        let result = WebExtractor::default().extract_html(&html, "https://example.com/w");

        assert!(result.is_ok());
        assert!(result.content.contains("detailed description"));
        assert!(result.strategy.is_some());
    }

    #[tokio::test]
    async fn test_invalid_url_is_raised() {
        let result = WebExtractor::default().extract("not a url").await;
        assert!(matches!(result, Err(AssayError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_reported_as_data() {
        let fetch = FetchConfig { timeout: 2, ..Default::default() };
        let extractor = WebExtractor::new(fetch, ContentExtractor::default());
        let result = extractor.extract("http://127.0.0.1:9/product").await.unwrap();

        assert_eq!(result.content, "");
        assert!(result.error.as_deref().is_some_and(|e| e.starts_with("failed to fetch URL")));
        assert!(result.metadata.contains_key("url"));
    }

    #[test]
    fn test_serializes_null_error() {
        let result = ExtractionResult { content: "text".into(), ..Default::default() };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["error"].is_null());
    }
}
