//! Error types for Assay operations.
//!
//! This module defines [`AssayError`], the single error type shared by the
//! fetch, extraction, prompt and inference stages of the pipeline.
//!
//! Most pipeline stages do not return these errors directly: extraction and
//! per-criterion analysis capture failures as an `error` string on their
//! result values so partial results survive. Only clearly invalid input
//! (a malformed URL) and client setup problems (missing credentials) are
//! raised to the caller.
//!
//! # Example
//!
//! ```rust
//! use assay_core::{AssayError, fetch::validate_url};
//!
//! match validate_url("example.com/product") {
//!     Ok(url) => println!("fetching {url}"),
//!     Err(AssayError::InvalidUrl(reason)) => println!("rejected: {reason}"),
//!     Err(e) => println!("error: {e}"),
//! }
//! ```

use thiserror::Error;

/// Main error type for the evaluation pipeline.
#[derive(Error, Debug)]
pub enum AssayError {
    /// Invalid URL provided.
    ///
    /// Returned before any network I/O when a URL cannot be parsed or is
    /// missing its scheme or host.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP transport errors from reqwest.
    ///
    /// This variant wraps DNS failures, connection resets, TLS problems
    /// and body decoding errors.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("HTTP {status} returned for {url}")]
    HttpStatus { status: u16, url: String },

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Both extraction strategies produced fewer characters than the floor.
    #[error("insufficient content")]
    InsufficientContent,

    /// HTML parsing errors, typically an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParse(String),

    /// A custom prompt template references an unknown placeholder or has
    /// unbalanced braces.
    #[error("Prompt template error: {0}")]
    PromptFormat(String),

    /// The inference provider failed or returned an unusable response.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Invalid or missing configuration (API keys, numeric settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// File read errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssayError {
    /// Whether this error belongs to the network family (transport failure,
    /// error status or timeout).
    pub fn is_network(&self) -> bool {
        matches!(self, AssayError::Http(_) | AssayError::HttpStatus { .. } | AssayError::Timeout { .. })
    }
}

/// Result type alias for AssayError.
pub type Result<T> = std::result::Result<T, AssayError>;
