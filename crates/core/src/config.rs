use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::inference::GenerationConfig;
use crate::{AssayError, Result};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Process-wide settings read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `GOOGLE_API_KEY`; only required once a provider client is built
    pub google_api_key: Option<String>,
    /// `AI_MODEL_NAME`
    pub model_name: String,
    /// `AI_TEMPERATURE`
    pub temperature: f32,
    /// `AI_MAX_TOKENS`
    pub max_tokens: u32,
    /// `AI_TIMEOUT_SECS`, per inference request
    pub timeout_secs: u64,
    /// `LOG_LEVEL`, used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            google_api_key: None,
            model_name: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            timeout_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AssayError::Config`] if a numeric variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings from a dotenv file, with process environment variables taking precedence.
    ///
    /// Unlike [`Settings::from_env`] the file is not loaded into the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AssayError::Config`] if the file is missing or malformed.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |e: dotenvy::Error| AssayError::Config(format!("{}: {e}", path.display()));
        let file = dotenvy::from_path_iter(path)
            .map_err(invalid)?
            .collect::<std::result::Result<HashMap<String, String>, _>>()
            .map_err(invalid)?;

        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    /// Reads settings through an arbitrary lookup; unset and blank values take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            google_api_key: get("GOOGLE_API_KEY"),
            model_name: get("AI_MODEL_NAME").unwrap_or(defaults.model_name),
            temperature: parse_var("AI_TEMPERATURE", get("AI_TEMPERATURE"), defaults.temperature)?,
            max_tokens: parse_var("AI_MAX_TOKENS", get("AI_MAX_TOKENS"), defaults.max_tokens)?,
            timeout_secs: parse_var("AI_TIMEOUT_SECS", get("AI_TIMEOUT_SECS"), defaults.timeout_secs)?,
            log_level: get("LOG_LEVEL").map(|v| v.to_lowercase()).unwrap_or(defaults.log_level),
        })
    }

    /// Sampling parameters for per-criterion analysis calls.
    pub fn analysis_config(&self) -> GenerationConfig {
        GenerationConfig::analysis(self.temperature, self.max_tokens)
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e| AssayError::Config(format!("{key}='{raw}': {e}"))),
        None => Ok(default),
    }
}
