//! Google Generative Language REST client.
//!
//! [`GeminiClient`] implements [`InferenceProvider`] over
//! `POST {base_url}/models/{model}:generateContent`. One client (and one
//! connection pool) is shared by every concurrent analysis.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::inference::{GenerationConfig, InferenceProvider};
use crate::{AssayError, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient").field("model", &self.model).field("base_url", &self.base_url).finish()
    }
}

impl GeminiClient {
    /// Creates a client with a per-request timeout.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AssayError::Config("GOOGLE_API_KEY is empty".to_string()));
        }

        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client, api_key, model: model.into(), base_url: DEFAULT_BASE_URL.to_string() })
    }

    /// Creates a client from process settings.
    ///
    /// # Errors
    ///
    /// Returns [`AssayError::Config`] when no API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .google_api_key
            .clone()
            .ok_or_else(|| AssayError::Config("GOOGLE_API_KEY not set".to_string()))?;
        Self::new(api_key, settings.model_name.clone(), Duration::from_secs(settings.timeout_secs))
    }

    /// Sets a custom base URL (proxies, regional endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: RequestGenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, config: &GenerationConfig) -> Self {
        Self {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config: RequestGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                top_p: config.top_p,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting { category, threshold: "BLOCK_ONLY_HIGH" })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated; empty when there are none.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect::<String>())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InferenceProvider for GeminiClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::new(prompt, config))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Gemini request failed");
                AssayError::Inference(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Gemini API error");
            return Err(AssayError::Inference(format!("Gemini API error {status}: {error_text}")));
        }

        let body: GenerateResponse =
            response.json().await.map_err(|e| AssayError::Inference(format!("invalid response: {e}")))?;
        let text = body.text();

        debug!(model = %self.model, duration_ms = start.elapsed().as_millis(), chars = text.len(), "Gemini completion");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest::new("hello", &GenerationConfig::summary());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_ONLY_HIGH");
    }

    #[test]
    fn test_response_text() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "Good "}, {"text": "product."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "Good product.");
    }

    #[test]
    fn test_blocked_response_is_empty() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}], "promptFeedback": {}}"#).unwrap();
        assert_eq!(body.text(), "");

        let body: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.text(), "");
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("key", "gemini-1.5-flash", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080/models/gemini-1.5-flash:generateContent");
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = GeminiClient::new(" ", "gemini-1.5-flash", Duration::from_secs(5));
        assert!(matches!(result, Err(AssayError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_inference_error() {
        let client = GeminiClient::new("key", "m", Duration::from_secs(2)).unwrap().with_base_url("http://127.0.0.1:9");
        let result = client.generate("hi", &GenerationConfig::default()).await;
        assert!(matches!(result, Err(AssayError::Inference(_))));
    }
}
