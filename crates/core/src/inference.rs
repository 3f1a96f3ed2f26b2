//! Inference provider abstraction.
//!
//! [`InferenceProvider`] is the seam between the pipeline and a language
//! model service. Analyses share one provider as `Arc<dyn InferenceProvider>`
//! and call it concurrently, so implementations must be `Send + Sync` and
//! handle their own synchronisation.
//!
//! [`StubProvider`] is a scripted implementation for tests and offline runs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::{AssayError, Result};

/// Sampling parameters for one generation call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

impl GenerationConfig {
    /// Per-criterion analysis and score calls.
    pub fn analysis(temperature: f32, max_output_tokens: u32) -> Self {
        Self { temperature, max_output_tokens, top_p: 0.9 }
    }

    /// The final summary call.
    pub fn summary() -> Self {
        Self { temperature: 0.4, max_output_tokens: 2048, top_p: 0.95 }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::analysis(0.3, 2048)
    }
}

/// A language model that turns a prompt into text.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Generates a completion for `prompt`.
    ///
    /// An empty string means the model produced no usable content; callers
    /// decide whether that is a failure.
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    /// Provider name for logs.
    fn name(&self) -> &str {
        "provider"
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A scripted [`InferenceProvider`].
///
/// Each prompt is matched against the registered rules in order; the first
/// rule whose pattern occurs in the prompt decides the reply. Unmatched
/// prompts get the default reply. Every prompt is recorded.
#[derive(Debug, Clone, Default)]
pub struct StubProvider {
    rules: Vec<(String, Reply)>,
    default_reply: String,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubProvider {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self { default_reply: default_reply.into(), ..Default::default() }
    }

    /// Replies with `reply` to prompts containing `pattern`.
    pub fn on(mut self, pattern: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), Reply::Text(reply.into())));
        self
    }

    /// Fails prompts containing `pattern` with an inference error.
    pub fn fail_on(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), Reply::Fail(message.into())));
        self
    }

    /// Sleeps before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, in arrival order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl InferenceProvider for StubProvider {
    async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.rules.iter().find(|(pattern, _)| prompt.contains(pattern.as_str())).map(|(_, reply)| reply);

        match reply {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Fail(message)) => Err(AssayError::Inference(message.clone())),
            None => Ok(self.default_reply.clone()),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}
