//! Per-criterion analysis.
//!
//! [`CriterionAnalyzer::analyze`] makes two provider calls for one
//! criterion: a narrative assessment, then a score-only follow-up whose reply
//! is parsed with [`parse_score`]. Every failure is reported on the returned
//! [`CriterionAssessment`] rather than as an `Err`.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::criteria::Criterion;
use crate::inference::{GenerationConfig, InferenceProvider};
use crate::prompt::{criterion_prompt, product_context, score_prompt};

/// Product text shorter than this is not sent to the provider
pub const MIN_PRODUCT_CHARS: usize = 100;

pub const INSUFFICIENT_TEXT: &str = "insufficient product text for analysis";
pub const EMPTY_ANALYSIS: &str = "failed to generate analysis";

static SCORE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([1-9]|10)\b").expect("valid score pattern"));

/// One criterion's analysis result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionAssessment {
    pub criterion_id: String,
    /// Narrative assessment, empty on failure
    pub analysis: String,
    /// Suggested score in 1..=10; absent when the reply had no score token
    pub suggested_score: Option<u8>,
    pub error: Option<String>,
}

impl CriterionAssessment {
    pub fn failed(criterion_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self { criterion_id: criterion_id.into(), error: Some(error.into()), ..Default::default() }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// First standalone `1`..`9` or `10` in a reply.
pub fn parse_score(response: &str) -> Option<u8> {
    SCORE_PATTERN.captures(response).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse().ok())
}

/// Analyzes product text against one criterion.
#[derive(Clone)]
pub struct CriterionAnalyzer {
    provider: Arc<dyn InferenceProvider>,
    config: GenerationConfig,
}

impl std::fmt::Debug for CriterionAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriterionAnalyzer")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

impl CriterionAnalyzer {
    pub fn new(provider: Arc<dyn InferenceProvider>, config: GenerationConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Runs the narrative and score calls for `criterion`.
    ///
    /// Text under [`MIN_PRODUCT_CHARS`] characters short-circuits without a
    /// provider call. An empty narrative is an error; a failed or unparseable
    /// score call leaves `suggested_score` absent but keeps the narrative.
    #[tracing::instrument(skip_all, fields(criterion = %criterion.id))]
    pub async fn analyze(
        &self,
        text: &str,
        criterion: &Criterion,
        product_name: Option<&str>,
        product_url: Option<&str>,
    ) -> CriterionAssessment {
        if text.chars().count() < MIN_PRODUCT_CHARS {
            return CriterionAssessment::failed(&criterion.id, INSUFFICIENT_TEXT);
        }

        match self.try_analyze(text, criterion, product_name, product_url).await {
            Ok(assessment) => assessment,
            Err(e) => {
                tracing::warn!(error = %e, "criterion analysis failed");
                CriterionAssessment::failed(&criterion.id, format!("analysis error: {e}"))
            }
        }
    }

    async fn try_analyze(
        &self,
        text: &str,
        criterion: &Criterion,
        product_name: Option<&str>,
        product_url: Option<&str>,
    ) -> Result<CriterionAssessment> {
        let context = product_context(text, product_name, product_url);
        let prompt = criterion_prompt(criterion, &context, product_name, product_url)?;

        let analysis = self.provider.generate(&prompt, &self.config).await?;
        let analysis = analysis.trim();
        if analysis.is_empty() {
            tracing::warn!("provider returned an empty analysis");
            return Ok(CriterionAssessment::failed(&criterion.id, EMPTY_ANALYSIS));
        }

        let score_request = score_prompt(&criterion.name, product_name, analysis);
        let suggested_score = match self.provider.generate(&score_request, &self.config).await {
            Ok(reply) => parse_score(&reply),
            Err(e) => {
                tracing::warn!(error = %e, "score request failed");
                None
            }
        };

        tracing::debug!(score = ?suggested_score, chars = analysis.len(), "criterion analyzed");
        Ok(CriterionAssessment {
            criterion_id: criterion.id.clone(),
            analysis: analysis.to_string(),
            suggested_score,
            error: None,
        })
    }
}
