use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analyzer::CriterionAssessment;
use crate::criteria::Criterion;
use crate::inference::{GenerationConfig, InferenceProvider};
use crate::prompt::summary_prompt;

/// Longest assessment excerpt quoted per criterion, in characters
pub const MAX_ASSESSMENT_CHARS: usize = 500;

pub const INSUFFICIENT_DATA: &str = "insufficient evaluation data for summary generation";
pub const EMPTY_SUMMARY: &str = "failed to generate summary";

/// One criterion's contribution to the summary prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub criterion_name: String,
    pub score: Option<u8>,
    pub assessment: Option<String>,
    pub notes: Option<String>,
}

impl SummaryEntry {
    pub fn from_assessment(criterion: &Criterion, assessment: &CriterionAssessment) -> Self {
        Self {
            criterion_name: criterion.name.clone(),
            score: assessment.suggested_score,
            assessment: Some(assessment.analysis.clone()).filter(|a| !a.trim().is_empty()),
            notes: None,
        }
    }
}

/// Narrative summary, or the reason there is none
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub error: Option<String>,
}

impl SummaryResult {
    fn failed(error: impl Into<String>) -> Self {
        Self { summary: String::new(), error: Some(error.into()) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Renders entries as `## Name: score/10` blocks for the summary prompt.
pub fn format_entries(entries: &[SummaryEntry]) -> String {
    let mut text = String::new();

    for (i, entry) in entries.iter().enumerate() {
        let name = if entry.criterion_name.trim().is_empty() {
            format!("Criterion {}", i + 1)
        } else {
            entry.criterion_name.clone()
        };
        let score = entry.score.map_or_else(|| "N/A".to_string(), |s| format!("{s}/10"));
        text.push_str(&format!("## {name}: {score}\n"));

        let assessment = entry.assessment.as_deref().map(str::trim).filter(|a| !a.is_empty());
        let notes = entry.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

        if let Some(assessment) = assessment {
            text.push_str(&excerpt(assessment));
            text.push_str("\n\n");
        }
        if let Some(notes) = notes {
            text.push_str(&format!("User notes: {notes}\n\n"));
        }
        if assessment.is_none() && notes.is_none() {
            text.push_str("No detailed assessment available.\n\n");
        }
    }

    text
}

fn excerpt(assessment: &str) -> String {
    if assessment.chars().count() <= MAX_ASSESSMENT_CHARS {
        return assessment.to_string();
    }
    let mut cut: String = assessment.chars().take(MAX_ASSESSMENT_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

/// Turns a complete set of criterion results into one narrative summary.
#[derive(Clone)]
pub struct SummaryComposer {
    provider: Arc<dyn InferenceProvider>,
    config: GenerationConfig,
}

impl std::fmt::Debug for SummaryComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryComposer")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

impl SummaryComposer {
    pub fn new(provider: Arc<dyn InferenceProvider>) -> Self {
        Self { provider, config: GenerationConfig::summary() }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Makes one provider call for the summary.
    ///
    /// An empty entry list returns an error result without calling the
    /// provider; an empty reply or provider failure also yields an error result
    /// with an empty summary.
    #[tracing::instrument(skip(self, entries), fields(entries = entries.len()))]
    pub async fn compose(
        &self,
        entries: &[SummaryEntry],
        product_name: &str,
        overall_score: Option<f64>,
        include_recommendations: bool,
    ) -> SummaryResult {
        if entries.is_empty() {
            return SummaryResult::failed(INSUFFICIENT_DATA);
        }

        let prompt = summary_prompt(product_name, overall_score, &format_entries(entries), include_recommendations);

        match self.provider.generate(&prompt, &self.config).await {
            Ok(summary) if summary.trim().is_empty() => {
                tracing::warn!("provider returned an empty summary");
                SummaryResult::failed(EMPTY_SUMMARY)
            }
            Ok(summary) => {
                tracing::info!(chars = summary.len(), "summary generated");
                SummaryResult { summary: summary.trim().to_string(), error: None }
            }
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed");
                SummaryResult::failed(format!("summary generation error: {e}"))
            }
        }
    }
}
