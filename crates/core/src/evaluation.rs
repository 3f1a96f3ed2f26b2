//! Evaluation records and the end-to-end workflow.
//!
//! An [`Evaluation`] is the user's per-criterion record for one product:
//! their own score and notes plus the AI narrative. [`Evaluator`] runs the
//! whole pipeline (extract, analyze, aggregate, summarize) and returns an
//! [`EvaluationReport`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::weighted_score;
use crate::analyzer::{CriterionAnalyzer, CriterionAssessment};
use crate::config::Settings;
use crate::criteria::Criterion;
use crate::extract::{ExtractionResult, WebExtractor};
use crate::inference::InferenceProvider;
use crate::orchestrator::AnalysisOrchestrator;
use crate::summary::{SummaryComposer, SummaryEntry, SummaryResult};
use crate::{AssayError, Result};

/// A user's record for one criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionEvaluation {
    pub criterion: Criterion,
    pub score: Option<u8>,
    pub notes: Option<String>,
    pub ai_assessment: Option<String>,
}

impl CriterionEvaluation {
    pub fn new(criterion: Criterion) -> Self {
        Self { criterion, score: None, notes: None, ai_assessment: None }
    }
}

/// A product evaluation across a set of criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub product_name: String,
    pub product_url: Option<String>,
    pub criterion_evaluations: Vec<CriterionEvaluation>,
}

impl Evaluation {
    pub fn new(product_name: impl Into<String>, product_url: Option<String>, criteria: &[Criterion]) -> Self {
        Self {
            product_name: product_name.into(),
            product_url,
            criterion_evaluations: criteria.iter().cloned().map(CriterionEvaluation::new).collect(),
        }
    }

    fn entry_mut(&mut self, criterion_id: &str) -> Result<&mut CriterionEvaluation> {
        self.criterion_evaluations
            .iter_mut()
            .find(|ce| ce.criterion.id == criterion_id)
            .ok_or_else(|| AssayError::Config(format!("unknown criterion '{criterion_id}'")))
    }

    /// Records a user score in 1..=10.
    pub fn set_score(&mut self, criterion_id: &str, score: u8) -> Result<()> {
        if !(1..=10).contains(&score) {
            return Err(AssayError::Config(format!("score {score} is outside 1-10")));
        }
        self.entry_mut(criterion_id)?.score = Some(score);
        Ok(())
    }

    pub fn set_notes(&mut self, criterion_id: &str, notes: impl Into<String>) -> Result<()> {
        self.entry_mut(criterion_id)?.notes = Some(notes.into());
        Ok(())
    }

    /// Stores each successful narrative; a suggested score only fills a score the user has not set.
    pub fn apply_assessments(&mut self, assessments: &BTreeMap<String, CriterionAssessment>) {
        for ce in &mut self.criterion_evaluations {
            let Some(assessment) = assessments.get(&ce.criterion.id) else { continue };
            if !assessment.is_ok() {
                continue;
            }
            ce.ai_assessment = Some(assessment.analysis.clone());
            if ce.score.is_none() {
                ce.score = assessment.suggested_score;
            }
        }
    }

    /// Weighted mean of the scored criteria; `None` when nothing is scored.
    pub fn overall_score(&self) -> Option<f64> {
        weighted_score(self.criterion_evaluations.iter().map(|ce| (ce.score, ce.criterion.weight)))
    }

    pub fn summary_entries(&self) -> Vec<SummaryEntry> {
        self.criterion_evaluations
            .iter()
            .map(|ce| SummaryEntry {
                criterion_name: ce.criterion.name.clone(),
                score: ce.score,
                assessment: ce.ai_assessment.clone(),
                notes: ce.notes.clone(),
            })
            .collect()
    }
}

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub url: String,
    pub product_name: String,
    pub extraction: ExtractionResult,
    pub assessments: BTreeMap<String, CriterionAssessment>,
    pub evaluation: Evaluation,
    pub overall_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryResult>,
}

/// Runs extraction, analysis, aggregation and summary for one product page.
#[derive(Debug, Clone)]
pub struct Evaluator {
    extractor: WebExtractor,
    orchestrator: AnalysisOrchestrator,
    composer: SummaryComposer,
    include_summary: bool,
    include_recommendations: bool,
}

impl Evaluator {
    pub fn new(extractor: WebExtractor, provider: Arc<dyn InferenceProvider>, settings: &Settings) -> Self {
        let analyzer = CriterionAnalyzer::new(Arc::clone(&provider), settings.analysis_config());
        Self {
            extractor,
            orchestrator: AnalysisOrchestrator::new(analyzer),
            composer: SummaryComposer::new(provider),
            include_summary: true,
            include_recommendations: true,
        }
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.orchestrator = self.orchestrator.with_max_concurrency(limit);
        self
    }

    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    pub fn with_recommendations(mut self, include: bool) -> Self {
        self.include_recommendations = include;
        self
    }

    /// Fetches and evaluates `url`.
    ///
    /// # Errors
    ///
    /// Only a malformed URL is an error; every later failure is carried on the report.
    #[tracing::instrument(skip(self, criteria, product_name), fields(criteria = criteria.len()))]
    pub async fn evaluate(
        &self,
        url: &str,
        criteria: &[Criterion],
        product_name: Option<&str>,
    ) -> Result<EvaluationReport> {
        let extraction = self.extractor.extract(url).await?;
        Ok(self.evaluate_extraction(url, extraction, criteria, product_name).await)
    }

    /// Evaluates an extraction that is already in hand.
    pub async fn evaluate_extraction(
        &self,
        url: &str,
        extraction: ExtractionResult,
        criteria: &[Criterion],
        product_name: Option<&str>,
    ) -> EvaluationReport {
        let product_name = product_name
            .map(str::to_string)
            .or_else(|| extraction.metadata.get("product_name").cloned())
            .or_else(|| extraction.metadata.get("title").cloned())
            .unwrap_or_else(|| "Product".to_string());

        let assessments =
            self.orchestrator.analyze_all(&extraction.content, criteria, Some(&product_name), Some(url)).await;

        let mut evaluation = Evaluation::new(product_name.clone(), Some(url.to_string()), criteria);
        evaluation.apply_assessments(&assessments);
        let overall_score = evaluation.overall_score();

        let summary = match overall_score {
            Some(score) if self.include_summary => Some(
                self.composer
                    .compose(&evaluation.summary_entries(), &product_name, Some(score), self.include_recommendations)
                    .await,
            ),
            _ => None,
        };

        tracing::info!(overall = ?overall_score, summary = summary.is_some(), "evaluation complete");
        EvaluationReport {
            url: url.to_string(),
            product_name,
            extraction,
            assessments,
            evaluation,
            overall_score,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::StubProvider;

    fn criteria() -> Vec<Criterion> {
        vec![Criterion::new("a", "Alpha", "first", 3), Criterion::new("b", "Beta", "second", 2)]
    }

    fn assessment(id: &str, analysis: &str, score: Option<u8>) -> CriterionAssessment {
        CriterionAssessment { criterion_id: id.into(), analysis: analysis.into(), suggested_score: score, error: None }
    }

    #[test]
    fn test_user_score_wins() {
        let mut evaluation = Evaluation::new("Widget", None, &criteria());
        evaluation.set_score("a", 4).unwrap();

        let assessments = BTreeMap::from([
            ("a".to_string(), assessment("a", "Alpha narrative", Some(9))),
            ("b".to_string(), assessment("b", "Beta narrative", Some(6))),
        ]);
        evaluation.apply_assessments(&assessments);

        assert_eq!(evaluation.criterion_evaluations[0].score, Some(4));
        assert_eq!(evaluation.criterion_evaluations[0].ai_assessment.as_deref(), Some("Alpha narrative"));
        assert_eq!(evaluation.criterion_evaluations[1].score, Some(6));
        assert!((evaluation.overall_score().unwrap() - 4.8).abs() < 1e-9);
    }

    #[test]
    fn test_failed_assessment_not_applied() {
        let mut evaluation = Evaluation::new("Widget", None, &criteria());
        let assessments = BTreeMap::from([("a".to_string(), CriterionAssessment::failed("a", "boom"))]);
        evaluation.apply_assessments(&assessments);

        assert_eq!(evaluation.criterion_evaluations[0].ai_assessment, None);
        assert_eq!(evaluation.overall_score(), None);
    }

    #[test]
    fn test_set_score_validates() {
        let mut evaluation = Evaluation::new("Widget", None, &criteria());
        assert!(evaluation.set_score("a", 11).is_err());
        assert!(evaluation.set_score("missing", 5).is_err());
        assert!(evaluation.set_notes("b", "Looks good").is_ok());
        assert_eq!(evaluation.summary_entries()[1].notes.as_deref(), Some("Looks good"));
    }

    fn extraction(content: &str) -> ExtractionResult {
        let metadata = BTreeMap::from([
            ("url".to_string(), "https://example.com/w".to_string()),
            ("title".to_string(), "Widget | Shop".to_string()),
            ("product_name".to_string(), "Widget".to_string()),
        ]);
        ExtractionResult { content: content.to_string(), metadata, error: None, strategy: None }
    }

    #[tokio::test]
    async fn test_evaluate_extraction_end_to_end() {
        let stub = StubProvider::new("Narrative.")
            .on("suggest a score", "8")
            .on("summarizing the results", "Final summary.");
        let evaluator = Evaluator::new(WebExtractor::default(), Arc::new(stub.clone()), &Settings::default());

        let text = "Widget ships with an API, SSO and a generous free tier for small teams. ".repeat(3);
        let report = evaluator.evaluate_extraction("https://example.com/w", extraction(&text), &criteria(), None).await;

        assert_eq!(report.product_name, "Widget");
        assert_eq!(report.assessments.len(), 2);
        assert_eq!(report.overall_score, Some(8.0));
        assert_eq!(report.summary.as_ref().map(|s| s.summary.as_str()), Some("Final summary."));
        assert_eq!(stub.call_count(), 5);
    }

    #[tokio::test]
    async fn test_no_summary_without_scores() {
        let stub = StubProvider::new("unused");
        let evaluator = Evaluator::new(WebExtractor::default(), Arc::new(stub.clone()), &Settings::default());

        let report =
            evaluator.evaluate_extraction("https://example.com/w", extraction(""), &criteria(), Some("Named")).await;

        assert_eq!(report.product_name, "Named");
        assert_eq!(report.overall_score, None);
        assert!(report.summary.is_none());
        assert!(report.assessments.values().all(|a| !a.is_ok()));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summary_can_be_disabled() {
        let stub = StubProvider::new("Narrative.").on("suggest a score", "5");
        let evaluator =
            Evaluator::new(WebExtractor::default(), Arc::new(stub.clone()), &Settings::default()).with_summary(false);

        let text = "Widget ships with an API, SSO and a generous free tier for small teams. ".repeat(3);
        let report = evaluator.evaluate_extraction("https://example.com/w", extraction(&text), &criteria(), None).await;

        assert_eq!(report.overall_score, Some(5.0));
        assert!(report.summary.is_none());
        assert_eq!(stub.call_count(), 4);
    }
}
