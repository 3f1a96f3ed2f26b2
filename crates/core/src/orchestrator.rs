use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

use crate::analyzer::{CriterionAnalyzer, CriterionAssessment, INSUFFICIENT_TEXT, MIN_PRODUCT_CHARS};
use crate::criteria::Criterion;

/// Fans criteria out to concurrent analyses and collects one assessment per criterion.
///
/// Each criterion runs in its own task with its own handle on the product
/// text. A failed, invalid or panicked analysis becomes an error-tagged
/// assessment; nothing is propagated to the caller and no entry is dropped.
#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    analyzer: CriterionAnalyzer,
    max_concurrency: Option<usize>,
}

enum Pending {
    Ready(CriterionAssessment),
    Running(JoinHandle<CriterionAssessment>),
}

impl AnalysisOrchestrator {
    pub fn new(analyzer: CriterionAnalyzer) -> Self {
        Self { analyzer, max_concurrency: None }
    }

    /// Caps the number of analyses in flight; `0` means unbounded.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = (limit > 0).then_some(limit);
        self
    }

    /// Analyzes `text` against every criterion concurrently.
    ///
    /// The map is keyed by criterion id. When two criteria share an id the
    /// later one's assessment is kept.
    #[tracing::instrument(skip_all, fields(criteria = criteria.len()))]
    pub async fn analyze_all(
        &self,
        text: &str,
        criteria: &[Criterion],
        product_name: Option<&str>,
        product_url: Option<&str>,
    ) -> BTreeMap<String, CriterionAssessment> {
        if text.chars().count() < MIN_PRODUCT_CHARS {
            tracing::warn!("product text too short, skipping analysis");
            return criteria
                .iter()
                .map(|c| (c.id.clone(), CriterionAssessment::failed(&c.id, INSUFFICIENT_TEXT)))
                .collect();
        }

        let text: Arc<str> = Arc::from(text);
        let product_name: Option<Arc<str>> = product_name.map(Arc::from);
        let product_url: Option<Arc<str>> = product_url.map(Arc::from);
        let semaphore = self.max_concurrency.map(|limit| Arc::new(Semaphore::new(limit)));

        let mut pending = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            if let Err(e) = criterion.validate() {
                tracing::warn!(criterion = %criterion.id, error = %e, "invalid criterion");
                let assessment = CriterionAssessment::failed(&criterion.id, e.to_string());
                pending.push((criterion.id.clone(), Pending::Ready(assessment)));
                continue;
            }

            let analyzer = self.analyzer.clone();
            let criterion = criterion.clone();
            let id = criterion.id.clone();
            let text = Arc::clone(&text);
            let product_name = product_name.clone();
            let product_url = product_url.clone();
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                analyzer.analyze(&text, &criterion, product_name.as_deref(), product_url.as_deref()).await
            });
            pending.push((id, Pending::Running(handle)));
        }

        let mut results = BTreeMap::new();
        for (id, task) in pending {
            let assessment = match task {
                Pending::Ready(assessment) => assessment,
                Pending::Running(handle) => handle.await.unwrap_or_else(|e| {
                    tracing::warn!(criterion = %id, error = %e, "analysis task aborted");
                    CriterionAssessment::failed(&id, format!("analysis error: {}", join_error_message(e)))
                }),
            };
            results.insert(id, assessment);
        }

        let failed = results.values().filter(|a| !a.is_ok()).count();
        tracing::info!(total = results.len(), failed, "criteria analyzed");
        results
    }
}

fn join_error_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
