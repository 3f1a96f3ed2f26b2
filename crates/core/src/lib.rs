pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod content;
pub mod criteria;
pub mod error;
pub mod evaluation;
pub mod extract;
pub mod fetch;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod inference;
pub mod metadata;
pub mod orchestrator;
pub mod parse;
pub mod preprocess;
pub mod prompt;
pub mod scoring;
pub mod summary;

pub use aggregate::{aggregate_score, score_assessments, weighted_score};
pub use analyzer::{CriterionAnalyzer, CriterionAssessment, parse_score};
pub use config::Settings;
pub use content::{ContentConfig, ContentExtractor, ExtractedText, Strategy};
pub use criteria::{Criterion, criteria_from_json};
pub use error::{AssayError, Result};
pub use evaluation::{CriterionEvaluation, Evaluation, EvaluationReport, Evaluator};
pub use extract::{ExtractionResult, WebExtractor};
pub use fetch::FetchConfig;
pub use fetch::{fetch_file, fetch_stdin, fetch_url};
#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;
pub use inference::{GenerationConfig, InferenceProvider, StubProvider};
pub use metadata::{Metadata, MetadataExtractor};
pub use orchestrator::AnalysisOrchestrator;
pub use parse::Document;
#[doc(hidden)]
pub use preprocess::{PreprocessConfig, preprocess_html};
pub use prompt::truncate_text;
#[doc(hidden)]
pub use scoring::{ScoreConfig, calculate_score};
pub use summary::{SummaryComposer, SummaryEntry, SummaryResult};
