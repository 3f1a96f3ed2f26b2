mod echo;

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use assay_core::{
    ContentExtractor, Criterion, EvaluationReport, Evaluator, ExtractionResult, FetchConfig, GeminiClient, Settings,
    WebExtractor, criteria_from_json, fetch_file, fetch_stdin,
};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::echo::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: text, json", s)),
        }
    }
}

/// Extract product pages and score them against weighted criteria
#[derive(Parser, Debug)]
#[command(name = "assay")]
#[command(author = "Assay Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Extract product pages and score them against weighted criteria", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", value_name = "FORMAT", global = true)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract body text and metadata from a page
    Extract {
        /// URL to fetch, local HTML file, or "-" for stdin
        #[arg(value_name = "INPUT")]
        input: String,

        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// Evaluate a product page against weighted criteria
    Evaluate {
        /// Product page URL
        #[arg(value_name = "URL")]
        url: String,

        /// JSON file with criteria (default: built-in criteria)
        #[arg(long, value_name = "FILE")]
        criteria: Option<PathBuf>,

        /// Product name (default: taken from page metadata)
        #[arg(long, value_name = "NAME")]
        name: Option<String>,

        /// Inference model (overrides AI_MODEL_NAME)
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// Maximum concurrent criterion analyses (0 = unbounded)
        #[arg(long, default_value = "0", value_name = "NUM")]
        concurrency: usize,

        /// Skip the narrative summary
        #[arg(long)]
        no_summary: bool,

        /// Leave the recommendations section out of the summary
        #[arg(long)]
        no_recommendations: bool,

        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// List the built-in evaluation criteria
    Criteria,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

impl FetchArgs {
    fn config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        FetchConfig { timeout: self.timeout, user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent) }
    }
}

fn init_tracing(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn write_output(output: &Option<PathBuf>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn render_extraction(result: &ExtractionResult) -> String {
    let mut out = String::new();
    for (key, value) in &result.metadata {
        let value = value.replace('\n', "; ");
        let _ = writeln!(out, "{}: {}", key, value);
    }
    let _ = writeln!(out);
    out.push_str(&result.content);
    out.push('\n');
    out
}

fn render_report(report: &EvaluationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", report.product_name);
    let _ = writeln!(out, "URL: {}", report.url);
    match report.overall_score {
        Some(score) => {
            let _ = writeln!(out, "Overall score: {:.1}/10\n", score);
        }
        None => {
            let _ = writeln!(out, "Overall score: N/A\n");
        }
    }

    for ce in &report.evaluation.criterion_evaluations {
        let score = ce.score.map_or_else(|| "N/A".to_string(), |s| format!("{}/10", s));
        let _ = writeln!(out, "## {} ({}, weight {})\n", ce.criterion.name, score, ce.criterion.weight);

        let assessment = report.assessments.get(&ce.criterion.id);
        match (assessment.and_then(|a| a.error.as_deref()), ce.ai_assessment.as_deref()) {
            (Some(error), _) => {
                let _ = writeln!(out, "Error: {}\n", error);
            }
            (None, Some(text)) => {
                let _ = writeln!(out, "{}\n", text);
            }
            (None, None) => {
                let _ = writeln!(out, "No detailed assessment available.\n");
            }
        }
    }

    if let Some(summary) = &report.summary {
        let _ = writeln!(out, "## Summary\n");
        match &summary.error {
            Some(error) => {
                let _ = writeln!(out, "Error: {}", error);
            }
            None => {
                let _ = writeln!(out, "{}", summary.summary);
            }
        }
    }
    out
}

async fn run_extract(cli: &Cli, input: &str, fetch: &FetchArgs) -> anyhow::Result<()> {
    let extractor = WebExtractor::new(fetch.config(), ContentExtractor::default());
    let start = Instant::now();

    let result = if input == "-" {
        if cli.verbose {
            print_step(1, 2, "Reading from stdin");
        }
        let html = fetch_stdin().context("Failed to read from stdin")?;
        if cli.verbose {
            eprintln!("  {} {}", "Size:".dimmed(), format_size(html.len()).bright_white());
        }
        extractor.extract_html(&html, "stdin")
    } else if input.starts_with("http://") || input.starts_with("https://") {
        if cli.verbose {
            print_step(1, 2, &format!("Fetching from {}", input.bright_white().underline()));
        }
        extractor.extract(input).await.context("Failed to fetch URL")?
    } else {
        if cli.verbose {
            print_step(1, 2, &format!("Reading from file {}", input.bright_white()));
        }
        let html = fetch_file(input).await.with_context(|| format!("Failed to read file: {}", input))?;
        if cli.verbose {
            eprintln!("  {} {}", "Size:".dimmed(), format_size(html.len()).bright_white());
        }
        extractor.extract_html(&html, input)
    };

    if cli.verbose {
        print_step(2, 2, "Extracting content");
        print_extraction_details(&result);
        print_timing("Extraction", start.elapsed());
    }

    let output = match cli.format {
        OutputFormat::Text => render_extraction(&result),
        OutputFormat::Json => serde_json::to_string_pretty(&result).context("Failed to serialize result")?,
    };
    write_output(&cli.output, &output)?;

    if let Some(error) = &result.error {
        print_error(error);
        anyhow::bail!("Extraction failed: {}", error);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_evaluate(
    cli: &Cli,
    settings: Settings,
    url: &str,
    criteria_file: Option<&PathBuf>,
    name: Option<&str>,
    model: Option<&str>,
    concurrency: usize,
    summary: bool,
    recommendations: bool,
    fetch: &FetchArgs,
) -> anyhow::Result<()> {
    let mut settings = settings;
    if let Some(model) = model {
        settings.model_name = model.to_string();
    }

    let criteria = match criteria_file {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
            criteria_from_json(&json).with_context(|| format!("Invalid criteria file: {}", path.display()))?
        }
        None => Criterion::defaults(),
    };

    let provider = GeminiClient::from_settings(&settings).context("Failed to create inference client")?;

    if cli.verbose {
        print_info(&format!("Model: {} | Criteria: {}", settings.model_name, criteria.len()));
        print_step(1, 1, &format!("Evaluating {}", url.bright_white().underline()));
    }

    let extractor = WebExtractor::new(fetch.config(), ContentExtractor::default());
    let evaluator = Evaluator::new(extractor, Arc::new(provider), &settings)
        .with_max_concurrency(concurrency)
        .with_summary(summary)
        .with_recommendations(recommendations);

    let start = Instant::now();
    let report = evaluator.evaluate(url, &criteria, name).await.context("Failed to evaluate product")?;

    if let Some(error) = &report.extraction.error {
        print_warning(&format!("Extraction: {}", error));
    }
    if cli.verbose {
        print_scoreboard(&report);
        print_timing("Evaluation", start.elapsed());
    }

    let output = match cli.format {
        OutputFormat::Text => render_report(&report),
        OutputFormat::Json => serde_json::to_string_pretty(&report).context("Failed to serialize report")?,
    };
    write_output(&cli.output, &output)
}

fn run_criteria(cli: &Cli) -> anyhow::Result<()> {
    let criteria = Criterion::defaults();
    let output = match cli.format {
        OutputFormat::Text => {
            let mut out = String::new();
            for criterion in &criteria {
                let _ = writeln!(out, "{} ({}, weight {})", criterion.name, criterion.id, criterion.weight);
                let _ = writeln!(out, "  {}", criterion.description);
            }
            out
        }
        OutputFormat::Json => serde_json::to_string_pretty(&criteria).context("Failed to serialize criteria")?,
    };
    write_output(&cli.output, &output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env().context("Invalid configuration")?;

    init_tracing(cli.verbose, &settings.log_level);

    if cli.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    match &cli.command {
        Command::Extract { input, fetch } => run_extract(&cli, input, fetch).await,
        Command::Evaluate { url, criteria, name, model, concurrency, no_summary, no_recommendations, fetch } => {
            run_evaluate(
                &cli,
                settings,
                url,
                criteria.as_ref(),
                name.as_deref(),
                model.as_deref(),
                *concurrency,
                !no_summary,
                !no_recommendations,
                fetch,
            )
            .await
        }
        Command::Criteria => run_criteria(&cli),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("txt".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("markdown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_render_extraction() {
        let result = ExtractionResult {
            content: "Body".to_string(),
            metadata: BTreeMap::from([
                ("url".to_string(), "https://example.com".to_string()),
                ("features".to_string(), "Fast\nQuiet".to_string()),
            ]),
            error: None,
            strategy: None,
        };

        assert_eq!(render_extraction(&result), "features: Fast; Quiet\nurl: https://example.com\n\nBody\n");
    }

    #[test]
    fn test_cli_parses_evaluate() {
        let cli = Cli::parse_from(["assay", "evaluate", "https://example.com", "--concurrency", "2", "--no-summary"]);
        match cli.command {
            Command::Evaluate { concurrency, no_summary, fetch, .. } => {
                assert_eq!(concurrency, 2);
                assert!(no_summary);
                assert_eq!(fetch.timeout, 30);
            }
            _ => panic!("expected evaluate"),
        }
    }
}
