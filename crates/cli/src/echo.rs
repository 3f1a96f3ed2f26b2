use std::time::Duration;

use assay_core::{EvaluationReport, ExtractionResult};
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Assay".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Score product pages against weighted criteria\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print timing information with color coding
pub fn print_timing(label: &str, duration: Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);

    if ms < 1000.0 {
        eprintln!("  {} {:>9.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 10_000.0 {
        eprintln!("  {} {:>9.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>9.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Print extraction details summary
pub fn print_extraction_details(result: &ExtractionResult) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    if let Some(strategy) = result.strategy {
        eprintln!("  {} {}", "Strategy:".dimmed(), format!("{:?}", strategy).bright_white());
    }
    eprintln!(
        "  {} {}",
        "Characters:".dimmed(),
        result.content.chars().count().to_string().bright_white()
    );
    for (key, value) in &result.metadata {
        let first_line = value.lines().next().unwrap_or_default();
        eprintln!("  {} {}", format!("{}:", key).dimmed(), first_line.bright_white());
    }
    eprintln!();
}

/// Print per-criterion scores and the overall score
pub fn print_scoreboard(report: &EvaluationReport) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Scores".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    for ce in &report.evaluation.criterion_evaluations {
        let name = format!("{:<24}", ce.criterion.name);
        let weight = format!("x{}", ce.criterion.weight);
        let error = report.assessments.get(&ce.criterion.id).and_then(|a| a.error.as_deref());
        match (ce.score, error) {
            (Some(score), _) => {
                let score = format!("{}/10", score);
                eprintln!("  {} {:>5} {}", name.bright_white(), score.green(), weight.dimmed())
            }
            (None, Some(error)) => eprintln!("  {} {:>5} {}", name.bright_white(), "err".red(), error.dimmed()),
            (None, None) => eprintln!("  {} {:>5} {}", name.bright_white(), "N/A".yellow(), weight.dimmed()),
        }
    }

    match report.overall_score {
        Some(score) => eprintln!("\n  {} {}\n", "Overall:".bold(), format!("{:.1}/10", score).bold().bright_green()),
        None => eprintln!("\n  {} {}\n", "Overall:".bold(), "N/A".bold().yellow()),
    }
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
