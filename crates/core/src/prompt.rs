//! Prompt construction.
//!
//! Builds the bounded product context block, the generic and custom
//! per-criterion prompts, the score-only follow-up prompt and the summary
//! prompt. All lengths are measured in characters, never bytes.

use crate::criteria::Criterion;
use crate::{AssayError, Result};

/// Character budget for product text inside a prompt
pub const MAX_PRODUCT_CHARS: usize = 6000;

/// Appended when text is cut
pub const TRUNCATION_MARKER: &str = " [...]";

/// A partial paragraph is only added when more than this many characters remain
pub const MIN_PARTIAL_CHARS: usize = 100;

/// Placeholders a custom criterion template may use
pub const KNOWN_PLACEHOLDERS: &[&str] = &["product_info", "product_name", "product_url"];

const ANALYSIS_TEMPLATE: &str = "\
You are an expert product evaluator specializing in software tools and services.
Your task is to analyze the provided text about a product and evaluate it based on specific criteria.

Product information:
{product_info}

Evaluation criterion:
{criterion_name}: {criterion_description}

Your goal is to provide a thoughtful analysis of how well this product meets this specific criterion.
Include specific observations, strengths, and weaknesses from the product information.
Be balanced and objective in your assessment.
Structure your response in 2-4 paragraphs.";

const SUMMARY_TEMPLATE: &str = "\
You are an expert product evaluator summarizing the results of a detailed product evaluation.

Product: {product_name}
Overall Score: {overall_score}/10

Criteria Evaluations:
{criteria_evaluations}

Your task is to create a comprehensive summary of this evaluation. The summary should:
1. Start with a clear overall assessment of the product's strengths and weaknesses
2. Highlight the most important findings from each criterion
3. Include specific examples or evidence from the evaluation where relevant
4. End with a clear conclusion about who would benefit most from this product

Create a structured, balanced summary of approximately 300-500 words.
Use headers to organize the content.";

const RECOMMENDATIONS_REQUEST: &str = "\nAlso include a section called 'Recommendations' with 2-3 concrete \
    suggestions for how this product could be improved.";

/// Packs whole paragraphs (split on blank lines) into `max_chars`.
///
/// Text that already fits is returned unchanged. Otherwise paragraphs are
/// appended greedily while they fit with room left for the marker; the first
/// one that does not fit is cut to the remaining budget when more than
/// [`MIN_PARTIAL_CHARS`] remain. The result always ends with
/// [`TRUNCATION_MARKER`] and never exceeds `max_chars` characters.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    let budget = max_chars.saturating_sub(marker_len);
    let mut result = String::new();
    let mut result_len = 0;

    for paragraph in text.split("\n\n") {
        let separator = if result.is_empty() { 0 } else { 2 };
        let paragraph_len = paragraph.chars().count();

        if result_len + separator + paragraph_len <= budget {
            if separator > 0 {
                result.push_str("\n\n");
            }
            result.push_str(paragraph);
            result_len += separator + paragraph_len;
            continue;
        }

        let remaining = max_chars - result_len;
        if remaining > MIN_PARTIAL_CHARS {
            let take = remaining - separator - marker_len;
            let partial: String = paragraph.chars().take(take).collect();
            if separator > 0 {
                result.push_str("\n\n");
            }
            result.push_str(partial.trim_end());
        }
        break;
    }

    result.push_str(TRUNCATION_MARKER);
    result
}

/// Product context block: optional name and URL lines, then the truncated text.
pub fn product_context(text: &str, product_name: Option<&str>, product_url: Option<&str>) -> String {
    let mut info = String::new();
    if let Some(name) = product_name.filter(|n| !n.is_empty()) {
        info.push_str(&format!("Product name: {name}\n"));
    }
    if let Some(url) = product_url.filter(|u| !u.is_empty()) {
        info.push_str(&format!("Product URL: {url}\n"));
    }
    info.push_str("\nExtracted product information:\n");
    info.push_str(&truncate_text(text, MAX_PRODUCT_CHARS));
    info
}

/// The prompt for one criterion's narrative analysis.
///
/// A custom template is rendered with `product_info`, `product_name` (default
/// "the product") and `product_url` (default empty) and otherwise used verbatim.
///
/// # Notes
///
/// A custom template that never references `{product_info}` is not sent as
/// written: a `Product information:` block with the context is appended after
/// it, so the model always sees the product text.
///
/// # Errors
///
/// [`AssayError::PromptFormat`] for an unknown placeholder or unbalanced brace.
pub fn criterion_prompt(
    criterion: &Criterion,
    context: &str,
    product_name: Option<&str>,
    product_url: Option<&str>,
) -> Result<String> {
    let Some(template) = criterion.prompt_template.as_deref().filter(|t| !t.trim().is_empty()) else {
        return render_template(
            ANALYSIS_TEMPLATE,
            &[
                ("product_info", context),
                ("criterion_name", criterion.name.as_str()),
                ("criterion_description", criterion.description.as_str()),
            ],
        );
    };

    let values = [
        ("product_info", context),
        ("product_name", product_name.unwrap_or("the product")),
        ("product_url", product_url.unwrap_or("")),
    ];
    let mut prompt = render_template(template, &values)?;

    if !placeholders(template)?.contains(&"product_info") {
        prompt.push_str("\n\nProduct information:\n");
        prompt.push_str(context);
    }
    Ok(prompt)
}

/// The follow-up prompt that asks only for a 1-10 score.
pub fn score_prompt(criterion_name: &str, product_name: Option<&str>, analysis: &str) -> String {
    let product = product_name.unwrap_or("the product");
    format!(
        "Based on your previous analysis of {product} for the criterion \"{criterion_name}\", suggest a score \
         from 1 to 10, where 1 is extremely poor and 10 is excellent.\n\n\
         Previous analysis:\n{analysis}\n\n\
         Return ONLY the numeric score without explanation."
    )
}

/// The summary prompt around pre-formatted criterion blocks.
pub fn summary_prompt(
    product_name: &str,
    overall_score: Option<f64>,
    criteria_evaluations: &str,
    include_recommendations: bool,
) -> String {
    let score = overall_score.map_or_else(|| "N/A".to_string(), |s| format!("{s:.1}"));
    let mut prompt = SUMMARY_TEMPLATE
        .replace("{product_name}", product_name)
        .replace("{overall_score}", &score)
        .replace("{criteria_evaluations}", criteria_evaluations);

    if include_recommendations {
        prompt.push_str(RECOMMENDATIONS_REQUEST);
    }
    prompt
}

/// Checks that a custom template only uses [`KNOWN_PLACEHOLDERS`] and has balanced braces.
pub fn check_template(template: &str) -> Result<()> {
    for name in placeholders(template)? {
        if !KNOWN_PLACEHOLDERS.contains(&name) {
            return Err(AssayError::PromptFormat(format!("unknown placeholder '{{{name}}}'")));
        }
    }
    Ok(())
}

/// Substitutes `{name}` placeholders; `{{` and `}}` produce literal braces.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    walk_template(template, |piece| {
        match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Placeholder(name) => {
                let (_, value) = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .ok_or_else(|| AssayError::PromptFormat(format!("unknown placeholder '{{{name}}}'")))?;
                out.push_str(value);
            }
        }
        Ok(())
    })?;
    Ok(out)
}

/// Placeholder names referenced by a template, in order.
fn placeholders(template: &str) -> Result<Vec<&str>> {
    let mut names = Vec::new();
    walk_template(template, |piece| {
        if let Piece::Placeholder(name) = piece {
            names.push(name);
        }
        Ok(())
    })?;
    Ok(names)
}

enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn walk_template<'a>(template: &'a str, mut on_piece: impl FnMut(Piece<'a>) -> Result<()>) -> Result<()> {
    let bytes = template.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                on_piece(Piece::Text(&template[start..i]))?;
                on_piece(Piece::Text(&template[i..=i]))?;
                i += 2;
                start = i;
            }
            b'{' => {
                on_piece(Piece::Text(&template[start..i]))?;
                let close = template[i + 1..]
                    .find(['{', '}'])
                    .filter(|&offset| bytes[i + 1 + offset] == b'}')
                    .ok_or_else(|| AssayError::PromptFormat(format!("unclosed '{{' at offset {i}")))?;
                on_piece(Piece::Placeholder(template[i + 1..i + 1 + close].trim()))?;
                i += close + 2;
                start = i;
            }
            b'}' => return Err(AssayError::PromptFormat(format!("unmatched '}}' at offset {i}"))),
            _ => i += 1,
        }
    }

    on_piece(Piece::Text(&template[start..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(count: usize, len: usize) -> String {
        (0..count).map(|i| format!("{i}").repeat(len)).collect::<Vec<_>>().join("\n\n")
    }

    #[test]
    fn test_truncate_short_text_is_identity() {
        let text = paragraphs(3, 50);
        assert_eq!(truncate_text(&text, MAX_PRODUCT_CHARS), text);
    }

    #[test]
    fn test_truncate_respects_budget_and_marks() {
        let text = paragraphs(10, 1000);
        let result = truncate_text(&text, MAX_PRODUCT_CHARS);

        assert!(result.chars().count() <= MAX_PRODUCT_CHARS);
        assert!(result.ends_with(TRUNCATION_MARKER));
        assert!(result.starts_with(&"0".repeat(1000)));
    }

    #[test]
    fn test_truncate_adds_partial_paragraph() {
        let text = format!("{}\n\n{}", "a".repeat(300), "b".repeat(500));
        let result = truncate_text(&text, 600);

        assert_eq!(result.chars().count(), 600);
        assert!(result.contains("\n\nbbb"));
        assert!(result.ends_with("b [...]"));
    }

    #[test]
    fn test_truncate_skips_small_partial() {
        let text = format!("{}\n\n{}", "a".repeat(520), "b".repeat(500));
        let result = truncate_text(&text, 600);

        assert_eq!(result, format!("{} [...]", "a".repeat(520)));
    }

    #[test]
    fn test_truncate_single_long_paragraph() {
        let text = "word ".repeat(2000);
        let result = truncate_text(&text, 1000);
        assert!(result.chars().count() <= 1000);
        assert!(result.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "é".repeat(7000);
        let result = truncate_text(&text, MAX_PRODUCT_CHARS);
        assert!(result.chars().count() <= MAX_PRODUCT_CHARS);
        assert!(result.len() > MAX_PRODUCT_CHARS);
    }

    #[test]
    fn test_product_context() {
        let context = product_context("Body text", Some("Widget"), Some("https://example.com"));
        assert_eq!(
            context,
            "Product name: Widget\nProduct URL: https://example.com\n\nExtracted product information:\nBody text"
        );

        let bare = product_context("Body text", None, None);
        assert_eq!(bare, "\nExtracted product information:\nBody text");
    }

    #[test]
    fn test_generic_prompt_mentions_criterion() {
        let criterion = Criterion::new("ux", "Usability", "Is it easy?", 2);
        let prompt = criterion_prompt(&criterion, "CONTEXT", None, None).unwrap();
        assert!(prompt.contains("Usability: Is it easy?"));
        assert!(prompt.contains("CONTEXT"));
        assert!(prompt.ends_with("2-4 paragraphs."));
    }

    #[test]
    fn test_custom_template_is_used_verbatim() {
        let criterion = Criterion::new("ux", "Usability", "Is it easy?", 2)
            .with_prompt_template("Judge {product_name} at {product_url}: {{strict}}\n{product_info}");
        let prompt = criterion_prompt(&criterion, "CONTEXT", None, Some("https://x.test")).unwrap();
        assert_eq!(prompt, "Judge the product at https://x.test: {strict}\nCONTEXT");
    }

    #[test]
    fn test_custom_template_without_info_gets_context() {
        let criterion = Criterion::new("sec", "Security", "Safe?", 3).with_prompt_template("Evaluate security.");
        let prompt = criterion_prompt(&criterion, "CONTEXT", Some("Widget"), None).unwrap();
        assert_eq!(prompt, "Evaluate security.\n\nProduct information:\nCONTEXT");
    }

    #[test]
    fn test_template_errors() {
        assert!(matches!(check_template("Rate {colour}"), Err(AssayError::PromptFormat(_))));
        assert!(matches!(check_template("Rate {product_name"), Err(AssayError::PromptFormat(_))));
        assert!(matches!(check_template("Rate product_name}"), Err(AssayError::PromptFormat(_))));
        assert!(check_template("Rate {product_name} {{ok}}").is_ok());
    }

    #[test]
    fn test_score_prompt() {
        let prompt = score_prompt("Pricing", None, "Fair value.");
        assert!(prompt.contains("the product for the criterion \"Pricing\""));
        assert!(prompt.contains("Fair value."));
        assert!(prompt.ends_with("Return ONLY the numeric score without explanation."));
    }

    #[test]
    fn test_summary_prompt() {
        let prompt = summary_prompt("Widget", Some(7.24), "## Pricing: 8/10\n", true);
        assert!(prompt.contains("Product: Widget\nOverall Score: 7.2/10"));
        assert!(prompt.contains("## Pricing: 8/10"));
        assert!(prompt.contains("'Recommendations'"));

        let plain = summary_prompt("Widget", None, "", false);
        assert!(plain.contains("Overall Score: N/A/10"));
        assert!(!plain.contains("Recommendations"));
    }
}
