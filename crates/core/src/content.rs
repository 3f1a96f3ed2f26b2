//! Body text extraction.
//!
//! [`ContentExtractor`] turns raw HTML into readable text with two
//! strategies:
//!
//! 1. **Primary**: boilerplate removal. The markup is cleaned (scripts,
//!    comments, hidden nodes, comment sections), candidate containers are
//!    scored, scores propagate to ancestors, and the best container plus its
//!    qualifying siblings is rendered to paragraph text. Results shorter than
//!    `min_extracted_size` are discarded.
//! 2. **Fallback**: tag stripping. Script, style, nav, footer and header
//!    elements are skipped, every remaining text node is flattened, whitespace
//!    is collapsed and non-empty lines are joined.
//!
//! If the fallback still yields fewer than `min_content_size` characters
//! the extraction fails with [`AssayError::InsufficientContent`].

use std::collections::HashMap;

use scraper::ElementRef;
use serde::Serialize;

use crate::parse::{Document, Element, collapse_whitespace};
use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::scoring::{ScoreConfig, calculate_score, link_density};
use crate::{AssayError, Result};

/// Tags considered as content containers by the primary strategy
const CANDIDATE_TAGS: &str = "article, main, section, div, p, td, pre, blockquote";

/// Tags rendered as their own paragraph
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "dl", "dt", "dd",
    "blockquote", "pre", "table", "thead", "tbody", "tfoot", "figure", "figcaption", "header", "footer", "aside",
    "address", "details", "summary",
];

/// Tags whose text is never rendered by the primary strategy
const SKIP_TAGS: &[&str] =
    &["script", "style", "noscript", "template", "button", "select", "option", "input", "textarea"];

/// Tags removed by the fallback strategy
const FALLBACK_STRIP_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

/// Configuration for body text extraction
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Primary results shorter than this (in characters) trigger the fallback
    pub min_extracted_size: usize,
    /// Final results shorter than this fail the extraction
    pub min_content_size: usize,
    /// Keep table rows in the primary output
    pub include_tables: bool,
    /// Keep user comment sections in the primary output
    pub include_comments: bool,
    /// Minimum score for the top candidate
    pub min_score: f64,
    /// Maximum candidate elements to score (0 = unlimited)
    pub max_elements: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_extracted_size: 500,
            min_content_size: 100,
            include_tables: true,
            include_comments: false,
            min_score: 10.0,
            max_elements: 2000,
        }
    }
}

/// Which strategy produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Primary,
    Fallback,
}

/// Successfully extracted body text
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub strategy: Strategy,
}

/// Turns raw HTML into clean body text.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    config: ContentConfig,
}

impl ContentExtractor {
    pub fn new(config: ContentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// Runs the primary strategy, then the fallback when needed.
    ///
    /// # Errors
    ///
    /// Returns [`AssayError::InsufficientContent`] when the fallback result is
    /// still below `min_content_size` characters.
    pub fn extract(&self, html: &str) -> Result<ExtractedText> {
        if let Some(text) = self.primary_text(html) {
            tracing::debug!(chars = text.chars().count(), "primary extraction accepted");
            return Ok(ExtractedText { text, strategy: Strategy::Primary });
        }

        let text = self.fallback_text(html);
        let chars = text.chars().count();
        tracing::debug!(chars, "using fallback extraction");

        if chars < self.config.min_content_size {
            return Err(AssayError::InsufficientContent);
        }

        Ok(ExtractedText { text, strategy: Strategy::Fallback })
    }

    /// Boilerplate-removal extraction.
    ///
    /// Returns `None` when no candidate scores above `min_score` or the
    /// rendered text is shorter than `min_extracted_size`.
    pub fn primary_text(&self, html: &str) -> Option<String> {
        let cleaned = preprocess_html(
            html,
            &PreprocessConfig {
                include_tables: self.config.include_tables,
                include_comments: self.config.include_comments,
                remove_hidden: true,
            },
        );
        let doc = Document::parse(&cleaned);
        let score_config = ScoreConfig::default();

        let mut scores = HashMap::new();
        let mut order = Vec::new();
        let limit = if self.config.max_elements == 0 { usize::MAX } else { self.config.max_elements };
        let candidates = doc.select(CANDIDATE_TAGS).ok()?;

        for element in candidates.into_iter().take(limit) {
            let tag = element.tag_name();
            let text_len = element.normalized_text().chars().count();
            if text_len < 25 || (!matches!(tag.as_str(), "article" | "main" | "section") && text_len < 50) {
                continue;
            }

            let score = calculate_score(&element, &score_config);
            scores
                .entry(element.id())
                .or_insert_with(|| {
                    order.push(element.id());
                    (element, 0.0)
                })
                .1 += score;

            // parent gets half, grandparent a third
            let mut ancestor = element.parent();
            for divisor in [2.0, 3.0] {
                let Some(node) = ancestor else { break };
                if node.tag_name() == "body" || node.tag_name() == "html" {
                    break;
                }
                let entry = scores.entry(node.id()).or_insert_with(|| {
                    order.push(node.id());
                    (node, calculate_score(&node, &score_config))
                });
                entry.1 += score / divisor;
                ancestor = node.parent();
            }
        }

        // ties go to the candidate seen first
        let (top, top_score) = order.iter().filter_map(|id| scores.get(id).copied()).reduce(|best, next| {
            if next.1 > best.1 { next } else { best }
        })?;

        if top_score < self.config.min_score {
            tracing::debug!(top_score, "no readable candidate");
            return None;
        }

        let selected = with_siblings(top, top_score, |el| scores.get(&el.id()).map(|(_, score)| *score));
        let text = render_text(&selected, self.config.include_tables);

        if text.chars().count() < self.config.min_extracted_size { None } else { Some(text) }
    }

    /// Tag-stripping extraction. Never fails; may return an empty string.
    pub fn fallback_text(&self, html: &str) -> String {
        let doc = Document::parse(html);
        let mut pieces = Vec::new();
        collect_text_nodes(doc.root().element_ref(), &mut pieces);

        pieces
            .iter()
            .flat_map(|piece| piece.lines())
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The top candidate plus siblings that look like part of the same content,
/// in document order.
fn with_siblings<'a>(
    top: Element<'a>,
    top_score: f64,
    score_of: impl Fn(&Element<'a>) -> Option<f64>,
) -> Vec<Element<'a>> {
    let Some(parent) = top.parent() else { return vec![top] };
    let threshold = (top_score * 0.2).max(10.0);

    parent
        .child_elements()
        .into_iter()
        .filter(|sibling| {
            if sibling.id() == top.id() || score_of(sibling).is_some_and(|score| score >= threshold) {
                return true;
            }
            sibling.tag_name() == "p"
                && sibling.normalized_text().chars().count() > 80
                && link_density(sibling) < 0.25
        })
        .collect()
}

/// Renders elements as paragraphs separated by blank lines.
fn render_text(elements: &[Element<'_>], include_tables: bool) -> String {
    let mut blocks = TextBlocks::default();
    for element in elements {
        blocks.flush();
        walk(element.element_ref(), &mut blocks, include_tables);
        blocks.flush();
    }
    blocks.finish()
}

#[derive(Default)]
struct TextBlocks {
    blocks: Vec<String>,
    current: String,
}

impl TextBlocks {
    fn flush(&mut self) {
        let paragraph = self
            .current
            .split('\n')
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if !paragraph.is_empty() {
            self.blocks.push(paragraph);
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.flush();
        self.blocks.join("\n\n")
    }
}

fn walk(element: ElementRef<'_>, out: &mut TextBlocks, include_tables: bool) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.current.push_str(text);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else { continue };
        let tag = child_el.value().name();

        if SKIP_TAGS.contains(&tag) {
            continue;
        }
        match tag {
            "br" => out.current.push('\n'),
            "table" if !include_tables => {}
            "tr" => {
                out.flush();
                let cells: Vec<String> = child_el
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                    .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                    .filter(|cell| !cell.is_empty())
                    .collect();
                if !cells.is_empty() {
                    out.blocks.push(cells.join(" | "));
                }
            }
            _ if BLOCK_TAGS.contains(&tag) => {
                out.flush();
                walk(child_el, out, include_tables);
                out.flush();
            }
            _ => walk(child_el, out, include_tables),
        }
    }
}

fn collect_text_nodes(element: ElementRef<'_>, pieces: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            pieces.push(text.to_string());
        } else if let Some(child_el) = ElementRef::wrap(child)
            && !FALLBACK_STRIP_TAGS.contains(&child_el.value().name())
        {
            collect_text_nodes(child_el, pieces);
        }
    }
}
