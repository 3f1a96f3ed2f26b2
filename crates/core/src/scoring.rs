use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Class/ID fragments that suggest an element holds the page's main text
static POSITIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|description|details|entry|main|overview|post|product|story|text)")
        .expect("valid positive pattern")
});

/// Class/ID fragments that suggest boilerplate
static NEGATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|cart|combx|comment|cookie|disqus|extra|foot|header|menu|modal|nav|newsletter|related|promo|share|shoutbox|sidebar|social|sponsor|ad-break|pagination|pager|popup|widget)",
    )
    .expect("valid negative pattern")
});

/// Weights for the candidate scoring heuristic
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Bonus for a positive class/ID match
    pub positive_weight: f64,
    /// Penalty for a negative class/ID match
    pub negative_weight: f64,
    /// Cap on the points earned from text length
    pub max_length_points: f64,
    /// Cap on the points earned from commas
    pub max_comma_points: f64,
    /// Characters per length point
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_length_points: 3.0,
            max_comma_points: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Base score from the tag alone.
///
/// Containers that usually wrap prose score high, list and heading tags
/// score low, navigation chrome scores lowest.
pub fn base_tag_score(tag: &str) -> f64 {
    match tag {
        "article" | "main" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "pre" | "p" => 0.0,
        "form" | "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" | "aside" => -5.0,
        _ => 0.0,
    }
}

/// Class/ID adjustment: ids are checked before classes, positive before negative.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let mut names = Vec::new();
    if let Some(id) = element.attr("id") {
        names.push(id);
    }
    if let Some(class) = element.attr("class") {
        names.extend(class.split_whitespace());
    }

    for name in names {
        if POSITIVE_PATTERN.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE_PATTERN.is_match(name) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Points for prose-like text: length and comma count, each capped.
pub fn content_density_score(text: &str, config: &ScoreConfig) -> f64 {
    let length_points = ((text.chars().count() / config.chars_per_point.max(1)) as f64).min(config.max_length_points);
    let comma_points = (text.matches(',').count() as f64).min(config.max_comma_points);
    length_points + comma_points
}

/// Ratio of link text characters to all text characters (0.0 to 1.0).
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.normalized_text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_length: usize = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.normalized_text().chars().count())
        .sum();

    (link_length as f64 / text_length as f64).min(1.0)
}

/// Final candidate score.
///
/// `(base + class weight + density) * (1 - link density)`; the link penalty
/// is halved for elements with a positive class/ID or more than 500
/// characters of text.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let text = element.normalized_text();
    let class_weight = class_id_weight(element, config);
    let raw = base_tag_score(&element.tag_name()) + class_weight + content_density_score(&text, config);

    let density = link_density(element);
    let penalty = if class_weight > 0.0 || text.chars().count() > 500 { density * 0.5 } else { density };

    raw * (1.0 - penalty)
}
