use std::sync::LazyLock;

use lol_html::html_content::Element as RewriteElement;
use lol_html::{HtmlRewriter, Settings, doc_comments, element};
use regex::Regex;

/// Tags that never carry readable product text.
const NOISE_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "canvas", "template", "object", "embed"];

static HIDDEN_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("valid hidden pattern"));

static COMMENT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(comments?|comment-list|commentlist|comments-area|disqus_thread|reviews-comments|respond)$")
        .expect("valid comment pattern")
});

/// Configuration for HTML preprocessing before primary extraction
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Keep `<table>` markup so tabular specs survive extraction
    pub include_tables: bool,
    /// Keep user comment sections (`#comments`, `.comment-list`, ...)
    pub include_comments: bool,
    /// Drop elements hidden with inline styles or the `hidden` attribute
    pub remove_hidden: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { include_tables: true, include_comments: false, remove_hidden: true }
    }
}

fn is_comment_section(el: &RewriteElement<'_, '_>) -> bool {
    let id_match = el.get_attribute("id").is_some_and(|id| COMMENT_SECTION.is_match(id.trim()));
    let class_match = el
        .get_attribute("class")
        .is_some_and(|class| class.split_whitespace().any(|name| COMMENT_SECTION.is_match(name)));
    id_match || class_match
}

fn is_hidden(el: &RewriteElement<'_, '_>) -> bool {
    el.has_attribute("hidden")
        || el.get_attribute("aria-hidden").is_some_and(|v| v.eq_ignore_ascii_case("true"))
        || el.get_attribute("style").is_some_and(|style| HIDDEN_STYLE.is_match(&style))
}

/// Strip markup that cannot contribute readable text.
///
/// Removes noise tags, HTML comments, hidden elements and (unless asked to
/// keep them) comment sections and tables. On a rewriter failure the input
/// is returned unchanged.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut output = Vec::with_capacity(html.len());
    let include_tables = config.include_tables;
    let include_comments = config.include_comments;
    let remove_hidden = config.remove_hidden;

    let noise_selector = NOISE_TAGS.join(", ");
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!(noise_selector, |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", move |el| {
                    if (!include_tables && el.tag_name() == "table")
                        || (!include_comments && is_comment_section(el))
                        || (remove_hidden && is_hidden(el))
                    {
                        el.remove();
                    }
                    Ok(())
                }),
            ],
            document_content_handlers: vec![doc_comments!(|c| {
                c.remove();
                Ok(())
            })],
            ..Default::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        tracing::debug!("html rewriter failed, using raw markup");
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { String::from_utf8_lossy(&output).into_owned() }
}
