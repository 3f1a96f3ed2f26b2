//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types used by both
//! extraction strategies and the metadata extractor. They are thin wrappers
//! over `scraper` that report invalid selectors as [`AssayError::HtmlParse`]
//! and expose the handful of traversal helpers the extractors need.
//!
//! # Example
//!
//! ```rust
//! use assay_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <head><title>Widget Pro</title></head>
//!         <body><span class="price">$19.99</span></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! assert_eq!(doc.title(), Some("Widget Pro".to_string()));
//! let price = doc.select_first("span.price").unwrap().unwrap();
//! assert_eq!(price.text(), "$19.99");
//! ```

use std::hash::Hash;

use scraper::{ElementRef, Html, Node, Selector};

use crate::{AssayError, Result};

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// Parsing is lenient and never fails: malformed markup is repaired the
    /// way a browser would repair it.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Gets the underlying `scraper::Html` instance.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Gets the root `<html>` element.
    pub fn root(&self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// Selects all elements matching a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`AssayError::HtmlParse`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first element matching a CSS selector.
    pub fn select_first(&self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Gets the trimmed content of the `<title>` element, if non-empty.
    pub fn title(&self) -> Option<String> {
        let title = self.select_first("title").ok()??;
        let text = title.normalized_text();
        if text.is_empty() { None } else { Some(text) }
    }

    /// Gets the `content` attribute of `<meta name=..>` or `<meta property=..>`.
    pub fn meta_content(&self, name: &str) -> Option<String> {
        for attr in ["name", "property"] {
            let selector = format!("meta[{attr}=\"{name}\"]");
            if let Ok(Some(el)) = self.select_first(&selector)
                && let Some(content) = el.attr("content")
            {
                let content = content.trim();
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }
        None
    }

    /// Gets the `<body>` element.
    pub fn body(&self) -> Option<Element<'_>> {
        self.select_first("body").ok().flatten()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AssayError::HtmlParse(format!("Invalid selector '{selector}': {e}")))
}

/// A single element in a parsed [`Document`].
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the wrapped `scraper` element.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Gets the node id, stable for the lifetime of the document.
    pub fn id(&self) -> impl Hash + Eq + Copy + std::fmt::Debug + use<'a> {
        self.element.id()
    }

    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the raw concatenation of all descendant text nodes.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the descendant text with whitespace runs collapsed and trimmed.
    pub fn normalized_text(&self) -> String {
        collapse_whitespace(&self.text())
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Gets the nearest ancestor element.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(|element| Element { element })
    }

    /// Gets the direct element children.
    pub fn child_elements(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(|element| Element { element }).collect()
    }

    /// Whether any direct child is a text node with visible characters.
    pub fn has_direct_text(&self) -> bool {
        self.element.children().any(|child| match child.value() {
            Node::Text(text) => !text.trim().is_empty(),
            _ => false,
        })
    }

    /// Selects descendant elements using a CSS selector.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(|element| Element { element }).collect())
    }
}

/// Collapses every run of whitespace into a single space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
