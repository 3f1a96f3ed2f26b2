use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::parse::Document;

/// Price candidates, most specific first
pub const PRICE_SELECTORS: &[&str] =
    &["span.price", ".price", ".product-price", "span[itemprop='price']", "*[itemprop='price']"];

/// Product name candidates, most specific first
pub const PRODUCT_NAME_SELECTORS: &[&str] =
    &["h1.product-title", "h1.product-name", "h1[itemprop='name']", "*[itemprop='name']", "h1.entry-title"];

/// Containers whose list items describe product features
pub const FEATURE_SELECTORS: &[&str] = &[
    "div.features",
    "section.features",
    "div.product-features",
    "ul.features",
    "div#features",
    "section#features",
];

static PRICE_NOISE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d.,]").expect("valid price pattern"));

/// Structured fields pulled from a product page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<String>,
}

impl Metadata {
    /// Field name to value mapping. Absent fields are omitted; `url` is always present.
    pub fn into_map(self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("url".to_string(), self.url);

        let fields = [
            ("title", self.title),
            ("description", self.description),
            ("price", self.price),
            ("product_name", self.product_name),
            ("features", self.features),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        }
        map
    }
}

/// Strips everything but digits, commas and periods.
pub fn clean_price(raw: &str) -> String {
    PRICE_NOISE.replace_all(raw, "").into_owned()
}

/// Pulls [`Metadata`] from raw HTML with ordered candidate selectors.
///
/// Each field takes the first candidate with non-empty content and skips the
/// rest. Extraction never fails: an invalid selector is logged and treated as
/// a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str, url: &str) -> Metadata {
        let doc = Document::parse(html);
        let json_ld = product_json_ld(&doc);

        Metadata {
            url: url.to_string(),
            title: self.extract_title(&doc),
            description: self.extract_description(&doc),
            price: self.extract_price(&doc).or_else(|| {
                json_ld
                    .as_ref()
                    .and_then(json_ld_price)
                    .map(|price| clean_price(&price))
                    .filter(|price| !price.is_empty())
            }),
            product_name: self
                .extract_product_name(&doc)
                .or_else(|| json_ld.as_ref().and_then(|v| json_ld_str(v, "name"))),
            features: self.extract_features(&doc),
        }
    }

    /// Title with priority fallback:
    /// 1. `<title>` element
    /// 2. Open Graph `og:title`
    /// 3. Twitter `twitter:title`
    pub fn extract_title(&self, doc: &Document) -> Option<String> {
        doc.title().or_else(|| doc.meta_content("og:title")).or_else(|| doc.meta_content("twitter:title"))
    }

    /// Description from meta `description`, then `og:description`.
    pub fn extract_description(&self, doc: &Document) -> Option<String> {
        doc.meta_content("description").or_else(|| doc.meta_content("og:description"))
    }

    /// First price candidate whose cleaned value is non-empty.
    pub fn extract_price(&self, doc: &Document) -> Option<String> {
        PRICE_SELECTORS.iter().find_map(|selector| {
            let text = first_text(doc, selector)?;
            let price = clean_price(&text);
            if price.is_empty() { None } else { Some(price) }
        })
    }

    pub fn extract_product_name(&self, doc: &Document) -> Option<String> {
        PRODUCT_NAME_SELECTORS.iter().find_map(|selector| first_text(doc, selector))
    }

    /// List items of the first features container that has any, one per line.
    pub fn extract_features(&self, doc: &Document) -> Option<String> {
        let container = FEATURE_SELECTORS.iter().find_map(|selector| select_first_logged(doc, selector))?;
        let items: Vec<String> = container
            .select("li")
            .unwrap_or_default()
            .iter()
            .map(|li| li.normalized_text())
            .filter(|text| !text.is_empty())
            .collect();
        if items.is_empty() { None } else { Some(items.join("\n")) }
    }
}

fn select_first_logged<'a>(doc: &'a Document, selector: &str) -> Option<crate::parse::Element<'a>> {
    match doc.select_first(selector) {
        Ok(element) => element,
        Err(e) => {
            tracing::warn!(selector, error = %e, "skipping metadata selector");
            None
        }
    }
}

fn first_text(doc: &Document, selector: &str) -> Option<String> {
    let text = select_first_logged(doc, selector)?.normalized_text();
    if text.is_empty() { None } else { Some(text) }
}

/// First JSON-LD object typed `Product`, looking inside `@graph` arrays too.
fn product_json_ld(doc: &Document) -> Option<serde_json::Value> {
    let scripts = doc.select("script[type=\"application/ld+json\"]").ok()?;
    scripts.iter().find_map(|script| {
        let value = serde_json::from_str::<serde_json::Value>(script.text().trim()).ok()?;
        find_product(&value).cloned()
    })
}

fn find_product(value: &serde_json::Value) -> Option<&serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items.iter().find_map(find_product),
        serde_json::Value::Object(obj) => {
            let is_product = match obj.get("@type") {
                Some(serde_json::Value::String(kind)) => kind == "Product",
                Some(serde_json::Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("Product")),
                _ => false,
            };
            if is_product { Some(value) } else { obj.get("@graph").and_then(find_product) }
        }
        _ => None,
    }
}

fn json_ld_str(value: &serde_json::Value, key: &str) -> Option<String> {
    let text = value.get(key)?.as_str()?.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// `offers.price` as a string or number; `offers` may be an object or an array.
fn json_ld_price(product: &serde_json::Value) -> Option<String> {
    let offers = product.get("offers")?;
    let offer = if let Some(list) = offers.as_array() { list.first()? } else { offers };
    match offer.get("price")? {
        serde_json::Value::String(price) => Some(price.clone()),
        serde_json::Value::Number(price) => Some(price.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PRODUCT_PAGE: &str = r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Widget Pro | Widget Co</title>
            <meta name="description" content="The last widget you will ever need.">
            <meta property="og:title" content="Widget Pro (OG)">
        </head>
        <body>
            <h1 class="product-title">Widget Pro</h1>
            <div class="product-price"><span class="price">USD $1,299.00</span></div>
            <div class="features">
                <ul>
                    <li>Aluminium body</li>
                    <li>  </li>
                    <li>Replaceable battery</li>
                </ul>
            </div>
        </body>
        </html>
    "#;

    #[test]
    fn test_extract_all_fields() {
        let metadata = MetadataExtractor::new().extract(PRODUCT_PAGE, "https://example.com/widget");

        assert_eq!(metadata.url, "https://example.com/widget");
        assert_eq!(metadata.title.as_deref(), Some("Widget Pro | Widget Co"));
        assert_eq!(metadata.description.as_deref(), Some("The last widget you will ever need."));
        assert_eq!(metadata.price.as_deref(), Some("1,299.00"));
        assert_eq!(metadata.product_name.as_deref(), Some("Widget Pro"));
        assert_eq!(metadata.features.as_deref(), Some("Aluminium body\nReplaceable battery"));
    }

    #[test]
    fn test_price_first_match_wins() {
        let html = r#"<body><div class="price">€ 10,00</div><span class="price">$25.50</span></body>"#;
        let metadata = MetadataExtractor::new().extract(html, "https://example.com");
        assert_eq!(metadata.price.as_deref(), Some("25.50"));
    }

    #[test]
    fn test_price_skips_candidates_without_digits() {
        let html = r#"<body><span class="price">Call us</span><span itemprop="price">19.99</span></body>"#;
        let metadata = MetadataExtractor::new().extract(html, "https://example.com");
        assert_eq!(metadata.price.as_deref(), Some("19.99"));
    }

    #[rstest]
    #[case("$19.99", "19.99")]
    #[case("USD 1,299.00", "1,299.00")]
    #[case("Price: 42 EUR", "42")]
    #[case("free", "")]
    fn test_clean_price(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(clean_price(raw), expected);
    }

    #[test]
    fn test_title_falls_back_to_og() {
        let html = r#"<head><meta property="og:title" content="OG Widget"></head><body></body>"#;
        let metadata = MetadataExtractor::new().extract(html, "https://example.com");
        assert_eq!(metadata.title.as_deref(), Some("OG Widget"));
    }

    #[test]
    fn test_description_falls_back_to_og() {
        let html = r#"<head><meta property="og:description" content="From OG"></head>"#;
        let metadata = MetadataExtractor::new().extract(html, "https://example.com");
        assert_eq!(metadata.description.as_deref(), Some("From OG"));
    }

    #[test]
    fn test_features_stop_at_first_container() {
        let html = r#"
            <div class="features"><p>No list here</p></div>
            <section id="features"><ul><li>Fast</li><li>Quiet</li></ul></section>
        "#;
        let metadata = MetadataExtractor::new().extract(html, "https://example.com");
        assert_eq!(metadata.features, None);
    }

    #[test]
    fn test_json_ld_product_fallback() {
        let html = r#"
            <head><script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage", "name": "Shop"},
                {"@type": "Product", "name": "Widget Mini", "offers": [{"price": 9.5}]}
            ]}
            </script></head><body></body>
        "#;
        let metadata = MetadataExtractor::new().extract(html, "https://example.com");
        assert_eq!(metadata.product_name.as_deref(), Some("Widget Mini"));
        assert_eq!(metadata.price.as_deref(), Some("9.5"));
    }

    #[test]
    fn test_empty_page_keeps_url() {
        let metadata = MetadataExtractor::new().extract("", "https://example.com/empty");
        let map = metadata.into_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("url").map(String::as_str), Some("https://example.com/empty"));
    }
}
