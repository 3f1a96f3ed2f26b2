use serde::{Deserialize, Serialize};

use crate::prompt::check_template;
use crate::{AssayError, Result};

/// A named, weighted dimension of product evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Importance multiplier, at least 1
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Custom prompt; may reference `{product_info}`, `{product_name}` and `{product_url}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

fn default_weight() -> u32 {
    1
}

impl Criterion {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>, weight: u32) -> Self {
        Self { id: id.into(), name: name.into(), description: description.into(), weight, prompt_template: None }
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    /// Checks the field constraints once, before any analysis runs.
    ///
    /// # Errors
    ///
    /// [`AssayError::Config`] for an empty id or name or a zero weight,
    /// [`AssayError::PromptFormat`] for a template with unknown placeholders or
    /// unbalanced braces.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AssayError::Config("criterion id must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(AssayError::Config(format!("criterion '{}' has an empty name", self.id)));
        }
        if self.weight < 1 {
            return Err(AssayError::Config(format!("criterion '{}' must have a weight of at least 1", self.id)));
        }
        if let Some(template) = &self.prompt_template {
            check_template(template)?;
        }
        Ok(())
    }

    /// The default evaluation criteria.
    pub fn defaults() -> Vec<Criterion> {
        DEFAULT_CRITERIA
            .iter()
            .map(|(id, name, description, weight, template)| {
                Criterion::new(*id, *name, *description, *weight).with_prompt_template(*template)
            })
            .collect()
    }
}

/// Loads criteria from a JSON array and validates each one.
pub fn criteria_from_json(json: &str) -> Result<Vec<Criterion>> {
    let criteria: Vec<Criterion> = serde_json::from_str(json)?;
    for criterion in &criteria {
        criterion.validate()?;
    }
    Ok(criteria)
}

const DEFAULT_CRITERIA: &[(&str, &str, &str, u32, &str)] = &[
    (
        "usability",
        "Usability",
        "How easy is the product to use? Consider the learning curve, user interface, and overall user experience.",
        3,
        "Evaluate the usability of this product. Consider user interface design, learning curve, documentation, \
         and overall user experience. Provide specific strengths and weaknesses based on the available information.",
    ),
    (
        "performance",
        "Performance",
        "How well does the product perform its intended functions? Consider speed, efficiency, and resource usage.",
        3,
        "Assess the performance characteristics of this product. Consider factors like speed, efficiency, \
         scalability, and resource usage. Identify any performance limitations or strengths mentioned in the \
         documentation or reviews.",
    ),
    (
        "documentation",
        "Documentation",
        "How comprehensive and helpful is the product's documentation?",
        2,
        "Evaluate the quality and comprehensiveness of this product's documentation. Consider factors like \
         clarity, completeness, examples, tutorials, and accessibility. Identify strengths and gaps in the \
         documentation.",
    ),
    (
        "community-support",
        "Community & Support",
        "What level of community engagement and official support is available?",
        2,
        "Assess the community and support ecosystem around this product. Consider factors like official support \
         channels, response times, community size, forum activity, third-party resources, and overall \
         helpfulness. Identify the strengths and limitations of the support available.",
    ),
    (
        "integration",
        "Integration",
        "How easily does the product integrate with other tools and platforms?",
        2,
        "Evaluate how well this product integrates with other tools and platforms. Consider APIs, webhooks, \
         plugins, extensibility, and compatibility with common technologies. Identify specific integrations \
         mentioned and any integration limitations.",
    ),
    (
        "pricing",
        "Pricing",
        "Is the pricing model fair and competitive for the value provided?",
        3,
        "Assess the pricing model and value proposition of this product. Consider factors like pricing \
         structure, tiers, free plans, pricing compared to competitors, and overall value for money. Identify \
         any limitations or benefits of the pricing approach.",
    ),
    (
        "security",
        "Security",
        "How secure is the product? Consider data protection, compliance, and security features.",
        3,
        "Evaluate the security aspects of this product. Consider data protection measures, compliance \
         certifications, encryption, authentication, authorization controls, and security history. Identify \
         specific security features or potential concerns.",
    ),
    (
        "scalability",
        "Scalability",
        "How well does the product scale with increased usage or load?",
        2,
        "Assess how well this product scales as usage grows. Consider performance under load, architectural \
         limitations, handling of large data volumes, and documented scaling capabilities. Identify any scaling \
         limitations or advantages mentioned.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = Criterion::defaults();
        assert_eq!(defaults.len(), 8);
        assert_eq!(defaults.iter().map(|c| c.weight).sum::<u32>(), 20);
        assert!(defaults.iter().all(|c| c.validate().is_ok()));
        assert_eq!(defaults[3].name, "Community & Support");
    }

    #[test]
    fn test_validate_rejects_zero_weight() {
        let criterion = Criterion::new("x", "X", "desc", 0);
        assert!(matches!(criterion.validate(), Err(AssayError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let criterion = Criterion::new("  ", "X", "desc", 1);
        assert!(matches!(criterion.validate(), Err(AssayError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_placeholder() {
        let criterion = Criterion::new("x", "X", "desc", 1).with_prompt_template("Rate {product_colour}");
        assert!(matches!(criterion.validate(), Err(AssayError::PromptFormat(_))));
    }

    #[test]
    fn test_from_json_defaults_weight() {
        let json = r#"[{"id": "ux", "name": "UX", "description": "Is it pleasant?"}]"#;
        let criteria = criteria_from_json(json).unwrap();
        assert_eq!(criteria[0].weight, 1);
        assert_eq!(criteria[0].prompt_template, None);
    }

    #[test]
    fn test_from_json_validates() {
        let json = r#"[{"id": "ux", "name": "UX", "description": "", "weight": 0}]"#;
        assert!(criteria_from_json(json).is_err());
    }
}
