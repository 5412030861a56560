//! Accessibility engine output.
//!
//! The engine is a black box; Astra only relies on the three ordered
//! collections and the handful of per-violation fields it renders. Every
//! other field is kept in `extra` so the result can be forwarded verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    #[serde(default)]
    pub passes: Vec<Violation>,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub incomplete: Vec<Violation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuditResult {
    /// Number of violations whose impact is at or above `threshold`.
    /// Violations without an impact are counted as minor.
    pub fn violations_at_or_above(&self, threshold: Impact) -> usize {
        self.violations
            .iter()
            .filter(|v| v.impact.unwrap_or(Impact::Minor) >= threshold)
            .count()
    }
}

/// A rule result. Used for passes and incomplete checks too, where
/// `impact` is usually null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub impact: Option<Impact>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help_url: String,
    #[serde(default)]
    pub nodes: Vec<AffectedNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedNode {
    /// Selector path; nested arrays appear for iframes and shadow roots.
    #[serde(default)]
    pub target: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AffectedNode {
    /// The selector used to re-locate the element in the page, when the
    /// first target entry is a plain selector string.
    pub fn primary_selector(&self) -> Option<&str> {
        self.target.first().and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Impact::Minor => "minor",
            Impact::Moderate => "moderate",
            Impact::Serious => "serious",
            Impact::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AXE_JSON: &str = r#"{
        "testEngine": {"name": "axe-core", "version": "4.8.2"},
        "url": "https://example.com/",
        "passes": [{"id": "document-title", "impact": null, "nodes": []}],
        "violations": [{
            "id": "image-alt",
            "description": "Ensures <img> elements have alternate text",
            "impact": "critical",
            "help": "Images must have alternate text",
            "helpUrl": "https://dequeuniversity.com/rules/axe/4.8/image-alt",
            "tags": ["wcag2a"],
            "nodes": [{
                "target": ["img.hero"],
                "html": "<img class=\"hero\" src=\"a.png\">",
                "failureSummary": "Fix any of the following"
            }]
        }],
        "incomplete": []
    }"#;

    #[test]
    fn unknown_fields_are_preserved() {
        let result: AuditResult = serde_json::from_str(AXE_JSON).expect("parse axe output");
        assert!(result.extra.contains_key("testEngine"));
        let violation = &result.violations[0];
        assert_eq!(violation.impact, Some(Impact::Critical));
        assert!(violation.extra.contains_key("tags"));
        assert_eq!(violation.nodes[0].primary_selector(), Some("img.hero"));
        assert!(violation.nodes[0].extra.contains_key("html"));

        let original: Value = serde_json::from_str(AXE_JSON).expect("parse value");
        let round: Value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(round["testEngine"], original["testEngine"]);
        assert_eq!(round["violations"][0]["tags"], original["violations"][0]["tags"]);
    }

    #[test]
    fn nested_targets_have_no_primary_selector() {
        let node: AffectedNode =
            serde_json::from_str(r##"{"target": [["iframe", "#inner"]]}"##).expect("parse");
        assert!(node.primary_selector().is_none());
    }

    #[test]
    fn threshold_counting_orders_impacts() {
        let result: AuditResult = serde_json::from_str(
            r#"{"violations": [
                {"id": "a", "impact": "minor"},
                {"id": "b", "impact": "serious"},
                {"id": "c", "impact": "critical"},
                {"id": "d"}
            ]}"#,
        )
        .expect("parse");
        assert_eq!(result.violations_at_or_above(Impact::Minor), 4);
        assert_eq!(result.violations_at_or_above(Impact::Serious), 2);
        assert_eq!(result.violations_at_or_above(Impact::Critical), 1);
    }
}
