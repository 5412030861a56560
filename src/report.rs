//! Audit reports: engine results joined with the page so each violation
//! carries a few concrete examples of current and suggested markup.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::Document;
use crate::remediation::{element_html, generate_fix};
use crate::types::{AffectedNode, AuditResult, Impact, Violation};

pub const MAX_EXAMPLES_PER_VIOLATION: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCounts {
    pub violations: usize,
    pub passes: usize,
    pub incomplete: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub url: String,
    pub counts: AuditCounts,
    pub violations: Vec<ViolationReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    pub id: String,
    pub impact: Option<Impact>,
    pub description: String,
    pub help: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help_url: String,
    /// Every affected element, including those without an example.
    pub affected: usize,
    pub examples: Vec<FixExample>,
    /// Affected elements beyond the examples shown.
    pub more: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
    /// False when the element could not be re-located in the page.
    pub available: bool,
    pub current_code: String,
    pub fixed_code: String,
}

impl AuditReport {
    /// Violations at or above `threshold`; see [`AuditResult::violations_at_or_above`].
    pub fn violations_at_or_above(&self, threshold: Impact) -> usize {
        self.violations
            .iter()
            .filter(|v| v.impact.unwrap_or(Impact::Minor) >= threshold)
            .count()
    }
}

pub fn build_audit_report(doc: &Document, url: &str, audit: &AuditResult) -> AuditReport {
    AuditReport {
        url: url.to_string(),
        counts: AuditCounts {
            violations: audit.violations.len(),
            passes: audit.passes.len(),
            incomplete: audit.incomplete.len(),
        },
        violations: audit
            .violations
            .iter()
            .map(|v| violation_report(doc, v))
            .collect(),
    }
}

fn violation_report(doc: &Document, violation: &Violation) -> ViolationReport {
    let examples: Vec<FixExample> = violation
        .nodes
        .iter()
        .take(MAX_EXAMPLES_PER_VIOLATION)
        .map(|node| fix_example(doc, violation, node))
        .collect();
    let affected = violation.nodes.len();
    ViolationReport {
        id: violation.id.clone(),
        impact: violation.impact,
        description: violation.description.clone(),
        help: violation.help.clone(),
        help_url: violation.help_url.clone(),
        affected,
        more: affected.saturating_sub(examples.len()),
        examples,
    }
}

fn fix_example(doc: &Document, violation: &Violation, node: &AffectedNode) -> FixExample {
    let selector = node.primary_selector();
    let element = selector.and_then(|sel| match doc.query_selector(sel) {
        Ok(found) => found.map(|el| el.to_fragment()),
        Err(err) => {
            debug!(selector = sel, error = %err, "cannot re-locate flagged element");
            None
        }
    });

    FixExample {
        selector: selector.map(str::to_owned),
        failure_summary: node.failure_summary.clone(),
        available: element.is_some(),
        current_code: element_html(element.as_ref()),
        fixed_code: generate_fix(element.as_ref(), violation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::ELEMENT_NOT_FOUND;
    use crate::types::{DomNode, DomSnapshot};
    use serde_json::json;

    fn page() -> Document {
        let mut snap = DomSnapshot::new("https://example.com");
        snap.push(DomNode::new("body", "body"), None);
        for i in 0..5 {
            snap.push(
                DomNode::new(format!("img{i}"), "img")
                    .with_attr("class", &format!("thumb t{i}"))
                    .with_attr("src", &format!("{i}.png")),
                Some("body"),
            );
        }
        Document::from_snapshot(snap)
    }

    fn audit() -> AuditResult {
        serde_json::from_value(json!({
            "passes": [{"id": "document-title", "nodes": []}],
            "incomplete": [],
            "violations": [{
                "id": "image-alt",
                "impact": "critical",
                "description": "Ensures <img> elements have alternate text",
                "help": "Images must have alternate text",
                "nodes": [
                    {"target": ["img.t0"], "failureSummary": "Fix any of the following"},
                    {"target": ["img.t1"]},
                    {"target": ["img.missing"]},
                    {"target": ["img.t3"]},
                    {"target": ["img.t4"]}
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn shows_three_examples_and_counts_the_rest() {
        let report = build_audit_report(&page(), "https://example.com", &audit());
        assert_eq!(
            report.counts,
            AuditCounts {
                violations: 1,
                passes: 1,
                incomplete: 0
            }
        );

        let v = &report.violations[0];
        assert_eq!(v.affected, 5);
        assert_eq!(v.examples.len(), 3);
        assert_eq!(v.more, 2);

        let first = &v.examples[0];
        assert!(first.available);
        assert_eq!(first.current_code, r#"<img class="thumb t0" src="0.png">"#);
        assert!(first.fixed_code.contains(r#"alt="Descriptive alt text needed""#));
        assert_eq!(first.failure_summary.as_deref(), Some("Fix any of the following"));
    }

    #[test]
    fn unlocatable_element_is_an_unavailable_example() {
        let report = build_audit_report(&page(), "https://example.com", &audit());
        let missing = &report.violations[0].examples[2];
        assert!(!missing.available);
        assert_eq!(missing.fixed_code, ELEMENT_NOT_FOUND);
        assert_eq!(missing.selector.as_deref(), Some("img.missing"));
    }

    #[test]
    fn unsupported_selector_does_not_fail_the_report() {
        let audit: AuditResult = serde_json::from_value(json!({
            "violations": [{"id": "region", "impact": "moderate",
                            "nodes": [{"target": ["div::before"]}, {"target": [["iframe", "p"]]}]}]
        }))
        .unwrap();
        let report = build_audit_report(&page(), "u", &audit);
        let examples = &report.violations[0].examples;
        assert!(examples.iter().all(|e| !e.available));
        assert!(examples[1].selector.is_none());
        assert_eq!(report.violations_at_or_above(Impact::Serious), 0);
        assert_eq!(report.violations_at_or_above(Impact::Moderate), 1);
    }
}
