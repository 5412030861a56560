//! Design QA: checks a captured page against a design-token table and a set
//! of component patterns.

pub mod components;
pub mod tokens;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{Document, ElementRef};

pub use components::{
    default_component_patterns, AccessibilityRules, ComponentAnalyzer, ComponentPattern,
    ComponentPatterns,
};
pub use tokens::{TokenAnalyzer, TokenConfig, TypographyToken};

const SKIPPED_TAGS: &[&str] = &["script", "style", "meta", "link", "title", "head", "noscript"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QaIssueType {
    Token,
    Component,
}

impl fmt::Display for QaIssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QaIssueType::Token => "token",
            QaIssueType::Component => "component",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaIssue {
    #[serde(rename = "type")]
    pub issue_type: QaIssueType,
    pub subtype: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub selector: String,
    pub message: String,
    pub fix: String,
}

impl QaIssue {
    pub fn new(
        issue_type: QaIssueType,
        subtype: impl Into<String>,
        severity: Severity,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            issue_type,
            subtype: subtype.into(),
            severity,
            property: None,
            actual: None,
            suggested: None,
            component: None,
            selector: selector.into(),
            message: String::new(),
            fix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
}

impl QaSummary {
    pub fn from_issues(issues: &[QaIssue]) -> Self {
        let mut summary = QaSummary {
            total: issues.len(),
            ..QaSummary::default()
        };
        for issue in issues {
            *summary.by_type.entry(issue.issue_type.to_string()).or_default() += 1;
            *summary.by_severity.entry(issue.severity.to_string()).or_default() += 1;
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaReport {
    pub url: String,
    pub issues: Vec<QaIssue>,
    pub summary: QaSummary,
    pub elements_analyzed: usize,
}

/// Runs the token checks over every visible element, then the component
/// checks over controls and elements with an explicit role.
pub fn analyze(doc: &Document, tokens: &TokenConfig, patterns: &ComponentPatterns) -> QaReport {
    let token_analyzer = TokenAnalyzer::new(tokens);
    let component_analyzer = ComponentAnalyzer::new(patterns);

    let mut issues = Vec::new();
    let mut analyzed = 0;
    for el in doc.elements().filter(|el| !should_skip(*el)) {
        analyzed += 1;
        if let Some(style) = &el.node().computed_style {
            issues.extend(token_analyzer.analyze(style, &css_path(el)));
        }
    }

    for el in doc.elements().filter(|el| is_component_candidate(*el)) {
        let selector = css_path(el);
        issues.extend(component_analyzer.analyze(doc, el, &selector));
    }

    debug!(issues = issues.len(), elements = analyzed, "design QA complete");
    QaReport {
        url: doc.url().unwrap_or_default().to_string(),
        summary: QaSummary::from_issues(&issues),
        issues,
        elements_analyzed: analyzed,
    }
}

fn should_skip(el: ElementRef<'_>) -> bool {
    if SKIPPED_TAGS.contains(&el.tag()) {
        return true;
    }
    match &el.node().computed_style {
        Some(style) => {
            style.display.as_deref() == Some("none")
                || style.visibility.as_deref() == Some("hidden")
        }
        None => false,
    }
}

fn is_component_candidate(el: ElementRef<'_>) -> bool {
    matches!(el.tag(), "button" | "input" | "textarea" | "select") || el.attr("role").is_some()
}

/// A short selector that re-locates `el`: `tag#id` when an id is present,
/// otherwise a child chain of `tag:nth-child(n)` steps up to the nearest
/// ancestor with an id (or the root).
pub fn css_path(el: ElementRef<'_>) -> String {
    let mut steps = Vec::new();
    let mut current = Some(el);
    while let Some(node) = current {
        if let Some(id) = node.attr("id").filter(|id| is_plain_ident(id)) {
            steps.push(format!("{}#{}", node.tag(), id));
            break;
        }
        let (pos, _) = node.sibling_position();
        steps.push(format!("{}:nth-child({})", node.tag(), pos));
        current = node.parent();
    }
    steps.reverse();
    steps.join(" > ")
}

fn is_plain_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
