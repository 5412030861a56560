//! Component pattern checks: required attributes, design-system classes,
//! and basic accessibility expectations per component kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{QaIssue, QaIssueType, Severity};
use crate::dom::{parse_selector, Document, ElementRef, SelectorList};

const NATIVELY_FOCUSABLE: &str = "button, input, textarea, select, a[href]";
const FORM_CONTROLS: &str = "input, textarea, select";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessibilityRules {
    pub focusable: bool,
    pub has_aria_label: bool,
    pub has_label: bool,
    pub has_aria_described_by: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentPattern {
    pub selectors: Vec<String>,
    pub required_attributes: Vec<String>,
    /// Design-system classes; an element must carry at least one. Empty
    /// disables the check.
    pub classes: Vec<String>,
    pub accessibility: Option<AccessibilityRules>,
}

pub type ComponentPatterns = BTreeMap<String, ComponentPattern>;

pub fn default_component_patterns() -> ComponentPatterns {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let mut patterns = ComponentPatterns::new();
    patterns.insert(
        "button".to_string(),
        ComponentPattern {
            selectors: strings(&["button", ".btn", "[role=\"button\"]"]),
            required_attributes: strings(&["type"]),
            classes: strings(&["btn", "button", "btn-primary", "btn-secondary"]),
            accessibility: Some(AccessibilityRules {
                focusable: true,
                ..AccessibilityRules::default()
            }),
        },
    );
    patterns.insert(
        "input".to_string(),
        ComponentPattern {
            selectors: strings(&["input", "textarea", "select"]),
            required_attributes: strings(&["id", "name"]),
            classes: Vec::new(),
            accessibility: Some(AccessibilityRules {
                has_label: true,
                ..AccessibilityRules::default()
            }),
        },
    );
    patterns
}

struct CompiledPattern<'p> {
    name: &'p str,
    pattern: &'p ComponentPattern,
    selectors: SelectorList,
}

pub struct ComponentAnalyzer<'p> {
    patterns: Vec<CompiledPattern<'p>>,
    focusable: Option<SelectorList>,
    form_controls: Option<SelectorList>,
}

impl<'p> ComponentAnalyzer<'p> {
    /// Compiles each pattern's selectors. A pattern whose selectors do not
    /// parse is logged and left out.
    pub fn new(patterns: &'p ComponentPatterns) -> Self {
        let compiled = patterns
            .iter()
            .filter_map(|(name, pattern)| {
                match parse_selector(&pattern.selectors.join(", ")) {
                    Ok(selectors) => Some(CompiledPattern {
                        name,
                        pattern,
                        selectors,
                    }),
                    Err(err) => {
                        warn!(component = %name, error = %err, "skipping component pattern");
                        None
                    }
                }
            })
            .collect();
        Self {
            patterns: compiled,
            focusable: parse_selector(NATIVELY_FOCUSABLE).ok(),
            form_controls: parse_selector(FORM_CONTROLS).ok(),
        }
    }

    pub fn analyze(&self, doc: &Document, el: ElementRef<'_>, selector: &str) -> Vec<QaIssue> {
        let mut issues = Vec::new();
        for compiled in &self.patterns {
            if el.matches(&compiled.selectors) {
                issues.extend(self.validate(doc, el, compiled, selector));
            }
        }
        issues
    }

    fn validate(
        &self,
        doc: &Document,
        el: ElementRef<'_>,
        compiled: &CompiledPattern<'_>,
        selector: &str,
    ) -> Vec<QaIssue> {
        let name = compiled.name;
        let pattern = compiled.pattern;
        let issue = |subtype: &str, severity: Severity, message: String, fix: String| QaIssue {
            component: Some(name.to_string()),
            message,
            fix,
            ..QaIssue::new(QaIssueType::Component, subtype, severity, selector)
        };

        let mut issues = Vec::new();
        for attr in &pattern.required_attributes {
            if el.attr(attr).is_none() {
                issues.push(issue(
                    "attribute",
                    Severity::High,
                    format!("Missing required attribute: {attr}"),
                    format!("Add {attr} attribute to {name}"),
                ));
            }
        }

        if !pattern.classes.is_empty() {
            let classes: Vec<&str> = el.node().class_name().split_ascii_whitespace().collect();
            if !pattern.classes.iter().any(|c| classes.contains(&c.as_str())) {
                issues.push(issue(
                    "class",
                    Severity::Medium,
                    "Element not using design system classes".to_string(),
                    format!("Use one of: {}", pattern.classes.join(", ")),
                ));
            }
        }

        let Some(rules) = &pattern.accessibility else {
            return issues;
        };

        if rules.focusable && !self.is_focusable(el) {
            issues.push(issue(
                "accessibility",
                Severity::High,
                "Element should be focusable".to_string(),
                "Add tabindex=\"0\" or use focusable element".to_string(),
            ));
        }

        if rules.has_aria_label
            && el.attr("aria-label").is_none()
            && el.attr("aria-labelledby").is_none()
        {
            issues.push(issue(
                "accessibility",
                Severity::Medium,
                "Missing aria-label or aria-labelledby".to_string(),
                "Add aria-label or aria-labelledby attribute".to_string(),
            ));
        }

        if rules.has_aria_described_by && el.attr("aria-describedby").is_none() {
            issues.push(issue(
                "accessibility",
                Severity::Low,
                "Missing aria-describedby".to_string(),
                "Reference a help or error text element with aria-describedby".to_string(),
            ));
        }

        let is_form_control = self
            .form_controls
            .as_ref()
            .map_or(false, |list| el.matches(list));
        if rules.has_label && is_form_control && !has_label(doc, el) {
            let id = el.attr("id").filter(|id| !id.is_empty()).unwrap_or("element-id");
            issues.push(issue(
                "accessibility",
                Severity::High,
                "Form element missing associated label".to_string(),
                format!("Add <label for=\"{id}\"> or wrap in <label>"),
            ));
        }

        issues
    }

    fn is_focusable(&self, el: ElementRef<'_>) -> bool {
        if self.focusable.as_ref().map_or(false, |list| el.matches(list)) {
            return true;
        }
        el.attr("tabindex")
            .and_then(|t| t.trim().parse::<i32>().ok())
            .map_or(false, |t| t >= 0)
    }
}

/// A control is labelled by a `<label for=id>` anywhere in the document or by
/// an enclosing `<label>`.
fn has_label(doc: &Document, el: ElementRef<'_>) -> bool {
    if let Some(id) = el.attr("id").filter(|id| !id.is_empty()) {
        let labelled = doc
            .elements()
            .any(|other| other.tag() == "label" && other.attr("for") == Some(id));
        if labelled {
            return true;
        }
    }
    let mut ancestor = el.parent();
    while let Some(a) = ancestor {
        if a.tag() == "label" {
            return true;
        }
        ancestor = a.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DomNode, DomSnapshot};

    fn doc(nodes: Vec<(DomNode, Option<&str>)>) -> Document {
        let mut snap = DomSnapshot::new("https://example.com");
        for (node, parent) in nodes {
            snap.push(node, parent);
        }
        Document::from_snapshot(snap)
    }

    fn issues_for(doc: &Document, node_id: &str) -> Vec<QaIssue> {
        let patterns = default_component_patterns();
        let analyzer = ComponentAnalyzer::new(&patterns);
        let el = doc.get_by_node_id(node_id).unwrap();
        analyzer.analyze(doc, el, node_id)
    }

    #[test]
    fn bare_button_misses_type_and_class() {
        let d = doc(vec![
            (DomNode::new("body", "body"), None),
            (DomNode::new("b", "button").with_text("Go"), Some("body")),
        ]);
        let issues = issues_for(&d, "b");
        let subtypes: Vec<&str> = issues.iter().map(|i| i.subtype.as_str()).collect();
        assert_eq!(subtypes, vec!["attribute", "class"]);
        assert_eq!(issues[0].message, "Missing required attribute: type");
        assert_eq!(issues[0].fix, "Add type attribute to button");
        assert_eq!(issues[0].component.as_deref(), Some("button"));
        assert_eq!(
            issues[1].fix,
            "Use one of: btn, button, btn-primary, btn-secondary"
        );
    }

    #[test]
    fn role_button_div_must_be_focusable() {
        let d = doc(vec![
            (DomNode::new("body", "body"), None),
            (
                DomNode::new("fake", "div")
                    .with_attr("role", "button")
                    .with_attr("type", "button")
                    .with_attr("class", "btn"),
                Some("body"),
            ),
            (
                DomNode::new("ok", "div")
                    .with_attr("role", "button")
                    .with_attr("type", "button")
                    .with_attr("class", "btn")
                    .with_attr("tabindex", "0"),
                Some("body"),
            ),
        ]);
        let issues = issues_for(&d, "fake");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Element should be focusable");
        assert_eq!(issues[0].severity, Severity::High);
        assert!(issues_for(&d, "ok").is_empty());
    }

    #[test]
    fn labelled_inputs_pass() {
        let d = doc(vec![
            (DomNode::new("body", "body"), None),
            (DomNode::new("l", "label").with_attr("for", "email"), Some("body")),
            (
                DomNode::new("email", "input")
                    .with_attr("id", "email")
                    .with_attr("name", "email"),
                Some("body"),
            ),
            (DomNode::new("wrap", "label"), Some("body")),
            (
                DomNode::new("q", "input").with_attr("id", "q").with_attr("name", "q"),
                Some("wrap"),
            ),
            (DomNode::new("bare", "textarea"), Some("body")),
        ]);
        assert!(issues_for(&d, "email").is_empty());
        assert!(issues_for(&d, "q").is_empty());

        let bare = issues_for(&d, "bare");
        assert_eq!(bare.len(), 3);
        assert_eq!(bare[2].message, "Form element missing associated label");
        assert_eq!(bare[2].fix, "Add <label for=\"element-id\"> or wrap in <label>");
    }

    #[test]
    fn invalid_pattern_selectors_are_skipped() {
        let mut patterns = default_component_patterns();
        patterns.insert(
            "broken".to_string(),
            ComponentPattern {
                selectors: vec!["a + b".to_string()],
                ..ComponentPattern::default()
            },
        );
        let analyzer = ComponentAnalyzer::new(&patterns);
        assert_eq!(analyzer.patterns.len(), 2);
    }
}
