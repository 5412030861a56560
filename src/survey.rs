//! Page Surveyor: picks a bounded, prioritized set of rendered elements and
//! records the style facts an analyst cares about for each one.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::dom::{Document, ElementRef};
use crate::types::{Layout, Rect, Spacing, StyleRecord, Typography, Visuals};

/// Default element cap per survey.
pub const DEFAULT_MAX_ELEMENTS: usize = 200;
pub const MAX_CLASS_NAME_CHARS: usize = 100;
pub const MAX_FONT_FAMILY_CHARS: usize = 50;

/// Selector groups evaluated in order; earlier groups claim the budget first.
pub const PRIORITY_GROUPS: &[&str] = &[
    "h1, h2, h3, h4, h5, h6",
    "p, span, div",
    "button, a, input, select, textarea, label",
    "header, nav, main, section, article, aside, footer",
    "[class*=\"btn\"], [class*=\"button\"], [class*=\"card\"], [class*=\"modal\"]",
    "[id], [class]",
];

#[derive(Debug, Clone)]
pub struct SurveyOptions {
    pub max_elements: usize,
    pub groups: Vec<String>,
}

impl Default for SurveyOptions {
    fn default() -> Self {
        Self {
            max_elements: DEFAULT_MAX_ELEMENTS,
            groups: PRIORITY_GROUPS.iter().map(|g| g.to_string()).collect(),
        }
    }
}

pub fn survey(doc: &Document) -> Vec<StyleRecord> {
    survey_with(doc, &SurveyOptions::default())
}

pub fn survey_with(doc: &Document, options: &SurveyOptions) -> Vec<StyleRecord> {
    let selected = select_elements(doc, options);
    debug!(
        selected = selected.len(),
        cap = options.max_elements,
        "surveyed page elements"
    );
    selected.into_iter().map(style_record).collect()
}

fn select_elements<'a>(doc: &'a Document, options: &SurveyOptions) -> Vec<ElementRef<'a>> {
    let cap = options.max_elements;
    let mut seen: HashSet<ElementRef<'a>> = HashSet::new();
    let mut selected = Vec::new();

    for group in &options.groups {
        if selected.len() >= cap {
            break;
        }
        let matches = match doc.query_selector_all(group) {
            Ok(m) => m,
            Err(err) => {
                warn!(group = %group, error = %err, "skipping survey selector group");
                continue;
            }
        };
        for el in matches {
            if selected.len() >= cap {
                break;
            }
            if el.node().is_rendered() && seen.insert(el) {
                selected.push(el);
            }
        }
    }

    for el in doc.elements() {
        if selected.len() >= cap {
            break;
        }
        if el.node().is_rendered() && seen.insert(el) {
            selected.push(el);
        }
    }

    selected
}

/// Extracts the style record for one element.
pub fn style_record(el: ElementRef<'_>) -> StyleRecord {
    let node = el.node();
    let style = node.computed_style.clone().unwrap_or_default();
    let bbox = node.bounding_box;
    let value = |v: Option<String>| v.unwrap_or_default();

    StyleRecord {
        tag_name: node.tag.to_ascii_lowercase(),
        id: node.attr("id").filter(|id| !id.is_empty()).map(str::to_string),
        class_name: truncate_chars(node.class_name(), MAX_CLASS_NAME_CHARS),
        rect: Rect {
            top: bbox.y.round() as i64,
            left: bbox.x.round() as i64,
            width: bbox.width.round() as i64,
            height: bbox.height.round() as i64,
        },
        typography: Typography {
            font_size: value(style.font_size),
            font_weight: value(style.font_weight),
            font_family: truncate_chars(
                style.font_family.as_deref().unwrap_or(""),
                MAX_FONT_FAMILY_CHARS,
            ),
            line_height: value(style.line_height),
            color: value(style.color),
        },
        spacing: Spacing {
            margin: value(style.margin),
            padding: value(style.padding),
        },
        layout: Layout {
            display: value(style.display),
            position: value(style.position),
        },
        visuals: Visuals {
            background_color: value(style.background_color),
            border_radius: value(style.border_radius),
        },
    }
}

/// Cuts `s` to at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComputedStyle, DomNode, DomSnapshot};

    fn visible(id: &str, tag: &str) -> DomNode {
        DomNode::new(id, tag).with_rect(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn headings_come_first_and_hidden_elements_are_excluded() {
        let mut snap = DomSnapshot::new("https://example.com");
        snap.push(visible("body", "body"), None)
            .push(visible("h1", "h1").with_text("Title"), Some("body"))
            .push(
                DomNode::new("hidden-btn", "button").with_rect(0.0, 0.0, 0.0, 0.0),
                Some("body"),
            )
            .push(
                DomNode::new("flat", "div").with_rect(0.0, 0.0, 100.0, 0.0),
                Some("body"),
            )
            .push(visible("p1", "p"), Some("body"));
        let doc = Document::from_snapshot(snap);

        let records = survey(&doc);
        let tags: Vec<&str> = records.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["h1", "p", "body"]);
        assert!(records.iter().all(|r| r.rect.width > 0 && r.rect.height > 0));
    }

    #[test]
    fn sub_pixel_elements_are_excluded() {
        let mut snap = DomSnapshot::new("https://example.com");
        snap.push(visible("body", "body"), None)
            .push(
                DomNode::new("rule", "hr").with_rect(0.0, 40.0, 600.0, 0.4),
                Some("body"),
            )
            .push(
                DomNode::new("thin", "div").with_rect(0.0, 50.0, 600.0, 0.6),
                Some("body"),
            );
        let doc = Document::from_snapshot(snap);

        let records = survey(&doc);
        let tags: Vec<&str> = records.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["div", "body"]);
        assert!(records.iter().all(|r| r.rect.width > 0 && r.rect.height > 0));
    }

    #[test]
    fn cap_is_respected_and_duplicates_removed() {
        let mut snap = DomSnapshot::new("u");
        snap.push(visible("root", "body"), None);
        for i in 0..300 {
            snap.push(
                visible(&format!("d{i}"), "div").with_attr("class", "card"),
                Some("root"),
            );
        }
        let doc = Document::from_snapshot(snap);
        let records = survey(&doc);
        assert_eq!(records.len(), DEFAULT_MAX_ELEMENTS);

        let options = SurveyOptions {
            max_elements: 1000,
            ..SurveyOptions::default()
        };
        let records = survey_with(&doc, &options);
        assert_eq!(records.len(), 301);
    }

    #[test]
    fn long_strings_are_truncated_by_characters() {
        let long_class = "é".repeat(150);
        let style = ComputedStyle {
            font_family: Some("x".repeat(80)),
            font_size: Some("16px".into()),
            ..ComputedStyle::default()
        };
        let mut snap = DomSnapshot::new("u");
        snap.push(
            DomNode::new("n", "SPAN")
                .with_attr("class", &long_class)
                .with_rect(1.4, 2.6, 10.5, 3.2)
                .with_style(style),
            None,
        );
        let doc = Document::from_snapshot(snap);
        let record = &survey(&doc)[0];
        assert_eq!(record.tag_name, "span");
        assert_eq!(record.class_name.chars().count(), MAX_CLASS_NAME_CHARS);
        assert_eq!(record.typography.font_family.len(), MAX_FONT_FAMILY_CHARS);
        assert_eq!(record.typography.font_size, "16px");
        assert_eq!(
            record.rect,
            Rect {
                top: 3,
                left: 1,
                width: 11,
                height: 3
            }
        );
    }

    #[test]
    fn broken_selector_group_is_skipped() {
        let mut snap = DomSnapshot::new("u");
        snap.push(visible("a", "nav"), None)
            .push(visible("b", "h2"), Some("a"));
        let doc = Document::from_snapshot(snap);
        let options = SurveyOptions {
            max_elements: 10,
            groups: vec!["a:hover".into(), "h2".into()],
        };
        let records = survey_with(&doc, &options);
        let tags: Vec<&str> = records.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, vec!["h2", "nav"]);
    }

    #[test]
    fn survey_is_deterministic() {
        let mut snap = DomSnapshot::new("u");
        snap.push(visible("r", "main"), None);
        for i in 0..20 {
            snap.push(visible(&format!("s{i}"), "section"), Some("r"));
        }
        let doc = Document::from_snapshot(snap);
        assert_eq!(survey(&doc), survey(&doc));
    }
}
