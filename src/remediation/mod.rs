//! Remediation Generator: turns one flagged element into a suggested fix.
//!
//! Fixes come from a fixed per-rule table applied to a detached copy of the
//! element. They are starting points for a developer, not guaranteed
//! corrections; rules without an entry get a generic `aria-label` hint.

mod truncate;

pub use truncate::{scan as scan_tags, truncate_html, unmatched_open_tags, TagScan};

use std::fmt;

use crate::dom::{Element, Node};
use crate::types::Violation;

pub const ELEMENT_NOT_FOUND: &str = "Element not found";
pub const MAX_SNIPPET_CHARS: usize = 500;

pub const CONTRAST_STYLE: &str = "color: #000000; background-color: #ffffff;";
pub const LINK_LABEL: &str = "Descriptive link text needed";
pub const BUTTON_LABEL: &str = "Button label needed";
pub const ALT_PLACEHOLDER: &str = "Descriptive alt text needed";
pub const INPUT_LABEL: &str = "Input label needed";
pub const REGION_LABEL: &str = "Content region";
pub const GENERIC_LABEL: &str = "Accessibility improvement needed";
const FALLBACK_FIELD_ID: &str = "astra-field";

/// Rule ids with a dedicated table entry.
pub const REGISTERED_RULES: &[&str] = &[
    "color-contrast",
    "link-name",
    "button-name",
    "image-alt",
    "label",
    "form-field-multiple-labels",
    "heading-order",
    "landmark-one-main",
    "region",
    "list",
    "aria-valid-attr-value",
    "aria-allowed-attr",
];

/// ARIA attributes allowed on any element regardless of role.
const GLOBAL_ARIA_ATTRS: &[&str] = &[
    "aria-atomic",
    "aria-busy",
    "aria-controls",
    "aria-current",
    "aria-describedby",
    "aria-details",
    "aria-disabled",
    "aria-dropeffect",
    "aria-errormessage",
    "aria-flowto",
    "aria-grabbed",
    "aria-haspopup",
    "aria-hidden",
    "aria-invalid",
    "aria-keyshortcuts",
    "aria-label",
    "aria-labelledby",
    "aria-live",
    "aria-owns",
    "aria-relevant",
    "aria-roledescription",
];

const BOOLEAN_ARIA_ATTRS: &[&str] = &[
    "aria-atomic",
    "aria-busy",
    "aria-disabled",
    "aria-hidden",
    "aria-modal",
    "aria-multiline",
    "aria-multiselectable",
    "aria-readonly",
    "aria-required",
];
const TRISTATE_ARIA_ATTRS: &[&str] = &["aria-checked", "aria-pressed"];
const OPTIONAL_BOOLEAN_ARIA_ATTRS: &[&str] = &["aria-expanded", "aria-grabbed", "aria-selected"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleId {
    ColorContrast,
    LinkName,
    ButtonName,
    ImageAlt,
    Label,
    FormFieldMultipleLabels,
    HeadingOrder,
    LandmarkOneMain,
    Region,
    List,
    AriaValidAttrValue,
    AriaAllowedAttr,
    /// Any rule without a table entry; fixed generically.
    Unregistered(String),
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        match id {
            "color-contrast" => RuleId::ColorContrast,
            "link-name" => RuleId::LinkName,
            "button-name" => RuleId::ButtonName,
            "image-alt" => RuleId::ImageAlt,
            "label" => RuleId::Label,
            "form-field-multiple-labels" => RuleId::FormFieldMultipleLabels,
            "heading-order" => RuleId::HeadingOrder,
            "landmark-one-main" => RuleId::LandmarkOneMain,
            "region" => RuleId::Region,
            "list" => RuleId::List,
            "aria-valid-attr-value" => RuleId::AriaValidAttrValue,
            "aria-allowed-attr" => RuleId::AriaAllowedAttr,
            other => RuleId::Unregistered(other.to_string()),
        }
    }
}

impl RuleId {
    pub fn as_str(&self) -> &str {
        match self {
            RuleId::ColorContrast => "color-contrast",
            RuleId::LinkName => "link-name",
            RuleId::ButtonName => "button-name",
            RuleId::ImageAlt => "image-alt",
            RuleId::Label => "label",
            RuleId::FormFieldMultipleLabels => "form-field-multiple-labels",
            RuleId::HeadingOrder => "heading-order",
            RuleId::LandmarkOneMain => "landmark-one-main",
            RuleId::Region => "region",
            RuleId::List => "list",
            RuleId::AriaValidAttrValue => "aria-valid-attr-value",
            RuleId::AriaAllowedAttr => "aria-allowed-attr",
            RuleId::Unregistered(id) => id,
        }
    }

    pub fn is_registered(&self) -> bool {
        !matches!(self, RuleId::Unregistered(_))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested fixed HTML for `element` under the violation's rule.
pub fn generate_fix(element: Option<&Element>, violation: &Violation) -> String {
    fix_for_rule(element, &RuleId::from(violation.id.as_str()))
}

pub fn fix_for_rule(element: Option<&Element>, rule: &RuleId) -> String {
    let Some(element) = element else {
        return ELEMENT_NOT_FOUND.to_string();
    };
    let mut clone = element.clone();
    clone.strip_scripts();
    let fixed = apply_rule(clone, rule);
    truncate_html(&fixed.outer_html(), MAX_SNIPPET_CHARS)
}

/// The "current code" view of an element: scripts and inline handlers
/// removed, same length cap as fixes.
pub fn element_html(element: Option<&Element>) -> String {
    let Some(element) = element else {
        return ELEMENT_NOT_FOUND.to_string();
    };
    let mut clone = element.clone();
    clone.strip_scripts();
    for handler in ["onclick", "onload", "onerror"] {
        clone.remove_attr(handler);
    }
    truncate_html(&clone.outer_html(), MAX_SNIPPET_CHARS)
}

fn apply_rule(mut el: Element, rule: &RuleId) -> Element {
    match rule {
        RuleId::ColorContrast => {
            let style = el.attr("style").unwrap_or("").trim().to_string();
            let merged = if style.is_empty() {
                CONTRAST_STYLE.to_string()
            } else if style.ends_with(';') {
                format!("{} {}", style, CONTRAST_STYLE)
            } else {
                format!("{}; {}", style, CONTRAST_STYLE)
            };
            el.set_attr("style", &merged);
            el
        }
        RuleId::LinkName => {
            if el.tag == "a" && el.text_content().trim().is_empty() {
                el.set_attr("aria-label", LINK_LABEL);
                el.set_text("Link text");
            }
            el
        }
        RuleId::ButtonName => {
            if el.tag == "button" && el.text_content().trim().is_empty() {
                el.set_attr("aria-label", BUTTON_LABEL);
                el.set_text("Button label");
            }
            el
        }
        RuleId::ImageAlt => {
            if el.tag == "img" {
                el.set_attr("alt", ALT_PLACEHOLDER);
            }
            el
        }
        RuleId::Label | RuleId::FormFieldMultipleLabels => label_control(el),
        RuleId::HeadingOrder => shallower_heading(el),
        RuleId::LandmarkOneMain => wrap_in_main(el),
        RuleId::Region => {
            el.wrap_in(Element::new("section").with_attr("aria-label", REGION_LABEL))
        }
        RuleId::List => {
            if el.tag == "ul" || el.tag == "ol" {
                wrap_list_children(&mut el);
            }
            el
        }
        RuleId::AriaValidAttrValue => {
            reset_invalid_aria_values(&mut el);
            el
        }
        RuleId::AriaAllowedAttr => {
            if !el.has_attr("role") {
                el.attributes.retain(|(name, _)| {
                    let name = name.to_ascii_lowercase();
                    !name.starts_with("aria-") || GLOBAL_ARIA_ATTRS.contains(&name.as_str())
                });
            }
            el
        }
        RuleId::Unregistered(_) => {
            if !el.has_attr("role") && !el.has_attr("aria-label") {
                el.set_attr("aria-label", GENERIC_LABEL);
            }
            el
        }
    }
}

fn label_control(mut el: Element) -> Element {
    if !matches!(el.tag.as_str(), "input" | "select" | "textarea") {
        el.set_attr("aria-label", INPUT_LABEL);
        return el;
    }
    let id = el
        .attr("id")
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .or_else(|| {
            el.attr("name")
                .map(slug)
                .filter(|name| !name.is_empty())
        })
        .unwrap_or_else(|| FALLBACK_FIELD_ID.to_string());
    el.set_attr("id", &id);
    let label = Element::new("label")
        .with_attr("for", &id)
        .with_text(&format!("{} ", INPUT_LABEL));
    el.wrap_in(label)
}

fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

fn shallower_heading(el: Element) -> Element {
    let level = el
        .tag
        .strip_prefix('h')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n));
    match level {
        Some(level) => Element {
            tag: format!("h{}", level.saturating_sub(1).max(1)),
            attributes: el.attributes,
            children: el.children,
        },
        None => el,
    }
}

fn wrap_in_main(mut el: Element) -> Element {
    match el.tag.as_str() {
        "html" => {
            if let Some(body) = el.child_elements_mut().find(|c| c.tag == "body") {
                move_children_into(body, Element::new("main"));
            }
            el
        }
        "body" => {
            move_children_into(&mut el, Element::new("main"));
            el
        }
        _ => el.wrap_in(Element::new("main")),
    }
}

fn move_children_into(parent: &mut Element, mut wrapper: Element) {
    wrapper.children = std::mem::take(&mut parent.children);
    parent.children.push(Node::Element(wrapper));
}

fn wrap_list_children(list: &mut Element) {
    let children = std::mem::take(&mut list.children);
    list.children = children
        .into_iter()
        .map(|child| match child {
            Node::Element(el) if matches!(el.tag.as_str(), "li" | "script" | "template") => {
                Node::Element(el)
            }
            Node::Element(el) => Node::Element(el.wrap_in(Element::new("li"))),
            Node::Text(t) if t.trim().is_empty() => Node::Text(t),
            Node::Text(t) => Node::Element(Element::new("li").with_text(&t)),
        })
        .collect();
}

fn reset_invalid_aria_values(el: &mut Element) {
    for (name, value) in el.attributes.iter_mut() {
        let name = name.to_ascii_lowercase();
        let normalized = value.trim().to_ascii_lowercase();
        let valid: &[&str] = if BOOLEAN_ARIA_ATTRS.contains(&name.as_str()) {
            &["true", "false"]
        } else if TRISTATE_ARIA_ATTRS.contains(&name.as_str()) {
            &["true", "false", "mixed"]
        } else if OPTIONAL_BOOLEAN_ARIA_ATTRS.contains(&name.as_str()) {
            &["true", "false", "undefined"]
        } else {
            continue;
        };
        if !valid.contains(&normalized.as_str()) {
            *value = "false".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(id: &str) -> Violation {
        serde_json::from_value(serde_json::json!({ "id": id })).expect("violation")
    }

    fn fix(el: &Element, rule: &str) -> String {
        generate_fix(Some(el), &violation(rule))
    }

    #[test]
    fn missing_element_yields_placeholder_for_every_rule() {
        for rule in REGISTERED_RULES.iter().chain(["duplicate-id"].iter()) {
            assert_eq!(generate_fix(None, &violation(rule)), ELEMENT_NOT_FOUND);
        }
        assert_eq!(element_html(None), ELEMENT_NOT_FOUND);
    }

    #[test]
    fn image_alt_adds_placeholder_alt() {
        let img = Element::new("img").with_attr("src", "hero.png");
        let original = img.outer_html();
        let fixed = fix(&img, "image-alt");
        assert!(fixed.contains("alt=\"Descriptive alt text"));
        assert!(!fixed.contains(&original), "fixed: {fixed}");
    }

    #[test]
    fn color_contrast_appends_to_existing_style() {
        let el = Element::new("p")
            .with_attr("style", "color: #999")
            .with_text("Faint");
        assert_eq!(
            fix(&el, "color-contrast"),
            "<p style=\"color: #999; color: #000000; background-color: #ffffff;\">Faint</p>"
        );
    }

    #[test]
    fn empty_link_and_button_get_labels() {
        let link = Element::new("a").with_attr("href", "/x");
        assert_eq!(
            fix(&link, "link-name"),
            "<a href=\"/x\" aria-label=\"Descriptive link text needed\">Link text</a>"
        );
        let button = Element::new("button").with_text("  ");
        assert_eq!(
            fix(&button, "button-name"),
            "<button aria-label=\"Button label needed\">Button label</button>"
        );
        let labelled = Element::new("button").with_text("Save");
        assert_eq!(fix(&labelled, "button-name"), "<button>Save</button>");
    }

    #[test]
    fn label_rule_wraps_control_and_derives_id() {
        let input = Element::new("input")
            .with_attr("type", "email")
            .with_attr("name", "user email");
        assert_eq!(
            fix(&input, "label"),
            "<label for=\"user-email\">Input label needed <input type=\"email\" name=\"user email\" id=\"user-email\"></label>"
        );
        let bare = Element::new("textarea");
        let labelled = fix(&bare, "form-field-multiple-labels");
        assert!(labelled.starts_with("<label for=\"astra-field\">"));
    }

    #[test]
    fn heading_order_steps_up_one_level() {
        let h3 = Element::new("h3")
            .with_attr("class", "title")
            .with_text("Intro");
        assert_eq!(fix(&h3, "heading-order"), "<h2 class=\"title\">Intro</h2>");
        let h1 = Element::new("h1").with_text("Top");
        assert_eq!(fix(&h1, "heading-order"), "<h1>Top</h1>");
    }

    #[test]
    fn landmark_and_region_wrappers() {
        let div = Element::new("div").with_text("x");
        assert_eq!(fix(&div, "landmark-one-main"), "<main><div>x</div></main>");
        assert_eq!(
            fix(&div, "region"),
            "<section aria-label=\"Content region\"><div>x</div></section>"
        );
        let html = Element::new("html").with_child(Node::Element(
            Element::new("body").with_child(Node::Element(Element::new("p").with_text("hi"))),
        ));
        assert_eq!(
            fix(&html, "landmark-one-main"),
            "<html><body><main><p>hi</p></main></body></html>"
        );
    }

    #[test]
    fn list_children_are_wrapped_in_li() {
        let ul = Element::new("ul")
            .with_child(Node::Element(Element::new("li").with_text("a")))
            .with_child(Node::Element(Element::new("div").with_text("b")))
            .with_child(Node::Element(Element::new("template")));
        assert_eq!(
            fix(&ul, "list"),
            "<ul><li>a</li><li><div>b</div></li><template></template></ul>"
        );
    }

    #[test]
    fn aria_rules_fix_attributes() {
        let el = Element::new("div")
            .with_attr("aria-hidden", "yes")
            .with_attr("aria-checked", "mixed")
            .with_attr("aria-expanded", "open");
        assert_eq!(
            fix(&el, "aria-valid-attr-value"),
            "<div aria-hidden=\"false\" aria-checked=\"mixed\" aria-expanded=\"false\"></div>"
        );

        let el = Element::new("span")
            .with_attr("aria-checked", "true")
            .with_attr("aria-label", "x");
        assert_eq!(
            fix(&el, "aria-allowed-attr"),
            "<span aria-label=\"x\"></span>"
        );
        let with_role = Element::new("span")
            .with_attr("role", "checkbox")
            .with_attr("aria-checked", "true");
        assert_eq!(
            fix(&with_role, "aria-allowed-attr"),
            with_role.outer_html()
        );
    }

    #[test]
    fn unregistered_rule_adds_generic_label_once() {
        let el = Element::new("div");
        assert_eq!(
            fix(&el, "duplicate-id"),
            "<div aria-label=\"Accessibility improvement needed\"></div>"
        );
        let with_role = Element::new("div").with_attr("role", "note");
        assert_eq!(fix(&with_role, "duplicate-id"), "<div role=\"note\"></div>");
        assert_eq!(
            RuleId::from("duplicate-id"),
            RuleId::Unregistered("duplicate-id".into())
        );
    }

    #[test]
    fn scripts_and_handlers_are_stripped() {
        let el = Element::new("div")
            .with_attr("onclick", "steal()")
            .with_child(Node::Element(Element::new("script").with_text("x()")))
            .with_text("body");
        assert_eq!(element_html(Some(&el)), "<div>body</div>");
        assert!(!fix(&el, "region").contains("<script"));
    }

    #[test]
    fn every_rule_output_is_tag_balanced() {
        let samples = [
            Element::new("img").with_attr("src", "a.png"),
            Element::new("a").with_attr("href", "#"),
            Element::new("button"),
            Element::new("input").with_attr("name", "q"),
            Element::new("h4").with_text("Deep"),
            Element::new("ul").with_child(Node::Element(Element::new("span").with_text("x"))),
            Element::new("div").with_attr("aria-busy", "maybe"),
        ];
        for rule in REGISTERED_RULES.iter().chain(["some-other-rule"].iter()) {
            for el in &samples {
                let out = fix(el, rule);
                assert!(
                    unmatched_open_tags(&out).is_empty(),
                    "rule {rule} produced unbalanced {out}"
                );
            }
        }
    }

    #[test]
    fn long_fixes_are_capped_and_repaired() {
        let el = Element::new("p").with_text(&"lorem ipsum ".repeat(80));
        let out = fix(&el, "color-contrast");
        assert!(out.ends_with("...</p>"));
        assert!(out.chars().count() <= MAX_SNIPPET_CHARS + "...</p>".len());
    }
}
