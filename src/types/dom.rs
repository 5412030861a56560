//! DOM snapshot types for captured pages.
//!
//! These mirror what the capture helper extracts from a live page: a
//! flattened element list with parent/child links, attributes, direct text,
//! layout boxes and the computed-style values Astra reads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A snapshot of a web page's DOM structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    /// The URL of the captured page
    pub url: Option<String>,
    /// The page title
    pub title: Option<String>,
    /// Flattened list of DOM nodes, in any order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<DomNode>,
}

/// A single DOM element with its properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    /// Unique identifier for this node
    pub id: String,
    /// HTML tag name (e.g., "div", "span", "button")
    pub tag: String,
    /// IDs of child elements, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// ID of parent node
    #[serde(default)]
    pub parent: Option<String>,
    /// HTML attributes, sorted by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Direct text content (not from children)
    #[serde(default)]
    pub text: Option<String>,
    /// Position and size on screen
    #[serde(default)]
    pub bounding_box: BoundingBox,
    /// CSS computed styles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_style: Option<ComputedStyle>,
}

impl DomSnapshot {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: None,
            nodes: Vec::new(),
        }
    }

    /// Appends `node`, linking it as the last child of `parent` when that
    /// node is already present.
    pub fn push(&mut self, mut node: DomNode, parent: Option<&str>) -> &mut Self {
        if let Some(parent_id) = parent {
            if let Some(p) = self.nodes.iter_mut().find(|n| n.id == parent_id) {
                p.children.push(node.id.clone());
            }
            node.parent = Some(parent_id.to_string());
        }
        self.nodes.push(node);
        self
    }
}

impl DomNode {
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into().to_ascii_lowercase(),
            children: Vec::new(),
            parent: None,
            attributes: BTreeMap::new(),
            text: None,
            bounding_box: BoundingBox::default(),
            computed_style: None,
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_rect(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.bounding_box = BoundingBox {
            x,
            y,
            width,
            height,
        };
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.computed_style = Some(style);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    /// Rendered at least one whole pixel wide and tall once the box is
    /// rounded, which is how survey records report it.
    pub fn is_rendered(&self) -> bool {
        self.bounding_box.width.round() >= 1.0 && self.bounding_box.height.round() >= 1.0
    }
}

/// Rectangle bounds for an element, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Computed CSS values, kept as the browser reports them (`"16px"`,
/// `"rgb(0, 0, 0)"`, `"8px 16px"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedStyle {
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub font_family: Option<String>,
    pub line_height: Option<String>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub margin: Option<String>,
    pub padding: Option<String>,
    pub border_color: Option<String>,
    pub border_radius: Option<String>,
    pub display: Option<String>,
    pub position: Option<String>,
    pub visibility: Option<String>,
    pub opacity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "id": "n1",
            "tag": "button",
            "attributes": {"type": "submit", "class": "btn"},
            "boundingBox": {"x": 1, "y": 2, "width": 80, "height": 32},
            "computedStyle": {"fontSize": "14px", "display": "inline-block"}
        }"#;
        let node: DomNode = serde_json::from_str(json).expect("deserialize node");
        assert_eq!(node.attr("type"), Some("submit"));
        assert_eq!(node.class_name(), "btn");
        assert!(node.children.is_empty());
        assert!(node.parent.is_none());
        assert!(node.is_rendered());
        let style = node.computed_style.expect("style");
        assert_eq!(style.font_size.as_deref(), Some("14px"));
        assert!(style.margin.is_none());
    }

    #[test]
    fn zero_height_node_is_not_rendered() {
        let node = DomNode {
            id: "n".into(),
            tag: "div".into(),
            children: vec![],
            parent: None,
            attributes: BTreeMap::new(),
            text: None,
            bounding_box: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 0.0,
            },
            computed_style: None,
        };
        assert!(!node.is_rendered());

        let hairline = DomNode {
            bounding_box: BoundingBox {
                height: 0.4,
                ..node.bounding_box
            },
            ..node
        };
        assert!(!hairline.is_rendered());
    }
}
