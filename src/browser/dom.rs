//! Raw capture-script output and its conversion into [`PageCapture`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::types::{AxeOutcome, BoundingBox, ComputedStyle, DomNode, DomSnapshot, PageCapture};

/// Raw result printed by the capture script.
#[derive(Debug, Deserialize)]
pub(crate) struct ScriptResultWithCapture {
    pub status: String,
    pub capture: Option<RawCapture>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCapture {
    pub url: String,
    pub title: Option<String>,
    pub dom: RawDomSnapshot,
    pub screenshot: Option<String>,
    pub axe: RawAxe,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAxe {
    pub status: String,
    pub results: Option<Value>,
    pub message: Option<String>,
}

/// Raw DOM snapshot as returned by the capture script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDomSnapshot {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub nodes: Vec<RawDomNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDomNode {
    pub id: String,
    pub tag: String,
    #[serde(default)]
    pub children: Vec<String>,
    pub parent: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub bounding_box: RawBoundingBox,
    pub computed_style: Option<ComputedStyle>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Converts raw DOM data from the capture script into a [`DomSnapshot`].
pub(crate) fn convert_raw_dom(dom_data: RawDomSnapshot) -> DomSnapshot {
    let nodes: Vec<DomNode> = dom_data
        .nodes
        .into_iter()
        .map(|raw| DomNode {
            id: raw.id,
            tag: raw.tag.to_ascii_lowercase(),
            children: raw.children,
            parent: raw.parent,
            attributes: raw.attributes,
            text: raw.text,
            bounding_box: BoundingBox {
                x: raw.bounding_box.x,
                y: raw.bounding_box.y,
                width: raw.bounding_box.width,
                height: raw.bounding_box.height,
            },
            computed_style: raw.computed_style,
        })
        .collect();

    DomSnapshot {
        url: dom_data.url,
        title: dom_data.title,
        nodes,
    }
}

pub(crate) fn convert_raw_axe(raw: RawAxe) -> AxeOutcome {
    match (raw.status.as_str(), raw.results) {
        ("ok", Some(results)) => AxeOutcome::Ok { results },
        _ => AxeOutcome::Unavailable {
            message: raw
                .message
                .unwrap_or_else(|| crate::audit::ENGINE_NOT_LOADED.to_string()),
        },
    }
}

pub(crate) fn convert_raw_capture(raw: RawCapture) -> PageCapture {
    PageCapture {
        url: raw.url,
        title: raw.title,
        dom: convert_raw_dom(raw.dom),
        screenshot: raw.screenshot,
        axe: convert_raw_axe(raw.axe),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT_OUTPUT: &str = r#"{
        "status": "ok",
        "capture": {
            "url": "https://example.com/",
            "title": "Example",
            "screenshot": "data:image/png;base64,AAAA",
            "axe": {"status": "unavailable", "message": "axe-core library not loaded"},
            "dom": {
                "url": "https://example.com/",
                "title": "Example",
                "nodes": [
                    {
                        "id": "node-0", "tag": "HTML", "children": ["node-1"], "parent": null,
                        "attributes": {"lang": "en"}, "text": null,
                        "boundingBox": {"x": 0, "y": 0, "width": 1440, "height": 900},
                        "computedStyle": {"display": "block", "margin": "0px"}
                    },
                    {
                        "id": "node-1", "tag": "button", "children": [], "parent": "node-0",
                        "attributes": {"class": "btn", "type": "submit"}, "text": "Buy",
                        "boundingBox": {"x": 10, "y": 20, "width": 80, "height": 32},
                        "computedStyle": {"fontSize": "14px", "padding": "8px 16px", "opacity": "1"}
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn script_output_converts_to_page_capture() {
        let result: ScriptResultWithCapture = serde_json::from_str(SCRIPT_OUTPUT).unwrap();
        assert_eq!(result.status, "ok");
        let capture = convert_raw_capture(result.capture.unwrap());

        assert_eq!(capture.title.as_deref(), Some("Example"));
        assert_eq!(capture.dom.nodes.len(), 2);
        assert_eq!(capture.dom.nodes[0].tag, "html");
        assert_eq!(capture.dom.nodes[0].attr("lang"), Some("en"));

        let button = &capture.dom.nodes[1];
        assert_eq!(button.text.as_deref(), Some("Buy"));
        assert_eq!(button.bounding_box.width, 80.0);
        let style = button.computed_style.as_ref().unwrap();
        assert_eq!(style.padding.as_deref(), Some("8px 16px"));
        assert_eq!(style.opacity.as_deref(), Some("1"));

        assert!(matches!(capture.axe, AxeOutcome::Unavailable { .. }));
    }

    #[test]
    fn axe_ok_without_results_is_unavailable() {
        let outcome = convert_raw_axe(RawAxe {
            status: "ok".into(),
            results: None,
            message: None,
        });
        assert!(matches!(
            outcome,
            AxeOutcome::Unavailable { message } if message == crate::audit::ENGINE_NOT_LOADED
        ));

        let outcome = convert_raw_axe(RawAxe {
            status: "ok".into(),
            results: Some(serde_json::json!({"violations": []})),
            message: None,
        });
        assert!(matches!(outcome, AxeOutcome::Ok { .. }));
    }
}
