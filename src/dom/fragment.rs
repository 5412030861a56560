//! Owned HTML fragments.
//!
//! A fragment is a detached deep copy of a page element. Remediation edits
//! fragments, never the captured document.

use std::fmt::Write as _;

/// Elements serialized without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in serialization order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Replaces an existing attribute in place or appends a new one.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attributes
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(pos).1)
    }

    /// Concatenated descendant text, like the DOM's `textContent`.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![Node::Text(text.to_string())];
    }

    /// Removes every `<script>` descendant.
    pub fn strip_scripts(&mut self) {
        self.children.retain(|child| match child {
            Node::Element(el) => el.tag != "script",
            Node::Text(_) => true,
        });
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.strip_scripts();
            }
        }
    }

    /// Moves `self` inside `wrapper`, after any children it already has.
    pub fn wrap_in(self, mut wrapper: Element) -> Element {
        wrapper.children.push(Node::Element(self));
        wrapper
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|c| match c {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attributes {
        let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
    }
    out.push('>');
    if is_void(&el.tag) {
        return;
    }
    let raw_text = matches!(el.tag.as_str(), "script" | "style");
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(t) if raw_text => out.push_str(t),
            Node::Text(t) => out.push_str(&escape_text(t)),
        }
    }
    let _ = write!(out, "</{}>", el.tag);
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\u{a0}', "&nbsp;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}
