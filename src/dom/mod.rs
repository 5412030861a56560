//! In-memory document built from a captured [`DomSnapshot`].
//!
//! Snapshots list nodes in whatever order the capture helper emitted them;
//! [`Document`] rebuilds the tree and a document (pre-order) traversal so
//! selector queries return elements the way `querySelectorAll` does.
//!
//! # Module Structure
//!
//! - [`selector`] - CSS selector parsing and matching primitives
//! - [`fragment`] - detached element copies and HTML serialization

pub mod fragment;
pub mod selector;

use std::collections::{HashMap, HashSet};

use crate::types::{DomNode, DomSnapshot};

pub use fragment::{Element, Node};
pub use selector::{parse as parse_selector, SelectorError, SelectorList};

use selector::{Combinator, ComplexSelector, Compound};

#[derive(Debug, Clone)]
pub struct Document {
    url: Option<String>,
    nodes: Vec<DomNode>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    order: Vec<usize>,
}

impl Document {
    pub fn from_snapshot(snapshot: DomSnapshot) -> Self {
        let DomSnapshot { url, nodes, .. } = snapshot;
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut parent = vec![None; nodes.len()];
        let mut children = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for child_id in &node.children {
                if let Some(&c) = index.get(child_id.as_str()) {
                    if parent[c].is_none() && c != i {
                        parent[c] = Some(i);
                        children[i].push(c);
                    }
                }
            }
        }
        // Nodes that name a parent which does not list them as a child.
        for (i, node) in nodes.iter().enumerate() {
            if parent[i].is_some() {
                continue;
            }
            if let Some(&p) = node.parent.as_deref().and_then(|id| index.get(id)) {
                if p != i {
                    parent[i] = Some(p);
                    children[p].push(i);
                }
            }
        }

        let roots: Vec<usize> = (0..nodes.len()).filter(|&i| parent[i].is_none()).collect();

        let mut order = Vec::with_capacity(nodes.len());
        let mut seen = HashSet::new();
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            if !seen.insert(i) {
                continue;
            }
            order.push(i);
            stack.extend(children[i].iter().rev().copied());
        }
        if order.len() < nodes.len() {
            tracing::debug!(
                unreachable = nodes.len() - order.len(),
                "snapshot contains nodes unreachable from any root"
            );
        }

        Self {
            url,
            nodes,
            parent,
            children,
            roots,
            order,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        self.order.iter().map(move |&idx| ElementRef { doc: self, idx })
    }

    pub fn get_by_node_id(&self, id: &str) -> Option<ElementRef<'_>> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .map(|idx| ElementRef { doc: self, idx })
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementRef<'_>>, SelectorError> {
        let list = selector::parse(selector)?;
        Ok(self.select(&list))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<ElementRef<'_>>, SelectorError> {
        let list = selector::parse(selector)?;
        Ok(self.elements().find(|el| el.matches(&list)))
    }

    pub fn select(&self, list: &SelectorList) -> Vec<ElementRef<'_>> {
        self.elements().filter(|el| el.matches(list)).collect()
    }

    fn siblings_of(&self, idx: usize) -> &[usize] {
        match self.parent[idx] {
            Some(p) => &self.children[p],
            None => &self.roots,
        }
    }
}

/// A borrowed handle to one element of a [`Document`].
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    idx: usize,
}

impl std::fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.node().id)
            .field("tag", &self.node().tag)
            .finish()
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.idx == other.idx
    }
}

impl Eq for ElementRef<'_> {}

impl std::hash::Hash for ElementRef<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl<'a> ElementRef<'a> {
    pub fn node(&self) -> &'a DomNode {
        &self.doc.nodes[self.idx]
    }

    pub fn tag(&self) -> &'a str {
        &self.node().tag
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node().attr(name)
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.doc.parent[self.idx].map(|idx| ElementRef { doc: self.doc, idx })
    }

    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        doc.children[self.idx]
            .iter()
            .map(move |&idx| ElementRef { doc, idx })
    }

    /// 1-based position among element siblings, and the sibling count.
    pub fn sibling_position(&self) -> (usize, usize) {
        let siblings = self.doc.siblings_of(self.idx);
        let pos = siblings
            .iter()
            .position(|&i| i == self.idx)
            .map(|p| p + 1)
            .unwrap_or(1);
        (pos, siblings.len().max(1))
    }

    pub fn matches(&self, list: &SelectorList) -> bool {
        list.0.iter().any(|complex| self.matches_complex(complex))
    }

    fn matches_complex(&self, complex: &ComplexSelector) -> bool {
        match complex.0.len() {
            0 => false,
            n => self.matches_from(&complex.0, n - 1),
        }
    }

    /// Matches `parts[i]` against this element, then walks the combinator
    /// chain leftwards, backtracking over ancestors for descendant steps.
    fn matches_from(&self, parts: &[(Combinator, Compound)], i: usize) -> bool {
        let (combinator, compound) = &parts[i];
        if !self.matches_compound(compound) {
            return false;
        }
        if i == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => self
                .parent()
                .map(|p| p.matches_from(parts, i - 1))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut ancestor = self.parent();
                while let Some(a) = ancestor {
                    if a.matches_from(parts, i - 1) {
                        return true;
                    }
                    ancestor = a.parent();
                }
                false
            }
        }
    }

    fn matches_compound(&self, compound: &Compound) -> bool {
        let node = self.node();
        if let Some(tag) = &compound.tag {
            if !node.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &compound.id {
            if node.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !compound.classes.is_empty() {
            let classes: Vec<&str> = node.class_name().split_ascii_whitespace().collect();
            if !compound.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }
        for attr in &compound.attributes {
            let matched = node
                .attr(&attr.name)
                .map(|v| attr.op.matches(v, attr.case_insensitive))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }
        if !compound.pseudos.is_empty() {
            let (pos, count) = self.sibling_position();
            if !compound
                .pseudos
                .iter()
                .all(|p| p.matches_position(pos, count))
            {
                return false;
            }
        }
        true
    }

    /// Deep copy of this element as a detached fragment. Direct text is
    /// placed before child elements.
    pub fn to_fragment(&self) -> Element {
        let node = self.node();
        let mut el = Element::new(&node.tag);
        el.attributes = node
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(text) = node.text.as_deref().filter(|t| !t.is_empty()) {
            el.children.push(Node::Text(text.to_string()));
        }
        for child in self.children() {
            el.children.push(Node::Element(child.to_fragment()));
        }
        el
    }
}
