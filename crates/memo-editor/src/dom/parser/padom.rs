// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The parse-arena DOM ("PaDom") html5ever builds into.
//!
//! Nodes live in one vector and refer to each other by handle. Nodes that
//! html5ever detaches while fixing up malformed markup stay in the arena
//! but are unreachable from the document, so every walk starts from
//! [`PaDom::document_handle`].

use html5ever::{namespace_url, ns, LocalName, QualName};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PaDomHandle(pub(crate) usize);

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PaNodeContainer {
    pub(crate) name: QualName,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<PaDomHandle>,
}

impl PaNodeContainer {
    pub(crate) fn tag(&self) -> &str {
        self.name.local.as_ref()
    }

    pub(crate) fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _v)| n == name)
            .map(|(_n, v)| v.as_str())
    }

    pub(crate) fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PaNodeText {
    pub(crate) content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PaDomNode {
    Document(Vec<PaDomHandle>),
    Container(PaNodeContainer),
    Text(PaNodeText),
    Comment,
}

impl PaDomNode {
    pub(crate) fn children(&self) -> &[PaDomHandle] {
        match self {
            Self::Document(children) => children,
            Self::Container(c) => &c.children,
            Self::Text(_) | Self::Comment => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<PaDomHandle>> {
        match self {
            Self::Document(children) => Some(children),
            Self::Container(c) => Some(&mut c.children),
            Self::Text(_) | Self::Comment => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PaDom {
    nodes: Vec<PaDomNode>,
    parents: Vec<Option<PaDomHandle>>,
    document_handle: PaDomHandle,
    /// Returned by `name_of` for nodes that are not elements.
    no_name: QualName,
}

impl Default for PaDom {
    fn default() -> Self {
        Self::new()
    }
}

impl PaDom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![PaDomNode::Document(Vec::new())],
            parents: vec![None],
            document_handle: PaDomHandle(0),
            no_name: paqual_name(""),
        }
    }

    pub(crate) fn document_handle(&self) -> PaDomHandle {
        self.document_handle
    }

    pub(crate) fn add_node(&mut self, node: PaDomNode) -> PaDomHandle {
        self.nodes.push(node);
        self.parents.push(None);
        PaDomHandle(self.nodes.len() - 1)
    }

    pub(crate) fn get_node(&self, handle: PaDomHandle) -> &PaDomNode {
        &self.nodes[handle.0]
    }

    pub(crate) fn get_mut_node(&mut self, handle: PaDomHandle) -> &mut PaDomNode {
        &mut self.nodes[handle.0]
    }

    pub(crate) fn parent(&self, handle: PaDomHandle) -> Option<PaDomHandle> {
        self.parents[handle.0]
    }

    pub(crate) fn name_of(&self, handle: PaDomHandle) -> &QualName {
        match self.get_node(handle) {
            PaDomNode::Container(c) => &c.name,
            _ => &self.no_name,
        }
    }

    pub(crate) fn element(&self, handle: PaDomHandle) -> Option<&PaNodeContainer> {
        match self.get_node(handle) {
            PaDomNode::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Appends `child`, detaching it from any previous parent.
    pub(crate) fn append_child(&mut self, parent: PaDomHandle, child: PaDomHandle) {
        self.detach(child);
        if let Some(children) = self.nodes[parent.0].children_mut() {
            children.push(child);
            self.parents[child.0] = Some(parent);
        }
    }

    pub(crate) fn insert_before(
        &mut self,
        sibling: PaDomHandle,
        child: PaDomHandle,
    ) {
        self.detach(child);
        let Some(parent) = self.parent(sibling) else {
            return;
        };
        if let Some(children) = self.nodes[parent.0].children_mut() {
            let at = children
                .iter()
                .position(|c| *c == sibling)
                .unwrap_or(children.len());
            children.insert(at, child);
            self.parents[child.0] = Some(parent);
        }
    }

    pub(crate) fn detach(&mut self, child: PaDomHandle) {
        if let Some(parent) = self.parents[child.0].take() {
            if let Some(children) = self.nodes[parent.0].children_mut() {
                children.retain(|c| *c != child);
            }
        }
    }

    /// Moves every child of `from` to the end of `to`.
    pub(crate) fn reparent_children(&mut self, from: PaDomHandle, to: PaDomHandle) {
        let moved: Vec<PaDomHandle> = self.get_node(from).children().to_vec();
        for child in moved {
            self.append_child(to, child);
        }
    }

    /// The last child when it is a text node, so adjacent text merges.
    pub(crate) fn trailing_text(&self, parent: PaDomHandle) -> Option<PaDomHandle> {
        let last = *self.get_node(parent).children().last()?;
        matches!(self.get_node(last), PaDomNode::Text(_)).then_some(last)
    }

    /// The children of the fragment root: html5ever wraps a fragment in a
    /// synthetic `<html>` element.
    pub(crate) fn fragment_children(&self) -> Vec<PaDomHandle> {
        let doc_children = self.get_node(self.document_handle).children();
        match doc_children {
            [root] if self.name_of(*root).local.as_ref() == "html" => {
                self.get_node(*root).children().to_vec()
            }
            other => other.to_vec(),
        }
    }

    pub(crate) fn write_html(&self, handle: PaDomHandle, out: &mut String) {
        match self.get_node(handle) {
            PaDomNode::Document(children) => {
                for child in children {
                    self.write_html(*child, out);
                }
            }
            PaDomNode::Text(text) => {
                out.push_str(&html_escape::encode_text(&text.content));
            }
            PaDomNode::Comment => {}
            PaDomNode::Container(c) => {
                out.push('<');
                out.push_str(c.tag());
                for (name, value) in &c.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(
                        value,
                    ));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(c.tag()) {
                    return;
                }
                for child in &c.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(c.tag());
                out.push('>');
            }
        }
    }
}

pub(crate) fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

pub(crate) fn paqual_name(local_name: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local_name))
}

/// Parse failures collected by the tree sink.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PaDomCreationError {
    pub(crate) dom: PaDom,
    pub(crate) parse_errors: Vec<String>,
}

impl PaDomCreationError {
    pub(crate) fn new() -> Self {
        Self {
            dom: PaDom::new(),
            parse_errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    impl PaDom {
        fn inner_html(&self, handle: PaDomHandle) -> String {
            let mut out = String::new();
            self.write_html(handle, &mut out);
            out
        }
    }

    fn element(dom: &mut PaDom, tag: &str) -> PaDomHandle {
        dom.add_node(PaDomNode::Container(PaNodeContainer {
            name: paqual_name(tag),
            attrs: Vec::new(),
            children: Vec::new(),
        }))
    }

    #[test]
    fn appending_moves_a_node_between_parents() {
        let mut dom = PaDom::new();
        let doc = dom.document_handle();
        let a = element(&mut dom, "p");
        let b = element(&mut dom, "div");
        let t = dom.add_node(PaDomNode::Text(PaNodeText {
            content: "x".into(),
        }));
        dom.append_child(doc, a);
        dom.append_child(doc, b);
        dom.append_child(a, t);
        dom.append_child(b, t);
        assert!(dom.get_node(a).children().is_empty());
        assert_eq!(dom.get_node(b).children(), &[t]);
        assert_eq!(dom.parent(t), Some(b));
        assert_eq!(dom.inner_html(doc), "<p></p><div>x</div>");
    }

    #[test]
    fn insert_before_and_void_elements() {
        let mut dom = PaDom::new();
        let doc = dom.document_handle();
        let p = element(&mut dom, "p");
        let br = element(&mut dom, "br");
        dom.append_child(doc, p);
        dom.insert_before(p, br);
        assert_eq!(dom.inner_html(doc), "<br><p></p>");
    }
}
