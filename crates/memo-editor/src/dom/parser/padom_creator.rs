// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};

use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{parse_fragment, Attribute, QualName};

use super::padom::{
    paqual_name, PaDom, PaDomCreationError, PaDomHandle, PaDomNode,
    PaNodeContainer, PaNodeText,
};

pub(crate) type DomCreationResult = Result<PaDom, PaDomCreationError>;

/// html5ever sink building a [`PaDom`]. Markup arrives from pastes and
/// other browsers, so every tree-builder callback is supported, including
/// the ones that move nodes around while fixing misnested tags.
pub(crate) struct PaDomCreator {
    state: RefCell<PaDomCreationError>,
}

impl PaDomCreator {
    /// Parses `html` as the children of a `<body>`.
    pub(crate) fn parse(html: &str) -> DomCreationResult {
        parse_fragment(
            PaDomCreator::default(),
            Default::default(),
            paqual_name("body"),
            vec![],
        )
        .from_utf8()
        .one(html.as_bytes())
    }

    fn append_text(dom: &mut PaDom, parent: PaDomHandle, text: &str) {
        if let Some(existing) = dom.trailing_text(parent) {
            if let PaDomNode::Text(t) = dom.get_mut_node(existing) {
                t.content.push_str(text);
            }
            return;
        }
        let handle = dom.add_node(PaDomNode::Text(PaNodeText {
            content: text.to_owned(),
        }));
        dom.append_child(parent, handle);
    }
}

impl Default for PaDomCreator {
    fn default() -> Self {
        Self {
            state: RefCell::new(PaDomCreationError::new()),
        }
    }
}

impl TreeSink for PaDomCreator {
    type Handle = PaDomHandle;
    type Output = DomCreationResult;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        let state = self.state.into_inner();
        if state.parse_errors.is_empty() {
            Ok(state.dom)
        } else {
            Err(state)
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.state.borrow_mut().parse_errors.push(String::from(msg));
    }

    fn get_document(&self) -> Self::Handle {
        self.state.borrow().dom.document_handle()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |state| state.dom.name_of(*target))
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        self.state
            .borrow_mut()
            .dom
            .add_node(PaDomNode::Container(PaNodeContainer {
                name,
                attrs: attrs
                    .into_iter()
                    .map(|attr| {
                        (
                            attr.name.local.as_ref().to_owned(),
                            attr.value.as_ref().to_owned(),
                        )
                    })
                    .collect(),
                children: Vec::new(),
            }))
    }

    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        self.state.borrow_mut().dom.add_node(PaDomNode::Comment)
    }

    fn create_pi(
        &self,
        _target: StrTendril,
        _data: StrTendril,
    ) -> Self::Handle {
        self.state.borrow_mut().dom.add_node(PaDomNode::Comment)
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let dom = &mut self.state.borrow_mut().dom;
        match child {
            NodeOrText::AppendNode(child) => dom.append_child(*parent, child),
            NodeOrText::AppendText(tendril) => {
                Self::append_text(dom, *parent, tendril.as_ref())
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = self.state.borrow().dom.parent(*element).is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    fn pop(&self, _node: &Self::Handle) {}

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let dom = &mut self.state.borrow_mut().dom;
        match new_node {
            NodeOrText::AppendNode(node) => dom.insert_before(*sibling, node),
            NodeOrText::AppendText(tendril) => {
                let Some(parent) = dom.parent(*sibling) else {
                    return;
                };
                let siblings = dom.get_node(parent).children();
                let previous = siblings
                    .iter()
                    .position(|c| c == sibling)
                    .and_then(|i| i.checked_sub(1))
                    .map(|i| siblings[i]);
                if let Some(previous) = previous {
                    if let PaDomNode::Text(t) = dom.get_mut_node(previous) {
                        t.content.push_str(tendril.as_ref());
                        return;
                    }
                }
                let text = dom.add_node(PaDomNode::Text(PaNodeText {
                    content: tendril.as_ref().to_owned(),
                }));
                dom.insert_before(*sibling, text);
            }
        }
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<Attribute>,
    ) {
        let dom = &mut self.state.borrow_mut().dom;
        if let PaDomNode::Container(node) = dom.get_mut_node(*target) {
            for attr in attrs {
                let name = attr.name.local.as_ref();
                if node.get_attr(name).is_none() {
                    node.attrs
                        .push((name.to_owned(), attr.value.as_ref().to_owned()));
                }
            }
        }
    }

    fn associate_with_form(
        &self,
        _target: &Self::Handle,
        _form: &Self::Handle,
        _nodes: (&Self::Handle, Option<&Self::Handle>),
    ) {
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.state.borrow_mut().dom.detach(*target);
    }

    fn reparent_children(
        &self,
        node: &Self::Handle,
        new_parent: &Self::Handle,
    ) {
        self.state
            .borrow_mut()
            .dom
            .reparent_children(*node, *new_parent);
    }

    fn is_mathml_annotation_xml_integration_point(
        &self,
        _handle: &Self::Handle,
    ) -> bool {
        false
    }

    fn set_current_line(&self, _line_number: u64) {}

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    fn allow_declarative_shadow_roots(
        &self,
        _intended_parent: &Self::Handle,
    ) -> bool {
        false
    }

    fn attach_declarative_shadow(
        &self,
        _location: &Self::Handle,
        _template: &Self::Handle,
        _attrs: Vec<Attribute>,
    ) -> Result<(), String> {
        Err("shadow roots are not supported".to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(input: &str) -> PaDom {
        match PaDomCreator::parse(input) {
            Ok(dom) => dom,
            Err(e) => e.dom,
        }
    }

    fn html_of(input: &str) -> String {
        let dom = parse(input);
        dom.fragment_children()
            .into_iter()
            .map(|h| {
                let mut out = String::new();
                dom.write_html(h, &mut out);
                out
            })
            .collect()
    }

    #[test]
    fn parsing_an_empty_string_creates_an_empty_fragment() {
        assert!(parse("").fragment_children().is_empty());
    }

    #[test]
    fn parsing_a_text_snippet_creates_one_node() {
        let dom = parse("foo");
        let children = dom.fragment_children();
        assert_eq!(children.len(), 1);
        assert_eq!(
            dom.get_node(children[0]),
            &PaDomNode::Text(PaNodeText {
                content: "foo".into()
            })
        );
    }

    #[test]
    fn parsing_nested_structures_produces_them() {
        assert_eq!(html_of("A<i>B<b>C</b>D</i>E"), "A<i>B<b>C</b>D</i>E");
    }

    #[test]
    fn parsing_tags_with_attributes_preserves_them() {
        assert_eq!(
            html_of("<span class='foo'>txt</span>"),
            "<span class=\"foo\">txt</span>"
        );
    }

    #[test]
    fn parsing_text_node_with_escaped_html_entities() {
        assert_eq!(
            html_of("aaa&lt;strong&gt;bbb&lt;/strong&gt;ccc"),
            "aaa&lt;strong&gt;bbb&lt;/strong&gt;ccc"
        );
    }

    #[test]
    fn misnested_formatting_is_repaired() {
        assert_eq!(html_of("<b>a<p>b</b>c</p>"), "<b>a</b><p><b>b</b>c</p>");
    }

    #[test]
    fn stray_table_text_is_fostered_out() {
        assert_eq!(
            html_of("<table>x<tr><td>1</td></tr></table>"),
            "x<table><tbody><tr><td>1</td></tr></tbody></table>"
        );
    }

    #[test]
    fn comments_are_kept_out_of_the_output() {
        assert_eq!(html_of("a<!-- note -->b"), "ab");
    }

    #[test]
    fn clean_markup_has_no_parse_errors() {
        assert!(PaDomCreator::parse("<p>hi <strong>there</strong></p>").is_ok());
        assert!(PaDomCreator::parse("<p>a</b></p>").is_err());
    }
}
