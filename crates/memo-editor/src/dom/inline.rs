// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Inline runs: styled text spans and line breaks inside a text block.
//!
//! Offsets are counted in Unicode scalar values and a line break counts as a
//! single character. Commands never merge runs; adjacent runs with identical
//! styles are only folded together by [`InlineContent::normalize`], which the
//! serializer and history capture call.

use strum_macros::{AsRefStr, Display, EnumString};

/// The set of inline styles active on a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StyleSet {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
    pub color: Option<String>,
    pub background: Option<String>,
    pub font_size: Option<String>,
    pub link: Option<String>,
}

/// Names a style attribute without its value.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum StyleKey {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Color,
    Background,
    FontSize,
    Link,
}

/// A style attribute together with its value, used by `WrapInline`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StyleAttr {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Color(String),
    Background(String),
    FontSize(String),
    Link(String),
}

impl StyleAttr {
    pub fn key(&self) -> StyleKey {
        match self {
            Self::Bold => StyleKey::Bold,
            Self::Italic => StyleKey::Italic,
            Self::Underline => StyleKey::Underline,
            Self::Strike => StyleKey::Strike,
            Self::Code => StyleKey::Code,
            Self::Color(_) => StyleKey::Color,
            Self::Background(_) => StyleKey::Background,
            Self::FontSize(_) => StyleKey::FontSize,
            Self::Link(_) => StyleKey::Link,
        }
    }
}

impl StyleSet {
    pub fn has(&self, key: StyleKey) -> bool {
        match key {
            StyleKey::Bold => self.bold,
            StyleKey::Italic => self.italic,
            StyleKey::Underline => self.underline,
            StyleKey::Strike => self.strike,
            StyleKey::Code => self.code,
            StyleKey::Color => self.color.is_some(),
            StyleKey::Background => self.background.is_some(),
            StyleKey::FontSize => self.font_size.is_some(),
            StyleKey::Link => self.link.is_some(),
        }
    }

    /// True when the run carries exactly this attribute value.
    pub fn has_attr(&self, attr: &StyleAttr) -> bool {
        match attr {
            StyleAttr::Color(c) => self.color.as_deref() == Some(c.as_str()),
            StyleAttr::Background(c) => {
                self.background.as_deref() == Some(c.as_str())
            }
            StyleAttr::FontSize(s) => {
                self.font_size.as_deref() == Some(s.as_str())
            }
            StyleAttr::Link(l) => self.link.as_deref() == Some(l.as_str()),
            other => self.has(other.key()),
        }
    }

    pub fn apply(&mut self, attr: &StyleAttr) {
        match attr {
            StyleAttr::Bold => self.bold = true,
            StyleAttr::Italic => self.italic = true,
            StyleAttr::Underline => self.underline = true,
            StyleAttr::Strike => self.strike = true,
            StyleAttr::Code => self.code = true,
            StyleAttr::Color(c) => self.color = Some(c.clone()),
            StyleAttr::Background(c) => self.background = Some(c.clone()),
            StyleAttr::FontSize(s) => self.font_size = Some(s.clone()),
            StyleAttr::Link(l) => self.link = Some(l.clone()),
        }
    }

    pub fn clear(&mut self, key: StyleKey) {
        match key {
            StyleKey::Bold => self.bold = false,
            StyleKey::Italic => self.italic = false,
            StyleKey::Underline => self.underline = false,
            StyleKey::Strike => self.strike = false,
            StyleKey::Code => self.code = false,
            StyleKey::Color => self.color = None,
            StyleKey::Background => self.background = None,
            StyleKey::FontSize => self.font_size = None,
            StyleKey::Link => self.link = None,
        }
    }

    pub fn with(mut self, attr: &StyleAttr) -> Self {
        self.apply(attr);
        self
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Runs the inline markdown scan must leave alone.
    pub(crate) fn is_scan_exempt(&self) -> bool {
        self.code || self.link.is_some() || self.bold || self.italic
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: StyleSet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InlineNode {
    Text(TextRun),
    LineBreak,
}

impl InlineNode {
    pub fn text(text: impl Into<String>, style: StyleSet) -> Self {
        Self::Text(TextRun {
            text: text.into(),
            style,
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(run) => char_len(&run.text),
            Self::LineBreak => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn style(&self) -> Option<&StyleSet> {
        match self {
            Self::Text(run) => Some(&run.style),
            Self::LineBreak => None,
        }
    }
}

/// The ordered inline runs of one text-bearing block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineContent {
    nodes: Vec<InlineNode>,
}

impl InlineContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<InlineNode>) -> Self {
        Self { nodes }
    }

    /// Unstyled content; `\n` becomes a line break.
    pub fn plain(text: &str) -> Self {
        Self::styled(text, StyleSet::default())
    }

    pub fn styled(text: &str, style: StyleSet) -> Self {
        Self {
            nodes: nodes_for_text(text, &style),
        }
    }

    pub fn nodes(&self) -> &[InlineNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().map(InlineNode::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(InlineNode::is_empty)
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                InlineNode::Text(run) => out.push_str(&run.text),
                InlineNode::LineBreak => out.push('\n'),
            }
        }
        out
    }

    pub fn push(&mut self, node: InlineNode) {
        if !node.is_empty() {
            self.nodes.push(node);
        }
    }

    /// Text runs paired with the block offset they start at.
    pub fn text_runs(&self) -> Vec<(usize, &TextRun)> {
        let mut pos = 0;
        let mut out = Vec::new();
        for node in &self.nodes {
            if let InlineNode::Text(run) = node {
                out.push((pos, run));
            }
            pos += node.len();
        }
        out
    }

    /// Makes sure a node boundary falls at `offset` and returns the index of
    /// the first node starting there.
    fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for i in 0..self.nodes.len() {
            if offset == pos {
                return i;
            }
            let len = self.nodes[i].len();
            if offset < pos + len {
                if let InlineNode::Text(run) = &mut self.nodes[i] {
                    let tail = run.text.split_off(byte_offset(
                        &run.text,
                        offset - pos,
                    ));
                    let style = run.style.clone();
                    self.nodes.insert(i + 1, InlineNode::text(tail, style));
                }
                return i + 1;
            }
            pos += len;
        }
        self.nodes.len()
    }

    /// The style a character typed at `offset` picks up. Links and
    /// strikethrough do not extend past the end of their run.
    pub fn inherited_style(&self, offset: usize) -> StyleSet {
        let left = self.node_before(offset).and_then(InlineNode::style);
        let right = self.node_at(offset).and_then(InlineNode::style);
        let mut style = left.or(right).cloned().unwrap_or_default();
        if left.is_some() {
            if style.link.is_some()
                && right.and_then(|r| r.link.as_ref()) != style.link.as_ref()
            {
                style.link = None;
            }
            if style.strike && !right.is_some_and(|r| r.strike) {
                style.strike = false;
            }
        }
        style
    }

    /// Style of the character at `offset`, if it is text.
    pub fn style_at(&self, offset: usize) -> Option<&StyleSet> {
        self.node_at(offset).and_then(InlineNode::style)
    }

    fn node_before(&self, offset: usize) -> Option<&InlineNode> {
        if offset == 0 {
            None
        } else {
            self.node_at(offset - 1)
        }
    }

    fn node_at(&self, offset: usize) -> Option<&InlineNode> {
        let mut pos = 0;
        for node in &self.nodes {
            let len = node.len();
            if offset < pos + len {
                return Some(node);
            }
            pos += len;
        }
        None
    }

    /// Splices `text` in at `offset`, extending the run on the left when it
    /// has the same style the way a text node grows while typing.
    pub fn insert_text(&mut self, offset: usize, text: &str, style: StyleSet) {
        let mut new_nodes = nodes_for_text(text, &style);
        if new_nodes.is_empty() {
            return;
        }
        let idx = self.split_at(offset);
        if idx > 0 {
            if let (InlineNode::Text(left), InlineNode::Text(first)) =
                (&mut self.nodes[idx - 1], &new_nodes[0])
            {
                if left.style == first.style {
                    left.text.push_str(&first.text);
                    new_nodes.remove(0);
                }
            }
        }
        self.nodes.splice(idx..idx, new_nodes);
    }

    pub fn insert_content(&mut self, offset: usize, content: InlineContent) {
        let idx = self.split_at(offset);
        self.nodes.splice(idx..idx, content.nodes);
    }

    pub fn delete(&mut self, from: usize, to: usize) {
        if from >= to {
            return;
        }
        let start = self.split_at(from);
        let end = self.split_at(to);
        self.nodes.drain(start..end);
    }

    pub fn split_off(&mut self, offset: usize) -> InlineContent {
        let idx = self.split_at(offset);
        InlineContent {
            nodes: self.nodes.split_off(idx),
        }
    }

    pub fn append(&mut self, other: InlineContent) {
        self.nodes.extend(other.nodes);
    }

    pub fn slice(&self, from: usize, to: usize) -> InlineContent {
        let mut copy = self.clone();
        let len = copy.len();
        copy.delete(to.min(len), len);
        copy.delete(0, from.min(to));
        copy
    }

    pub fn wrap(&mut self, from: usize, to: usize, attr: &StyleAttr) {
        self.restyle(from, to, |style| style.apply(attr));
    }

    pub fn unwrap(&mut self, from: usize, to: usize, key: StyleKey) {
        self.restyle(from, to, |style| style.clear(key));
    }

    fn restyle(
        &mut self,
        from: usize,
        to: usize,
        mut f: impl FnMut(&mut StyleSet),
    ) {
        if from >= to {
            return;
        }
        let start = self.split_at(from);
        let end = self.split_at(to);
        for node in &mut self.nodes[start..end] {
            if let InlineNode::Text(run) = node {
                f(&mut run.style);
            }
        }
    }

    /// True when every text character in `[from, to)` carries `key`.
    pub fn all_have(&self, from: usize, to: usize, key: StyleKey) -> bool {
        let mut seen = false;
        let mut pos = 0;
        for node in &self.nodes {
            let len = node.len();
            let overlaps = pos < to && pos + len > from;
            if let (true, InlineNode::Text(run)) = (overlaps, node) {
                if !run.style.has(key) {
                    return false;
                }
                seen = true;
            }
            pos += len;
        }
        seen
    }

    /// The only content is the `<br>` placeholder of an empty block.
    pub fn is_placeholder(&self) -> bool {
        matches!(self.nodes.as_slice(), [InlineNode::LineBreak])
    }

    pub fn normalize(&mut self) {
        let mut out: Vec<InlineNode> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            if node.is_empty() {
                continue;
            }
            if let (Some(InlineNode::Text(prev)), InlineNode::Text(run)) =
                (out.last_mut(), &node)
            {
                if prev.style == run.style {
                    prev.text.push_str(&run.text);
                    continue;
                }
            }
            out.push(node);
        }
        self.nodes = out;
    }

    pub fn normalized(&self) -> InlineContent {
        let mut copy = self.clone();
        copy.normalize();
        copy
    }
}

fn nodes_for_text(text: &str, style: &StyleSet) -> Vec<InlineNode> {
    let mut nodes = Vec::new();
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            nodes.push(InlineNode::LineBreak);
        }
        if !segment.is_empty() {
            nodes.push(InlineNode::text(segment, style.clone()));
        }
    }
    nodes
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}
