// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::fmt;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::dom::code_block::CodeBlock;
use crate::dom::inline::InlineContent;
use crate::dom::style::{parse_px, parse_style, style_value};

/// Identity of a block, unique within one [`crate::Document`].
///
/// Ids survive edits to the block but not a reload of the content through
/// `set_content` or an undo, which re-parse the markup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u64);

impl BlockId {
    /// Carried by blocks that have not been inserted into a document yet.
    pub(crate) const UNASSIGNED: BlockId = BlockId(0);
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
pub enum ListType {
    #[strum(serialize = "ol")]
    Ordered,
    #[strum(serialize = "ul")]
    Unordered,
}

impl ListType {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ordered => "ol",
            Self::Unordered => "ul",
        }
    }
}

/// Heading level, always within `1..=6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub fn new(level: u8) -> Self {
        Self(level.clamp(1, 6))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    #[strum(serialize = "img")]
    Image,
    Video,
    Iframe,
}

impl MediaKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Video => "video",
            Self::Iframe => "iframe",
        }
    }
}

/// An embedded object. `attrs` holds every structural attribute other than
/// `src`, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Media {
    pub kind: MediaKind,
    pub src: String,
    pub attrs: Vec<(String, String)>,
}

impl Media {
    pub fn new(kind: MediaKind, src: impl Into<String>) -> Self {
        Self {
            kind,
            src: src.into(),
            attrs: Vec::new(),
        }
    }

    pub fn image(src: impl Into<String>) -> Self {
        Self::new(MediaKind::Image, src)
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.attrs.push((name.to_owned(), value)),
        }
    }

    /// Explicit width from the attribute or the inline style.
    pub fn width(&self) -> Option<u32> {
        self.dimension("width")
    }

    pub fn height(&self) -> Option<u32> {
        self.dimension("height")
    }

    fn dimension(&self, name: &str) -> Option<u32> {
        self.attr(name).and_then(parse_px).or_else(|| {
            let style = parse_style(self.attr("style").unwrap_or_default());
            style_value(&style, name).and_then(parse_px)
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableCell {
    pub header: bool,
    pub attrs: Vec<(String, String)>,
    pub content: InlineContent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableRow {
    pub attrs: Vec<(String, String)>,
    /// Always [`BlockNode::TableCell`] blocks.
    pub cells: Vec<Block>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub attrs: Vec<(String, String)>,
    pub rows: Vec<TableRow>,
}

/// A collapsible block: an editable title and a body of blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Accordion {
    pub title: InlineContent,
    pub body: Vec<Block>,
    pub expanded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockNode {
    Paragraph(InlineContent),
    Heading {
        level: HeadingLevel,
        content: InlineContent,
    },
    /// Children are always [`BlockNode::ListItem`] blocks.
    List {
        list_type: ListType,
        items: Vec<Block>,
    },
    ListItem(InlineContent),
    Quote(Vec<Block>),
    Accordion(Accordion),
    CodeBlock(CodeBlock),
    Table(Table),
    TableCell(TableCell),
    Media(Media),
}

/// Target type of `SetBlockType`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockType {
    Paragraph,
    Heading(HeadingLevel),
    ListItem(ListType),
    Quote,
    CodeBlock {
        language: Option<String>,
        no_highlight: bool,
    },
    Accordion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) node: BlockNode,
}

impl Block {
    pub fn new(node: BlockNode) -> Self {
        Self {
            id: BlockId::UNASSIGNED,
            node,
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new(BlockNode::Paragraph(InlineContent::plain(text)))
    }

    pub fn empty_paragraph() -> Self {
        Self::new(BlockNode::Paragraph(InlineContent::new()))
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Self::new(BlockNode::Heading {
            level: HeadingLevel::new(level),
            content: InlineContent::plain(text),
        })
    }

    pub fn list(list_type: ListType, items: &[&str]) -> Self {
        Self::new(BlockNode::List {
            list_type,
            items: items
                .iter()
                .map(|t| {
                    Self::new(BlockNode::ListItem(InlineContent::plain(t)))
                })
                .collect(),
        })
    }

    pub fn code_block(language: Option<&str>, text: &str) -> Self {
        Self::new(BlockNode::CodeBlock(
            CodeBlock::new(language.map(str::to_owned), false)
                .with_text(text),
        ))
    }

    pub fn accordion(title: &str, body: Vec<Block>, expanded: bool) -> Self {
        Self::new(BlockNode::Accordion(Accordion {
            title: InlineContent::plain(title),
            body,
            expanded,
        }))
    }

    pub fn media(media: Media) -> Self {
        Self::new(BlockNode::Media(media))
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn node(&self) -> &BlockNode {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut BlockNode {
        &mut self.node
    }

    /// Inline content of text-bearing blocks; the title for accordions.
    pub fn inline(&self) -> Option<&InlineContent> {
        match &self.node {
            BlockNode::Paragraph(c)
            | BlockNode::Heading { content: c, .. }
            | BlockNode::ListItem(c) => Some(c),
            BlockNode::Accordion(a) => Some(&a.title),
            BlockNode::TableCell(cell) => Some(&cell.content),
            _ => None,
        }
    }

    pub(crate) fn inline_mut(&mut self) -> Option<&mut InlineContent> {
        match &mut self.node {
            BlockNode::Paragraph(c)
            | BlockNode::Heading { content: c, .. }
            | BlockNode::ListItem(c) => Some(c),
            BlockNode::Accordion(a) => Some(&mut a.title),
            BlockNode::TableCell(cell) => Some(&mut cell.content),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&CodeBlock> {
        match &self.node {
            BlockNode::CodeBlock(code) => Some(code),
            _ => None,
        }
    }

    pub(crate) fn code_mut(&mut self) -> Option<&mut CodeBlock> {
        match &mut self.node {
            BlockNode::CodeBlock(code) => Some(code),
            _ => None,
        }
    }

    pub fn media_node(&self) -> Option<&Media> {
        match &self.node {
            BlockNode::Media(media) => Some(media),
            _ => None,
        }
    }

    pub fn is_code_block(&self) -> bool {
        matches!(self.node, BlockNode::CodeBlock(_))
    }

    pub fn is_media(&self) -> bool {
        matches!(self.node, BlockNode::Media(_))
    }

    /// Blocks a position can point into.
    pub fn is_leaf(&self) -> bool {
        self.inline().is_some() || self.is_code_block() || self.is_media()
    }

    /// Plain text; a media block reads as one object replacement character.
    pub fn text(&self) -> String {
        match &self.node {
            BlockNode::CodeBlock(code) => code.text(),
            BlockNode::Media(_) => "\u{fffc}".to_owned(),
            _ => self.inline().map(InlineContent::text).unwrap_or_default(),
        }
    }

    pub fn text_len(&self) -> usize {
        match &self.node {
            BlockNode::CodeBlock(code) => code.len(),
            BlockNode::Media(_) => 1,
            _ => self.inline().map(InlineContent::len).unwrap_or_default(),
        }
    }

    pub fn child_lists(&self) -> Vec<&Vec<Block>> {
        match &self.node {
            BlockNode::List { items, .. } => vec![items],
            BlockNode::Quote(children) => vec![children],
            BlockNode::Accordion(a) => vec![&a.body],
            BlockNode::Table(t) => t.rows.iter().map(|r| &r.cells).collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn child_lists_mut(&mut self) -> Vec<&mut Vec<Block>> {
        match &mut self.node {
            BlockNode::List { items, .. } => vec![items],
            BlockNode::Quote(children) => vec![children],
            BlockNode::Accordion(a) => vec![&mut a.body],
            BlockNode::Table(t) => {
                t.rows.iter_mut().map(|r| &mut r.cells).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Short tag-like name used in trees and log lines.
    pub fn kind_name(&self) -> &'static str {
        match &self.node {
            BlockNode::Paragraph(_) => "p",
            BlockNode::Heading { level, .. } => {
                ["h1", "h2", "h3", "h4", "h5", "h6"][usize::from(level.get() - 1)]
            }
            BlockNode::List { list_type, .. } => list_type.tag(),
            BlockNode::ListItem(_) => "li",
            BlockNode::Quote(_) => "blockquote",
            BlockNode::Accordion(_) => "accordion",
            BlockNode::CodeBlock(_) => "pre",
            BlockNode::Table(_) => "table",
            BlockNode::TableCell(cell) => {
                if cell.header {
                    "th"
                } else {
                    "td"
                }
            }
            BlockNode::Media(media) => media.kind.tag(),
        }
    }
}
