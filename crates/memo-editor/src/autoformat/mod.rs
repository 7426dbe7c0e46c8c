// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Markdown-style shortcuts.
//!
//! Block rules look at the full text of the caret block when Space or Enter
//! is typed and, when one matches, the editor schedules the transform for
//! the next tick. The inline scan and the auto-linker run on trailing
//! debounces after text input.

mod autolink;
mod inline_scan;
mod rules;

use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::{AsRefStr, Display};

use crate::dom::block::{BlockId, BlockNode};
use crate::dom::document::Document;

pub(crate) use autolink::auto_link;
pub(crate) use inline_scan::scan_inline_markdown;
pub(crate) use rules::apply_block_rule;

/// The key that can fire a block rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Activation {
    Space,
    Enter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BlockRule {
    /// `# Title` … `###### Title`
    Heading,
    /// `- item`, `* item`, `+ item`
    BulletList,
    /// `1. item`
    OrderedList,
    /// `> title`
    Accordion,
    /// A line holding only three backticks.
    CodeFence,
}

/// Every block rule, in the order they are tried.
pub const BLOCK_RULES: [BlockRule; 5] = [
    BlockRule::Heading,
    BlockRule::BulletList,
    BlockRule::OrderedList,
    BlockRule::Accordion,
    BlockRule::CodeFence,
];

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+.+").expect("valid regex"));
static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*+]\s+.+").expect("valid regex"));
static ORDERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s+.+").expect("valid regex"));
static ACCORDION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^>\s+.+").expect("valid regex"));
/// The marker part of each block pattern.
static PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#{1,6}|[-*+]|\d+\.|>)\s+").expect("valid regex")
});

impl BlockRule {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Heading => HEADING.is_match(text),
            Self::BulletList => BULLET.is_match(text),
            Self::OrderedList => ORDERED.is_match(text),
            Self::Accordion => ACCORDION.is_match(text),
            Self::CodeFence => text.trim() == "```",
        }
    }

    pub fn fires_on(&self, activation: Activation) -> bool {
        match self {
            Self::BulletList | Self::OrderedList => true,
            Self::Heading | Self::Accordion | Self::CodeFence => {
                activation == Activation::Enter
            }
        }
    }
}

/// Number of characters of markdown marker at the start of `text`.
pub(crate) fn prefix_len(text: &str) -> usize {
    PREFIX
        .find(text)
        .map(|m| text[..m.end()].chars().count())
        .unwrap_or(0)
}

/// Level of a `#` heading marker.
pub(crate) fn heading_level(text: &str) -> Option<u8> {
    HEADING
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| u8::try_from(m.as_str().len()).ok())
}

/// The rule the block at `block` fires for `activation`, if any.
///
/// Code blocks never autoformat; list rules do not fire inside a list item
/// and the accordion rule does not fire anywhere inside an accordion.
pub fn detect_block_rule(
    doc: &Document,
    block: BlockId,
    activation: Activation,
) -> Option<BlockRule> {
    let node = doc.get(block)?;
    match node.node() {
        BlockNode::Paragraph(_)
        | BlockNode::Heading { .. }
        | BlockNode::ListItem(_) => {}
        _ => return None,
    }
    let in_list_item = matches!(node.node(), BlockNode::ListItem(_));
    let in_accordion = doc.ancestors(block).into_iter().any(|id| {
        doc.get(id)
            .is_some_and(|b| matches!(b.node(), BlockNode::Accordion(_)))
    });
    let text = node.text();
    BLOCK_RULES.into_iter().find(|rule| {
        let allowed = match rule {
            BlockRule::BulletList | BlockRule::OrderedList => !in_list_item,
            BlockRule::Accordion => !in_accordion,
            _ => true,
        };
        allowed && rule.fires_on(activation) && rule.matches(&text)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dom::block::{Block, ListType};

    fn detect(blocks: Vec<Block>, leaf: usize, activation: Activation) -> Option<BlockRule> {
        let doc = Document::from_blocks(blocks);
        let id = doc.leaves()[leaf];
        detect_block_rule(&doc, id, activation)
    }

    #[test]
    fn heading_fires_on_enter_only() {
        let blocks = || vec![Block::paragraph("## Title")];
        assert_eq!(detect(blocks(), 0, Activation::Enter), Some(BlockRule::Heading));
        assert_eq!(detect(blocks(), 0, Activation::Space), None);
        assert_eq!(heading_level("## Title"), Some(2));
        assert_eq!(prefix_len("## Title"), 3);
    }

    #[test]
    fn list_rules_fire_on_space_and_enter() {
        for activation in [Activation::Space, Activation::Enter] {
            assert_eq!(
                detect(vec![Block::paragraph("- item")], 0, activation),
                Some(BlockRule::BulletList)
            );
            assert_eq!(
                detect(vec![Block::paragraph("12. item")], 0, activation),
                Some(BlockRule::OrderedList)
            );
        }
        assert_eq!(detect(vec![Block::paragraph("- ")], 0, Activation::Space), None);
    }

    #[test]
    fn seven_hashes_are_not_a_heading() {
        assert_eq!(
            detect(vec![Block::paragraph("####### x")], 0, Activation::Enter),
            None
        );
    }

    #[test]
    fn accordion_rule_is_skipped_inside_an_accordion() {
        let blocks = vec![Block::accordion(
            "t",
            vec![Block::paragraph("> nested")],
            true,
        )];
        assert_eq!(detect(blocks, 1, Activation::Enter), None);
        assert_eq!(
            detect(vec![Block::paragraph("> note")], 0, Activation::Enter),
            Some(BlockRule::Accordion)
        );
    }

    #[test]
    fn code_blocks_and_list_items_are_left_alone() {
        assert_eq!(
            detect(vec![Block::code_block(None, "# x")], 0, Activation::Enter),
            None
        );
        assert_eq!(
            detect(vec![Block::list(ListType::Unordered, &["- x"])], 0, Activation::Space),
            None
        );
        assert_eq!(
            detect(vec![Block::paragraph(" ``` ")], 0, Activation::Enter),
            Some(BlockRule::CodeFence)
        );
    }
}
