// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{heading_level, prefix_len, BlockRule};
use crate::command::{BlockAnchor, Command, Transaction};
use crate::dom::block::{Block, BlockId, BlockType, HeadingLevel, ListType};
use crate::dom::document::Document;
use crate::dom::position::{Position, Range};
use crate::error::EditError;

/// Runs the transform of `rule` on `block` inside one transaction.
///
/// The rule is re-checked first: the block may have changed between the
/// trigger and the deferred run, in which case nothing happens and the
/// returned caret is `None`.
pub(crate) fn apply_block_rule(
    tx: &mut Transaction<'_>,
    block: BlockId,
    rule: BlockRule,
) -> Result<Option<Position>, EditError> {
    let Some(text) = tx.doc().get(block).map(Block::text) else {
        return Ok(None);
    };
    if !rule.matches(&text) {
        return Ok(None);
    }
    tracing::debug!(target: "memo_editor::autoformat", %rule, %block, "apply");
    let caret = match rule {
        BlockRule::Heading => {
            let level = heading_level(&text).unwrap_or(1);
            strip_prefix(tx, block, &text)?;
            tx.apply(Command::SetBlockType {
                block,
                block_type: BlockType::Heading(HeadingLevel::new(level)),
            })?;
            tx.apply(Command::InsertBlocks {
                anchor: BlockAnchor::After(block),
                blocks: vec![Block::empty_paragraph()],
            })?
        }
        BlockRule::BulletList | BlockRule::OrderedList => {
            let list_type = if rule == BlockRule::BulletList {
                ListType::Unordered
            } else {
                ListType::Ordered
            };
            strip_prefix(tx, block, &text)?;
            tx.apply(Command::SetBlockType {
                block,
                block_type: BlockType::ListItem(list_type),
            })?;
            let len = tx.doc().get(block).map(Block::text_len).unwrap_or(0);
            Position::new(block, len)
        }
        BlockRule::Accordion => {
            strip_prefix(tx, block, &text)?;
            tx.apply(Command::SetBlockType {
                block,
                block_type: BlockType::Accordion,
            })?;
            let body = tx
                .doc()
                .get(block)
                .and_then(|b| b.child_lists().into_iter().next())
                .and_then(|body| body.first())
                .and_then(Document::first_leaf_of);
            body.map(|leaf| Position::new(leaf, 0))
                .unwrap_or_else(|| Position::new(block, 0))
        }
        BlockRule::CodeFence => tx.apply(Command::ReplaceBlock {
            block,
            with: vec![Block::code_block(None, "")],
        })?,
    };
    Ok(Some(caret))
}

fn strip_prefix(
    tx: &mut Transaction<'_>,
    block: BlockId,
    text: &str,
) -> Result<(), EditError> {
    let len = prefix_len(text);
    if len > 0 {
        tx.apply(Command::DeleteRange {
            range: Range::within(block, 0, len),
        })?;
    }
    Ok(())
}
