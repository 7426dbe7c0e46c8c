// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Reading the change feed for damage to code blocks.

use crate::change_feed::ChangeRecord;
use crate::command::Origin;
use crate::dom::block::{Block, BlockId, BlockNode};
use crate::dom::document::Document;

/// What the change feed asks the editor to do about a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Repair {
    /// A near-empty block right after `into` is the remains of a split
    /// code block: fold it back as a newline.
    MergeSplit { into: BlockId, split: BlockId },
    /// Stray line breaks inside a code block.
    NormalizeBreaks(BlockId),
    /// The code block changed outside the typing path.
    Rehighlight(BlockId),
}

/// Plans repairs for queued records against the settled document.
///
/// Records caused by the highlighter or by earlier repairs are skipped.
/// Structural checks only apply to changes the engine did not make itself
/// (platform and clipboard origins); other origins only get their line
/// breaks normalized.
pub(crate) fn plan_repairs(doc: &Document, records: &[ChangeRecord]) -> Vec<Repair> {
    let mut repairs = Vec::new();
    for record in records {
        if record.origin.is_self_inflicted() {
            continue;
        }
        let uncontrolled =
            matches!(record.origin, Origin::Platform | Origin::Clipboard);
        for id in record.touched_blocks() {
            let Some(block) = doc.get(id) else {
                continue;
            };
            if let Some(code) = block.code() {
                if code.has_line_breaks() {
                    push(&mut repairs, Repair::NormalizeBreaks(id));
                }
            }
            if !uncontrolled {
                continue;
            }
            if let Some(into) = split_remains_of(doc, block) {
                push(&mut repairs, Repair::MergeSplit { into, split: id });
                push(&mut repairs, Repair::Rehighlight(into));
            } else if block.is_code_block() {
                push(&mut repairs, Repair::Rehighlight(id));
            }
        }
    }
    repairs
}

fn push(repairs: &mut Vec<Repair>, repair: Repair) {
    if !repairs.contains(&repair) {
        repairs.push(repair);
    }
}

/// The code block `block` was split off from, if `block` looks like the
/// near-empty second half the platform leaves behind.
fn split_remains_of(doc: &Document, block: &Block) -> Option<BlockId> {
    let near_empty = match block.node() {
        BlockNode::CodeBlock(code) => code.text().trim().is_empty(),
        BlockNode::Paragraph(content) => content.text().trim().is_empty(),
        _ => false,
    };
    if !near_empty {
        return None;
    }
    let previous = doc.previous_sibling(block.id())?;
    let code = doc.get(previous)?.code()?;
    (!code.no_highlight).then_some(previous)
}
