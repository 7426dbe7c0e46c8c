// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The command layer: the only way the document is mutated.
//!
//! Every mutation is a [`Command`] applied inside a [`Transaction`] that
//! carries the [`Origin`] of the change. A transaction either commits all of
//! its commands or, when one fails, is rolled back by the caller restoring
//! its copy of the document. Each command reports [`Effect`]s, which are
//! used both to map selections through the change and as the payload of the
//! change feed.

mod block_ops;
mod formatting;
mod mapping;
mod text_ops;

use strum_macros::{AsRefStr, Display};

use crate::dom::block::{Block, BlockId, BlockType, Media};
use crate::dom::code_block::CodeBlock;
use crate::dom::document::Document;
use crate::dom::inline::{InlineContent, StyleAttr, StyleKey};
use crate::dom::position::{Position, Range};
use crate::error::EditError;

pub use mapping::map_position;

/// Who caused a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Origin {
    /// Direct user input handled by the editor.
    User,
    /// A markdown-style rule firing.
    Autoformat,
    /// The syntax highlighter rebuilding a code block.
    Highlighter,
    /// Self-repair of platform damage.
    Repair,
    /// Undo or redo.
    History,
    /// An uncontrolled mutation the host reported after the fact.
    Platform,
    Clipboard,
    /// Toolbar actions and other API calls.
    Programmatic,
}

impl Origin {
    /// Mutations from these origins never create undo entries.
    pub fn skips_history(&self) -> bool {
        matches!(self, Self::Highlighter | Self::Repair | Self::History)
    }

    /// Mutations the change feed must not react to.
    pub fn is_self_inflicted(&self) -> bool {
        matches!(self, Self::Highlighter | Self::Repair)
    }

    /// Blocks removed by these origins stay removed. A rebuilt code block
    /// that disappears any other way is restored by the post-rebuild check.
    pub fn removes_deliberately(&self) -> bool {
        !matches!(self, Self::Highlighter | Self::Platform)
    }
}

/// Where `InsertBlocks` puts its blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockAnchor {
    Before(BlockId),
    After(BlockId),
    /// After the last top-level block.
    End,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    InsertText {
        at: Position,
        text: String,
    },
    DeleteRange {
        range: Range,
    },
    SetBlockType {
        block: BlockId,
        block_type: BlockType,
    },
    WrapInline {
        range: Range,
        style: StyleAttr,
    },
    UnwrapInline {
        range: Range,
        key: StyleKey,
    },
    InsertEmbed {
        at: Position,
        embed: Media,
    },
    /// Inserts already-styled inline content at a caret.
    InsertInline {
        at: Position,
        content: InlineContent,
    },
    SplitBlock {
        at: Position,
    },
    InsertBlocks {
        anchor: BlockAnchor,
        blocks: Vec<Block>,
    },
    RemoveBlock {
        block: BlockId,
    },
    ReplaceBlock {
        block: BlockId,
        with: Vec<Block>,
    },
    /// Appends the content of `second` to `first` and removes `second`.
    MergeBlocks {
        first: BlockId,
        second: BlockId,
    },
    ReplaceCodeContent {
        block: BlockId,
        code: CodeBlock,
    },
    NormalizeLineBreaks {
        block: BlockId,
    },
    SetAccordionExpanded {
        block: BlockId,
        expanded: bool,
    },
}

/// What a command changed, in terms positions can be mapped through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    TextInserted {
        block: BlockId,
        offset: usize,
        len: usize,
    },
    TextDeleted {
        block: BlockId,
        from: usize,
        to: usize,
    },
    Restyled {
        block: BlockId,
        from: usize,
        to: usize,
    },
    BlockSplit {
        block: BlockId,
        offset: usize,
        new_block: BlockId,
    },
    /// `from` was appended to `into` at `offset` and no longer exists.
    BlocksMerged {
        into: BlockId,
        from: BlockId,
        offset: usize,
    },
    BlocksInserted {
        blocks: Vec<BlockId>,
    },
    BlockRemoved {
        block: BlockId,
    },
    /// The block kind or a block-level attribute changed in place.
    BlockChanged {
        block: BlockId,
    },
    CodeReplaced {
        block: BlockId,
    },
}

impl Effect {
    /// Blocks whose content this effect touched.
    pub fn blocks(&self) -> Vec<BlockId> {
        match self {
            Self::TextInserted { block, .. }
            | Self::TextDeleted { block, .. }
            | Self::Restyled { block, .. }
            | Self::BlockRemoved { block }
            | Self::BlockChanged { block }
            | Self::CodeReplaced { block } => vec![*block],
            Self::BlockSplit {
                block, new_block, ..
            } => vec![*block, *new_block],
            Self::BlocksMerged { into, from, .. } => vec![*into, *from],
            Self::BlocksInserted { blocks } => blocks.clone(),
        }
    }
}

/// The outcome of a committed command or batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied {
    pub caret: Position,
    pub effects: Vec<Effect>,
}

impl Command {
    /// Applies the command to a bare document, leaving it untouched if the
    /// command fails.
    pub fn apply_to(
        self,
        doc: &mut Document,
        origin: Origin,
    ) -> Result<Applied, EditError> {
        let backup = doc.clone();
        let mut tx = Transaction::new(doc, origin, &[]);
        match tx.apply(self) {
            Ok(caret) => Ok(Applied {
                caret,
                effects: tx.into_effects(),
            }),
            Err(e) => {
                *doc = backup;
                Err(e)
            }
        }
    }
}

/// A batch of commands sharing one origin. The editor snapshots the
/// document before opening one and restores it if any command fails.
pub(crate) struct Transaction<'a> {
    pub(crate) doc: &'a mut Document,
    origin: Origin,
    /// Code blocks that refuse text, because they are still being inserted.
    locked: &'a [BlockId],
    effects: Vec<Effect>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        doc: &'a mut Document,
        origin: Origin,
        locked: &'a [BlockId],
    ) -> Self {
        Self {
            doc,
            origin,
            locked,
            effects: Vec::new(),
        }
    }

    pub(crate) fn doc(&self) -> &Document {
        self.doc
    }

    pub(crate) fn into_effects(self) -> Vec<Effect> {
        self.effects
    }

    fn record(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    fn is_locked(&self, block: BlockId) -> bool {
        self.locked.contains(&block)
            && !matches!(
                self.origin,
                Origin::Highlighter | Origin::Repair | Origin::Programmatic
            )
    }

    /// Applies one command and returns where the caret should go.
    pub(crate) fn apply(&mut self, cmd: Command) -> Result<Position, EditError> {
        tracing::trace!(
            target: "memo_editor::command",
            origin = %self.origin,
            ?cmd,
            "apply"
        );
        let caret = match cmd {
            Command::InsertText { at, text } => self.insert_text(at, &text)?,
            Command::InsertInline { at, content } => {
                self.insert_inline(at, content)?
            }
            Command::DeleteRange { range } => self.delete_range(range)?,
            Command::SetBlockType { block, block_type } => {
                self.set_block_type(block, block_type)?
            }
            Command::WrapInline { range, style } => {
                self.wrap_inline(range, &style)?
            }
            Command::UnwrapInline { range, key } => {
                self.unwrap_inline(range, key)?
            }
            Command::InsertEmbed { at, embed } => self.insert_embed(at, embed)?,
            Command::SplitBlock { at } => self.split_block(at)?,
            Command::InsertBlocks { anchor, blocks } => {
                self.insert_blocks(anchor, blocks)?
            }
            Command::RemoveBlock { block } => self.remove_block(block)?,
            Command::ReplaceBlock { block, with } => {
                self.replace_block(block, with)?
            }
            Command::MergeBlocks { first, second } => {
                self.merge_blocks(first, second)?
            }
            Command::ReplaceCodeContent { block, code } => {
                self.replace_code_content(block, code)?
            }
            Command::NormalizeLineBreaks { block } => {
                self.normalize_line_breaks(block)?
            }
            Command::SetAccordionExpanded { block, expanded } => {
                self.set_accordion_expanded(block, expanded)?
            }
        };
        self.doc.ensure_structure();
        Ok(self
            .doc
            .clamp(caret)
            .unwrap_or_else(|| self.doc.start()))
    }

    /// Ids of `block` and every block nested in it.
    fn subtree_ids(block: &Block) -> Vec<BlockId> {
        let mut out = vec![block.id()];
        for list in block.child_lists() {
            for child in list {
                out.extend(Self::subtree_ids(child));
            }
        }
        out
    }

    fn record_removed(&mut self, block: &Block) {
        for id in Self::subtree_ids(block) {
            self.record(Effect::BlockRemoved { block: id });
        }
    }

    /// Caret at the end of the leaf before `id` and its subtree, or at the
    /// start of the leaf after them.
    fn caret_near(&self, id: BlockId) -> Position {
        let Some(block) = self.doc.get(id) else {
            return self.doc.start();
        };
        let (Some(first), Some(last)) =
            (Document::first_leaf_of(block), Document::last_leaf_of(block))
        else {
            return self.doc.start();
        };
        let leaves = self.doc.leaves();
        let (Some(fi), Some(li)) = (
            leaves.iter().position(|l| *l == first),
            leaves.iter().position(|l| *l == last),
        ) else {
            return self.doc.start();
        };
        if let Some(prev) = fi.checked_sub(1).map(|i| leaves[i]) {
            let len = self.doc.get(prev).map(Block::text_len).unwrap_or(0);
            return Position::new(prev, len);
        }
        leaves
            .get(li + 1)
            .map(|next| Position::new(*next, 0))
            .unwrap_or_else(|| self.doc.start())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn failed_commands_leave_the_document_untouched() {
        let mut doc = Document::from_blocks(vec![Block::paragraph("abc")]);
        let before = doc.clone();
        let leaf = doc.leaves()[0];
        let result = Command::InsertText {
            at: Position::new(leaf, 9),
            text: "x".into(),
        }
        .apply_to(&mut doc, Origin::User);
        assert!(matches!(result, Err(EditError::InvalidRange(_))));
        assert_eq!(doc, before);
    }

    #[test]
    fn origins_that_skip_history() {
        assert!(Origin::Highlighter.skips_history());
        assert!(Origin::Repair.skips_history());
        assert!(!Origin::Platform.skips_history());
        assert!(Origin::Repair.is_self_inflicted());
        assert!(!Origin::History.is_self_inflicted());
        assert!(Origin::User.removes_deliberately());
        assert!(Origin::Clipboard.removes_deliberately());
        assert!(!Origin::Platform.removes_deliberately());
        assert!(!Origin::Highlighter.removes_deliberately());
        assert_eq!(Origin::Autoformat.to_string(), "autoformat");
    }
}
