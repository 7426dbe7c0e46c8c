// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::time::Duration;

use unicode_segmentation::UnicodeSegmentation;

use super::Editor;
use crate::autoformat::{
    apply_block_rule, auto_link, detect_block_rule, scan_inline_markdown,
    Activation, BlockRule,
};
use crate::command::{Command, Origin, Transaction};
use crate::dom::block::{Block, BlockId, BlockNode, BlockType};
use crate::dom::document::Document;
use crate::dom::inline::{InlineContent, InlineNode};
use crate::dom::position::{Position, Range};
use crate::error::EditError;
use crate::scheduler::Task;

const TARGET: &str = "memo_editor::autoformat";

/// An editing intent from the platform, as `beforeinput` reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    InsertText(String),
    /// Shift+Enter.
    InsertLineBreak,
    /// Enter.
    InsertParagraph,
    DeleteBackward,
    DeleteForward,
}

impl InputEvent {
    /// Maps a DOM `inputType` onto an event. Types the engine does not
    /// handle itself give `None`.
    pub fn from_input_type(input_type: &str, data: Option<&str>) -> Option<Self> {
        match input_type {
            "insertText" | "insertReplacementText" => {
                data.map(|d| Self::InsertText(d.to_owned()))
            }
            "insertLineBreak" => Some(Self::InsertLineBreak),
            "insertParagraph" => Some(Self::InsertParagraph),
            "deleteContentBackward" => Some(Self::DeleteBackward),
            "deleteContentForward" => Some(Self::DeleteForward),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    /// Applied to the model. The host re-renders and suppresses the
    /// platform default.
    Handled,
    /// Refused; the document is unchanged. The platform default must be
    /// suppressed too.
    Rejected(EditError),
    /// Nothing for the engine to do; the platform may carry on.
    Ignored,
}

/// What Enter does in a block that no rule fires for.
enum EnterAction {
    Split,
    ToParagraph,
    IntoBody {
        accordion: BlockId,
        expanded: bool,
        body: Option<BlockId>,
    },
    LineBreak,
}

impl Editor {
    /// Handles one editing intent at the current selection.
    pub fn handle_input(&mut self, event: InputEvent) -> InputOutcome {
        let range = self.selection_range();
        let in_code = self.doc.is_code_block(range.start.block);
        let result = match event {
            InputEvent::InsertText(text) if text.is_empty() => {
                Ok(InputOutcome::Ignored)
            }
            InputEvent::InsertText(text) if in_code => self.code_insert(range, &text),
            InputEvent::InsertText(text) => self.type_text(range, &text),
            InputEvent::InsertLineBreak | InputEvent::InsertParagraph if in_code => {
                self.code_insert(range, "\n")
            }
            InputEvent::InsertLineBreak => self.soft_break(range),
            InputEvent::InsertParagraph => self.enter(range),
            InputEvent::DeleteBackward => self.delete_backward(range),
            InputEvent::DeleteForward => self.delete_forward(range),
        };
        result.unwrap_or_else(|e| {
            tracing::debug!(target: "memo_editor::command", error = %e, "input refused");
            InputOutcome::Rejected(e)
        })
    }

    /// Direct splice into a code block, re-highlighted once typing stops.
    fn code_insert(&mut self, range: Range, text: &str) -> Result<InputOutcome, EditError> {
        self.transact(Origin::User, |tx| {
            let at = collapse(tx, range)?;
            tx.apply(Command::InsertText {
                at,
                text: text.to_owned(),
            })
            .map(Some)
        })?;
        self.after_code_change();
        Ok(InputOutcome::Handled)
    }

    fn type_text(&mut self, range: Range, text: &str) -> Result<InputOutcome, EditError> {
        let pending = self.pending_formats.clone();
        self.transact(Origin::User, |tx| {
            let at = collapse(tx, range)?;
            if pending.is_empty() {
                return tx
                    .apply(Command::InsertText {
                        at,
                        text: text.to_owned(),
                    })
                    .map(Some);
            }
            let mut style = tx
                .doc()
                .get(at.block)
                .and_then(Block::inline)
                .map(|c| c.inherited_style(at.offset))
                .unwrap_or_default();
            for (attr, on) in &pending {
                if *on {
                    style.apply(attr);
                } else {
                    style.clear(attr.key());
                }
            }
            tx.apply(Command::InsertInline {
                at,
                content: InlineContent::styled(text, style),
            })
            .map(Some)
        })?;
        self.pending_formats.clear();

        if self.doc.is_code_block(self.selection.focus.block) {
            self.after_code_change();
            return Ok(InputOutcome::Handled);
        }
        self.schedule_text_scans();
        if text.ends_with(' ') {
            let block = self.selection.focus.block;
            if let Some(rule) = detect_block_rule(&self.doc, block, Activation::Space) {
                self.scheduler.schedule(
                    self.now,
                    Duration::ZERO,
                    Task::Autoformat { block, rule },
                );
            }
        }
        Ok(InputOutcome::Handled)
    }

    pub(crate) fn schedule_text_scans(&mut self) {
        self.scheduler
            .schedule(self.now, self.config.inline_scan_delay, Task::InlineScan);
        self.scheduler
            .schedule(self.now, self.config.auto_link_delay, Task::AutoLink);
    }

    pub(super) fn after_code_change(&mut self) {
        let block = self.selection.focus.block;
        if self.doc.is_code_block(block) {
            self.note_code_edit(block);
        }
    }

    fn soft_break(&mut self, range: Range) -> Result<InputOutcome, EditError> {
        self.transact(Origin::User, |tx| {
            let at = collapse(tx, range)?;
            tx.apply(Command::InsertInline {
                at,
                content: InlineContent::from_nodes(vec![InlineNode::LineBreak]),
            })
            .map(Some)
        })?;
        Ok(InputOutcome::Handled)
    }

    fn enter(&mut self, range: Range) -> Result<InputOutcome, EditError> {
        if range.is_collapsed() {
            let block = range.start.block;
            if let Some(rule) = detect_block_rule(&self.doc, block, Activation::Enter) {
                self.scheduler.schedule(
                    self.now,
                    Duration::ZERO,
                    Task::Autoformat { block, rule },
                );
                return Ok(InputOutcome::Handled);
            }
        }
        self.transact(Origin::User, |tx| {
            let at = collapse(tx, range)?;
            let action = enter_action(tx.doc(), at.block)?;
            match action {
                EnterAction::Split => tx.apply(Command::SplitBlock { at }).map(Some),
                EnterAction::ToParagraph => tx
                    .apply(Command::SetBlockType {
                        block: at.block,
                        block_type: BlockType::Paragraph,
                    })
                    .map(Some),
                EnterAction::IntoBody {
                    accordion,
                    expanded,
                    body,
                } => {
                    if !expanded {
                        tx.apply(Command::SetAccordionExpanded {
                            block: accordion,
                            expanded: true,
                        })?;
                    }
                    Ok(body.map(|leaf| Position::new(leaf, 0)))
                }
                EnterAction::LineBreak => tx
                    .apply(Command::InsertInline {
                        at,
                        content: InlineContent::from_nodes(vec![InlineNode::LineBreak]),
                    })
                    .map(Some),
            }
        })?;
        Ok(InputOutcome::Handled)
    }

    fn delete_backward(&mut self, range: Range) -> Result<InputOutcome, EditError> {
        if !range.is_collapsed() {
            return self.delete_selection(range);
        }
        let at = range.start;
        let block = self
            .doc
            .get(at.block)
            .ok_or_else(|| EditError::invalid("caret is not in the document"))?;

        if block.is_media() {
            return self.remove(at.block);
        }
        if at.offset > 0 {
            let from = previous_boundary(&block.text(), at.offset);
            return self.delete_selection(Range::within(at.block, from, at.offset));
        }
        let to_paragraph = match block.node() {
            BlockNode::CodeBlock(code) => code.is_empty(),
            BlockNode::ListItem(_) | BlockNode::Heading { .. } => true,
            _ => false,
        };
        if to_paragraph {
            self.transact(Origin::User, |tx| {
                tx.apply(Command::SetBlockType {
                    block: at.block,
                    block_type: BlockType::Paragraph,
                })
                .map(Some)
            })?;
            return Ok(InputOutcome::Handled);
        }
        if block.is_code_block() {
            return Ok(InputOutcome::Ignored);
        }

        let Some(previous) = self.previous_leaf(at.block) else {
            return Ok(InputOutcome::Ignored);
        };
        if self.doc.ancestors(at.block).contains(&previous) {
            return Ok(InputOutcome::Ignored);
        }
        let previous_block = self.doc.get(previous);
        if previous_block.is_some_and(Block::is_media) {
            return self.remove(previous);
        }
        self.transact(Origin::User, |tx| {
            tx.apply(Command::MergeBlocks {
                first: previous,
                second: at.block,
            })
            .map(Some)
        })?;
        Ok(InputOutcome::Handled)
    }

    fn delete_forward(&mut self, range: Range) -> Result<InputOutcome, EditError> {
        if !range.is_collapsed() {
            return self.delete_selection(range);
        }
        let at = range.start;
        let block = self
            .doc
            .get(at.block)
            .ok_or_else(|| EditError::invalid("caret is not in the document"))?;

        if block.is_media() {
            return self.remove(at.block);
        }
        let len = block.text_len();
        if at.offset < len {
            let to = next_boundary(&block.text(), at.offset);
            return self.delete_selection(Range::within(at.block, at.offset, to));
        }
        let Some(next) = self.next_leaf(at.block) else {
            return Ok(InputOutcome::Ignored);
        };
        if self.doc.get(next).is_some_and(Block::is_media) {
            return self.remove(next);
        }
        if self.doc.ancestors(next).contains(&at.block) {
            return Ok(InputOutcome::Ignored);
        }
        self.transact(Origin::User, |tx| {
            tx.apply(Command::MergeBlocks {
                first: at.block,
                second: next,
            })?;
            Ok(Some(at))
        })?;
        self.after_code_change();
        Ok(InputOutcome::Handled)
    }

    /// Deletes `range`, which may sit inside one block or span several.
    fn delete_selection(&mut self, range: Range) -> Result<InputOutcome, EditError> {
        self.transact(Origin::User, |tx| {
            tx.apply(Command::DeleteRange { range }).map(Some)
        })?;
        self.after_code_change();
        Ok(InputOutcome::Handled)
    }

    fn remove(&mut self, block: BlockId) -> Result<InputOutcome, EditError> {
        self.transact(Origin::User, |tx| {
            tx.apply(Command::RemoveBlock { block }).map(Some)
        })?;
        Ok(InputOutcome::Handled)
    }

    fn previous_leaf(&self, id: BlockId) -> Option<BlockId> {
        let leaves = self.doc.leaves();
        let index = leaves.iter().position(|l| *l == id)?;
        index.checked_sub(1).map(|i| leaves[i])
    }

    fn next_leaf(&self, id: BlockId) -> Option<BlockId> {
        let leaves = self.doc.leaves();
        let index = leaves.iter().position(|l| *l == id)?;
        leaves.get(index + 1).copied()
    }

    pub(crate) fn run_autoformat(&mut self, block: BlockId, rule: BlockRule) {
        if !self.doc.contains(block) {
            return;
        }
        let result = self.transact(Origin::Autoformat, |tx| {
            apply_block_rule(tx, block, rule)
        });
        match result {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::trace!(target: TARGET, %rule, %block, "rule no longer matches")
            }
            Err(e) => tracing::debug!(target: TARGET, %rule, error = %e, "rule refused"),
        }
    }

    pub(crate) fn run_inline_scan(&mut self) {
        let mut rewritten = 0;
        let result = self.transact(Origin::Autoformat, |tx| {
            rewritten = scan_inline_markdown(tx)?;
            Ok(None)
        });
        match result {
            Ok(_) if rewritten > 0 => {
                tracing::debug!(target: TARGET, rewritten, "inline markdown converted")
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(target: TARGET, error = %e, "inline scan refused"),
        }
    }

    pub(crate) fn run_auto_link(&mut self) {
        let mut linked = 0;
        let result = self.transact(Origin::Autoformat, |tx| {
            linked = auto_link(tx)?;
            Ok(None)
        });
        match result {
            Ok(_) if linked > 0 => tracing::debug!(target: TARGET, linked, "links created"),
            Ok(_) => {}
            Err(e) => tracing::debug!(target: TARGET, error = %e, "auto-link refused"),
        }
    }
}

/// Deletes a non-collapsed range, giving the caret left behind.
pub(crate) fn collapse(tx: &mut Transaction<'_>, range: Range) -> Result<Position, EditError> {
    if range.is_collapsed() {
        Ok(range.start)
    } else {
        tx.apply(Command::DeleteRange { range })
    }
}

fn enter_action(doc: &Document, id: BlockId) -> Result<EnterAction, EditError> {
    let block = doc
        .get(id)
        .ok_or_else(|| EditError::invalid(format!("block {id} is not attached")))?;
    let empty = block.text().trim().is_empty();
    Ok(match block.node() {
        BlockNode::ListItem(_) | BlockNode::Heading { .. } if empty => {
            EnterAction::ToParagraph
        }
        BlockNode::Accordion(accordion) => EnterAction::IntoBody {
            accordion: id,
            expanded: accordion.expanded,
            body: accordion.body.first().and_then(Document::first_leaf_of),
        },
        BlockNode::TableCell(_) => EnterAction::LineBreak,
        _ => EnterAction::Split,
    })
}

/// Char offsets of the grapheme boundaries of `text`.
fn grapheme_bounds(text: &str) -> Vec<usize> {
    let mut bounds = vec![0];
    let mut offset = 0;
    for grapheme in text.graphemes(true) {
        offset += grapheme.chars().count();
        bounds.push(offset);
    }
    bounds
}

fn previous_boundary(text: &str, offset: usize) -> usize {
    grapheme_bounds(text)
        .into_iter()
        .rev()
        .find(|b| *b < offset)
        .unwrap_or(0)
}

fn next_boundary(text: &str, offset: usize) -> usize {
    grapheme_bounds(text)
        .into_iter()
        .find(|b| *b > offset)
        .unwrap_or(offset)
}
