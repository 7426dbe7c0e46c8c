// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Code-block highlighting, platform-damage repair and programmatic
//! insertion, driven by the scheduler and the change feed.

use std::time::Duration;

use super::Editor;
use crate::change_feed::PlatformMutation;
use crate::code_block::{
    plan_repairs, rebuild, Activity, CachedBlock, CodePhase, Repair,
};
use crate::command::{BlockAnchor, Command, Origin};
use crate::dom::block::{Block, BlockId, BlockNode};
use crate::dom::code_block::CodeBlock;
use crate::dom::document::Document;
use crate::dom::inline::{InlineContent, InlineNode};
use crate::dom::parser::parse_blocks_lenient;
use crate::dom::position::Position;
use crate::error::EditError;
use crate::scheduler::Task;

const TARGET: &str = "memo_editor::code_block";

/// How long after a rebuild the block is checked to still be attached.
const FRAME: Duration = Duration::from_millis(16);

impl Editor {
    /// Text changed inside `block`: it is stale until the idle debounce
    /// runs out.
    pub(crate) fn note_code_edit(&mut self, block: BlockId) {
        self.code.mark_stale(block, self.now);
        self.scheduler.schedule(
            self.now,
            self.config.highlight_debounce,
            Task::Highlight(block),
        );
    }

    /// Rebuilds `block` with highlight markup. Blocks that are already
    /// highlighted are skipped unless `force` is set. Returns whether the
    /// block ended up highlighted.
    pub(crate) fn highlight_block(&mut self, block: BlockId, force: bool) -> bool {
        let phase = self.code.phase(block);
        if phase == CodePhase::Inserting || (!force && phase.is_highlighted()) {
            return false;
        }
        let Some(code) = self.doc.get(block).and_then(Block::code).cloned() else {
            return false;
        };
        let rebuilt = {
            let Some(highlighter) = self.highlighter.as_deref() else {
                return false;
            };
            if !self.code.try_acquire(Activity::Highlighting, self.now) {
                return false;
            }
            rebuild(&code, highlighter)
        };
        let done = match rebuilt {
            Ok(Some(highlighted)) => self.apply_highlight(block, highlighted),
            Ok(None) => {
                self.code.set_phase(block, CodePhase::Plain);
                false
            }
            Err(e) => {
                tracing::warn!(target: TARGET, %block, error = %e, "highlighting failed");
                self.code.set_phase(block, CodePhase::Plain);
                false
            }
        };
        self.code.release(Activity::Highlighting);
        done
    }

    fn apply_highlight(&mut self, block: BlockId, code: CodeBlock) -> bool {
        let caret = (self.selection.is_collapsed()
            && self.selection.focus.block == block)
            .then_some(self.selection.focus.offset);
        self.code.cache(
            block,
            CachedBlock {
                text: code.text(),
                language: code.language.clone(),
                previous: self.doc.previous_sibling(block),
                parent: self.doc.parent_of(block),
            },
        );
        let unchanged = self.doc.get(block).and_then(Block::code) == Some(&code);
        if !unchanged {
            let result =
                self.transact(Origin::Highlighter, |tx| {
                    tx.apply(Command::ReplaceCodeContent { block, code })?;
                    Ok(caret.map(|offset| Position::new(block, offset)))
                });
            if let Err(e) = result {
                tracing::warn!(target: TARGET, %block, error = %e, "rebuild refused");
                return false;
            }
        }
        self.code.set_phase(block, CodePhase::Highlighted);
        tracing::debug!(target: TARGET, %block, "highlighted");
        self.scheduler
            .schedule(self.now, FRAME, Task::PostRebuildCheck(block));
        true
    }

    /// Highlights stale blocks the caret is not in.
    pub(crate) fn check_exit(&mut self) {
        let caret_block = self.focused.then_some(self.selection.focus.block);
        for block in self.code.stale_blocks() {
            if Some(block) == caret_block {
                continue;
            }
            self.scheduler.cancel(Task::Highlight(block).key());
            self.highlight_block(block, false);
        }
    }

    pub(crate) fn rehighlight_all(&mut self) {
        for block in self.doc.code_block_ids() {
            let phase = self.code.phase(block);
            if phase.is_highlighted() || phase == CodePhase::Inserting {
                continue;
            }
            self.highlight_block(block, true);
        }
    }

    /// Reads queued change records and repairs what the platform broke.
    /// Deferred while a code block is being inserted.
    pub(crate) fn flush_changes(&mut self) {
        if self.feed.is_empty() || self.code.is_busy_with(Activity::InsertingCodeBlock) {
            return;
        }
        let records = self.feed.drain();
        for repair in plan_repairs(&self.doc, &records) {
            self.apply_repair(repair);
        }
    }

    fn apply_repair(&mut self, repair: Repair) {
        tracing::debug!(target: TARGET, ?repair, "repair");
        let result = match repair {
            Repair::MergeSplit { into, split } => {
                tracing::warn!(
                    target: TARGET,
                    error = %EditError::StructuralCorruption(into),
                    %split,
                    "folding split code block back"
                );
                let merged = self.transact(Origin::Repair, |tx| {
                    let len = tx.doc().get(into).map(Block::text_len).unwrap_or(0);
                    tx.apply(Command::InsertText {
                        at: Position::new(into, len),
                        text: "\n".into(),
                    })?;
                    tx.apply(Command::RemoveBlock { block: split })?;
                    Ok(Some(Position::new(into, len + 1)))
                });
                if merged.is_ok() {
                    self.note_code_edit(into);
                }
                merged.map(drop)
            }
            Repair::NormalizeBreaks(block) => self
                .transact(Origin::Repair, |tx| {
                    tx.apply(Command::NormalizeLineBreaks { block })?;
                    Ok(None)
                })
                .map(drop),
            Repair::Rehighlight(block) => {
                self.code.mark_stale(block, self.now);
                self.scheduler.schedule(
                    self.now,
                    self.config.rehighlight_delay,
                    Task::RehighlightAll,
                );
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::debug!(target: TARGET, error = %e, "repair skipped");
        }
    }

    /// A rebuilt block that went missing is put back from the cache.
    pub(crate) fn post_rebuild_check(&mut self, block: BlockId) {
        if self.doc.contains(block) {
            self.code.take_cached(block);
            return;
        }
        let Some(cached) = self.code.take_cached(block) else {
            return;
        };
        tracing::warn!(
            target: TARGET,
            error = %EditError::StructuralCorruption(block),
            "rebuilt code block vanished, restoring it"
        );
        let anchor = self.restore_anchor(&cached);
        let make = || {
            Block::new(BlockNode::CodeBlock(
                CodeBlock::new(cached.language.clone(), false).with_text(&cached.text),
            ))
        };
        let mut restored = None;
        let mut insert = |editor: &mut Editor, anchor: BlockAnchor| {
            editor.transact(Origin::Repair, |tx| {
                let caret = tx.apply(Command::InsertBlocks {
                    anchor,
                    blocks: vec![make()],
                })?;
                restored = Some(caret.block);
                Ok(None)
            })
        };
        if insert(self, anchor).is_err() && insert(self, BlockAnchor::End).is_err() {
            return;
        }
        if let Some(id) = restored {
            self.highlight_block(id, true);
        }
    }

    fn restore_anchor(&self, cached: &CachedBlock) -> BlockAnchor {
        if let Some(previous) = cached.previous.filter(|p| self.doc.contains(*p)) {
            return BlockAnchor::After(previous);
        }
        cached
            .parent
            .and_then(|p| self.doc.get(p))
            .and_then(|parent| parent.child_lists().into_iter().next()?.last())
            .map(|last| BlockAnchor::After(last.id()))
            .unwrap_or(BlockAnchor::End)
    }

    /// Inserts an empty code block next to the caret's top-level block and
    /// puts the caret in it.
    ///
    /// The block refuses typing until it settles; it is highlighted then
    /// unless `no_highlight` is set. Fails with [`EditError::Blocked`] while
    /// another insertion is in progress.
    pub fn insert_code_block(
        &mut self,
        language: Option<&str>,
        no_highlight: bool,
    ) -> Result<BlockId, EditError> {
        if !self.code.try_acquire(Activity::InsertingCodeBlock, self.now) {
            return Err(EditError::blocked("a code block is already being inserted"));
        }
        self.scheduler
            .schedule(self.now, self.config.gate_fallback, Task::GateFallback);
        self.save_state_to_history();

        let range = self.selection_range();
        let code = CodeBlock::new(
            language.map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned),
            no_highlight,
        );
        let mut inserted = None;
        let result = self.transact(Origin::Programmatic, |tx| {
            let at = if range.is_collapsed() {
                range.start
            } else {
                tx.apply(Command::DeleteRange { range })?
            };
            let top = top_level_of(tx.doc(), at.block);
            let at_start = at.offset == 0
                && tx
                    .doc()
                    .get(top)
                    .and_then(Document::first_leaf_of)
                    .is_some_and(|leaf| leaf == at.block);
            let anchor = if at_start {
                BlockAnchor::Before(top)
            } else {
                BlockAnchor::After(top)
            };
            let caret = tx.apply(Command::InsertBlocks {
                anchor,
                blocks: vec![Block::new(BlockNode::CodeBlock(code))],
            })?;
            inserted = Some(caret.block);
            Ok(Some(Position::new(caret.block, 0)))
        });
        let block = match (result, inserted) {
            (Ok(_), Some(block)) => block,
            (Err(e), _) => {
                self.abort_code_insert();
                return Err(e);
            }
            (Ok(_), None) => {
                self.abort_code_insert();
                return Err(EditError::invalid("code block was not inserted"));
            }
        };
        self.code.set_phase(block, CodePhase::Inserting);
        self.save_state_to_history();
        self.scheduler.schedule(
            self.now,
            self.config.code_insert_settle,
            Task::FinishCodeInsert(block),
        );
        tracing::debug!(target: TARGET, %block, "code block inserted");
        Ok(block)
    }

    fn abort_code_insert(&mut self) {
        self.scheduler.cancel(Task::GateFallback.key());
        self.code.release(Activity::InsertingCodeBlock);
    }

    pub(crate) fn finish_code_insert(&mut self, block: BlockId) {
        self.abort_code_insert();
        let Some(code) = self.doc.get(block).and_then(Block::code) else {
            return;
        };
        let no_highlight = code.no_highlight;
        self.code.set_phase(block, CodePhase::Plain);
        if !no_highlight {
            self.highlight_block(block, true);
        }
    }

    /// Last resort for a gate nobody released.
    pub(crate) fn release_stuck_gate(&mut self) {
        let Some(activity) =
            self.code.release_expired(self.now, self.config.gate_fallback)
        else {
            return;
        };
        tracing::warn!(target: TARGET, %activity, "gate held too long, released");
        for block in self.doc.code_block_ids() {
            if self.code.phase(block) == CodePhase::Inserting {
                self.code.set_phase(block, CodePhase::Plain);
            }
        }
    }

    /// Brings the model in line with a change the platform already made to
    /// the editable surface. Repairs run on the next flush.
    pub fn apply_platform_mutation(
        &mut self,
        mutation: PlatformMutation,
    ) -> Result<(), EditError> {
        tracing::debug!(target: TARGET, ?mutation, "platform mutation");
        self.transact(Origin::Platform, |tx| match mutation {
            PlatformMutation::SplitBlock { at } => {
                tx.apply(Command::SplitBlock { at }).map(Some)
            }
            PlatformMutation::InsertLineBreak { at } => {
                let at = tx.doc().resolve(at)?;
                match tx.doc().get(at.block).and_then(Block::code).cloned() {
                    Some(mut code) => {
                        code.insert_line_break(at.offset);
                        tx.apply(Command::ReplaceCodeContent {
                            block: at.block,
                            code,
                        })?;
                        Ok(Some(Position::new(at.block, at.offset + 1)))
                    }
                    None => tx
                        .apply(Command::InsertInline {
                            at,
                            content: InlineContent::from_nodes(vec![
                                InlineNode::LineBreak,
                            ]),
                        })
                        .map(Some),
                }
            }
            PlatformMutation::InsertBlocks { after, html } => {
                let blocks = parse_blocks_lenient(&html);
                if blocks.is_empty() {
                    return Ok(None);
                }
                tx.apply(Command::InsertBlocks {
                    anchor: BlockAnchor::After(after),
                    blocks,
                })
                .map(Some)
            }
            PlatformMutation::RemoveBlock { block } => {
                tx.apply(Command::RemoveBlock { block }).map(Some)
            }
            PlatformMutation::InsertText { at, text } => {
                tx.apply(Command::InsertText { at, text }).map(Some)
            }
        })?;
        Ok(())
    }
}

/// The top-level block containing `id`.
pub(crate) fn top_level_of(doc: &Document, id: BlockId) -> BlockId {
    doc.ancestors(id).last().copied().unwrap_or(id)
}
