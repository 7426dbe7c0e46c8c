// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The editor facade.
//!
//! Every mutation, whoever causes it, goes through [`Editor::transact`]:
//! a batch of commands applied to the document, rolled back as a whole if
//! any of them fails, and committed once. Commit is the single place that
//! moves the selection, records history, feeds the change feed and tells
//! the host the content changed.

mod accordion;
mod clipboard;
mod code_blocks;
mod content;
mod formatting;
mod input;
pub mod keys;
pub mod media;

use std::time::Duration;

pub use input::{InputEvent, InputOutcome};

use crate::change_feed::ChangeFeed;
use crate::clipboard::{ModelStyleResolver, StyleResolver};
use crate::code_block::{default_highlighter, CodeBlockState, Highlighter};
use crate::command::{
    map_position, BlockAnchor, Command, Effect, Origin, Transaction,
};
use crate::config::EditorConfig;
use crate::dom::block::Block;
use crate::dom::document::Document;
use crate::dom::inline::StyleAttr;
use crate::dom::parser::parse_blocks_lenient;
use crate::dom::position::{Position, Range, Selection};
use crate::error::EditError;
use crate::history::{History, Snapshot};
use crate::scheduler::{Scheduler, Task, TaskKind};

/// What the host is told after every committed change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentStatus {
    /// No text and no media anywhere; hosts use it for placeholders.
    pub is_empty: bool,
}

type ContentListener = Box<dyn FnMut(ContentStatus)>;

pub struct Editor {
    pub(crate) doc: Document,
    pub(crate) selection: Selection,
    pub(crate) focused: bool,
    pub(crate) history: History,
    pub(crate) scheduler: Scheduler,
    pub(crate) feed: ChangeFeed,
    pub(crate) code: CodeBlockState,
    pub(crate) highlighter: Option<Box<dyn Highlighter>>,
    pub(crate) resolver: Box<dyn StyleResolver>,
    pub(crate) config: EditorConfig,
    /// Formats toggled while the caret is collapsed, applied to the next
    /// typed text. `true` turns the style on, `false` off.
    pub(crate) pending_formats: Vec<(StyleAttr, bool)>,
    listener: Option<ContentListener>,
    /// Latest host time seen by `tick`.
    pub(crate) now: Duration,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        let doc = Document::new();
        let selection = Selection::caret(doc.start());
        let mut history = History::new(config.history_capacity);
        history.reset(Snapshot::capture(&doc, Some(selection)));
        let mut code = CodeBlockState::new();
        code.reset(&doc);
        Self {
            doc,
            selection,
            focused: false,
            history,
            scheduler: Scheduler::new(),
            feed: ChangeFeed::default(),
            code,
            highlighter: default_highlighter(),
            resolver: Box::new(ModelStyleResolver::default()),
            config,
            pending_formats: Vec::new(),
            listener: None,
            now: Duration::ZERO,
        }
    }

    pub fn with_highlighter(mut self, highlighter: Box<dyn Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    /// Code blocks stay plain text.
    pub fn without_highlighter(mut self) -> Self {
        self.highlighter = None;
        self
    }

    /// Replaces the resolver used to inline computed styles on copy.
    pub fn with_style_resolver(mut self, resolver: Box<dyn StyleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Registers the callback run after every committed change.
    pub fn on_content_changed(&mut self, listener: impl FnMut(ContentStatus) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn code_blocks(&self) -> &CodeBlockState {
        &self.code
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// When the host should call [`Editor::tick`] next.
    pub fn next_tick_due(&self) -> Option<Duration> {
        self.scheduler.next_due()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Applies one command as user input.
    pub fn apply_command(&mut self, cmd: Command) -> Result<Position, EditError> {
        let code_edit = match &cmd {
            Command::InsertText { at, .. } => Some(at.block),
            Command::DeleteRange { range } if range.is_single_block() => {
                Some(range.start.block)
            }
            _ => None,
        }
        .filter(|id| self.doc.is_code_block(*id));

        let caret = self.transact(Origin::User, |tx| tx.apply(cmd).map(Some))?;
        if let Some(block) = code_edit {
            self.note_code_edit(block);
        }
        Ok(caret.unwrap_or(self.selection.focus))
    }

    /// Runs `f` as one batch.
    ///
    /// On success the batch is committed and the caret `f` returns, if
    /// any, becomes the selection; otherwise the selection is mapped
    /// through the batch's effects. On failure the document is restored
    /// and nothing is recorded.
    pub(crate) fn transact(
        &mut self,
        origin: Origin,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<Option<Position>, EditError>,
    ) -> Result<Option<Position>, EditError> {
        let backup = self.doc.clone();
        let locked = self.code.locked_blocks();
        let mut tx = Transaction::new(&mut self.doc, origin, &locked);
        let result = f(&mut tx);
        let effects = tx.into_effects();
        match result {
            Ok(caret) => {
                self.commit(origin, effects, caret);
                Ok(caret)
            }
            Err(e) => {
                self.doc = backup;
                tracing::debug!(
                    target: "memo_editor::command",
                    %origin,
                    error = %e,
                    "batch rolled back"
                );
                Err(e)
            }
        }
    }

    fn commit(
        &mut self,
        origin: Origin,
        effects: Vec<Effect>,
        caret: Option<Position>,
    ) {
        let caret = caret.and_then(|c| self.doc.clamp(c));
        if effects.is_empty() {
            if let Some(caret) = caret {
                self.selection = Selection::caret(caret);
            }
            return;
        }
        self.selection = match caret {
            Some(caret) => Selection::caret(caret),
            None => self.mapped_selection(&effects),
        };

        #[cfg(feature = "assert-invariants")]
        self.doc.explicitly_assert_invariants();

        self.code.sync(&self.doc);
        if origin.removes_deliberately() {
            for block in self.code.forget_detached(&self.doc) {
                self.scheduler.cancel(Task::PostRebuildCheck(block).key());
                tracing::debug!(
                    target: "memo_editor::code_block",
                    %block,
                    %origin,
                    "rebuilt block removed"
                );
            }
        }
        if !origin.skips_history() {
            self.history
                .push(Snapshot::capture(&self.doc, Some(self.selection)));
        }
        tracing::debug!(
            target: "memo_editor::command",
            %origin,
            effects = effects.len(),
            "commit"
        );
        self.feed.push(origin, effects);
        self.notify();
    }

    fn mapped_selection(&self, effects: &[Effect]) -> Selection {
        let map = |pos: Position| {
            map_position(effects, pos).and_then(|p| self.doc.clamp(p))
        };
        match (map(self.selection.anchor), map(self.selection.focus)) {
            (Some(anchor), Some(focus)) => Selection::new(anchor, focus),
            (Some(pos), None) | (None, Some(pos)) => Selection::caret(pos),
            (None, None) => Selection::caret(self.doc.start()),
        }
    }

    pub(crate) fn notify(&mut self) {
        let status = ContentStatus {
            is_empty: self.doc.is_empty(),
        };
        if let Some(listener) = self.listener.as_mut() {
            listener(status);
        }
    }

    /// The selection as an ordered range, or a caret at the document start
    /// if it no longer resolves.
    pub(crate) fn selection_range(&self) -> Range {
        self.doc
            .range(self.selection.anchor, self.selection.focus)
            .unwrap_or_else(|_| Range::caret(self.doc.start()))
    }

    /// Moves the selection. Leaving a block runs its exit handling and
    /// schedules the code-block exit check.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditError> {
        let anchor = self.doc.resolve(selection.anchor)?;
        let focus = self.doc.resolve(selection.focus)?;
        let previous = self.selection;
        self.selection = Selection::new(anchor, focus);
        self.focused = true;
        if previous.focus != focus {
            self.pending_formats.clear();
        }
        if previous.focus.block != focus.block {
            self.collapse_emptied_title(previous.focus.block);
        }
        self.scheduler
            .schedule(self.now, self.config.exit_debounce, Task::ExitCheck);
        Ok(())
    }

    /// The editable surface lost focus.
    pub fn blur(&mut self) {
        let focus = self.selection.focus.block;
        self.focused = false;
        self.pending_formats.clear();
        self.collapse_emptied_title(focus);
        self.scheduler.cancel(Task::ExitCheck.key());
        self.check_exit();
        self.flush_changes();
    }

    /// Advances host time, running every task due by `now`.
    pub fn tick(&mut self, now: Duration) {
        self.now = self.now.max(now);
        self.flush_changes();
        while let Some(task) = self.scheduler.pop_due(self.now) {
            self.run_task(task);
            self.flush_changes();
        }
    }

    fn run_task(&mut self, task: Task) {
        tracing::trace!(target: "memo_editor::scheduler", ?task, "run");
        match task {
            Task::Autoformat { block, rule } => self.run_autoformat(block, rule),
            Task::InlineScan => self.run_inline_scan(),
            Task::AutoLink => self.run_auto_link(),
            Task::Highlight(block) => {
                self.highlight_block(block, false);
            }
            Task::ExitCheck => self.check_exit(),
            Task::RehighlightAll => self.rehighlight_all(),
            Task::PostRebuildCheck(block) => self.post_rebuild_check(block),
            Task::FinishCodeInsert(block) => self.finish_code_insert(block),
            Task::GateFallback => self.release_stuck_gate(),
        }
    }

    /// Records the current state as its own undo entry, including changes
    /// made by origins that skip history.
    pub fn save_state_to_history(&mut self) {
        self.history.mark_boundary(Snapshot::capture(&self.doc, Some(self.selection)));
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    /// Swaps the document for the one a snapshot describes.
    fn restore(&mut self, snapshot: Snapshot) {
        let mut blocks = parse_blocks_lenient(snapshot.html());
        if blocks.is_empty() {
            blocks.push(Block::empty_paragraph());
        }
        let old: Vec<_> = self.doc.blocks().iter().map(|b| b.id()).collect();
        let restored = self.transact(Origin::History, |tx| {
            tx.apply(Command::InsertBlocks {
                anchor: BlockAnchor::End,
                blocks,
            })?;
            for block in old {
                tx.apply(Command::RemoveBlock { block })?;
            }
            Ok(None)
        });
        if let Err(e) = restored {
            tracing::warn!(
                target: "memo_editor::history",
                error = %e,
                "snapshot could not be restored"
            );
            return;
        }
        self.selection = snapshot.selection_in(&self.doc);
        self.pending_formats.clear();
        self.feed.clear();
        self.cancel_block_tasks();
        self.scheduler.schedule(
            self.now,
            self.config.rehighlight_delay,
            Task::RehighlightAll,
        );
    }

    /// Drops tasks that refer to blocks by id.
    pub(crate) fn cancel_block_tasks(&mut self) {
        for kind in [
            TaskKind::Autoformat,
            TaskKind::Highlight,
            TaskKind::PostRebuildCheck,
        ] {
            self.scheduler.cancel_kind(kind);
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use speculoos::prelude::*;

    use super::*;
    use crate::dom::block::BlockId;
    use crate::dom::to_html::ToHtml;
    use crate::tests::testutils_editor::{editor_with, ms};

    #[test]
    fn failed_batches_leave_nothing_behind() {
        let mut editor = editor_with("<p>abc</p>");
        let before = editor.get_content();
        let history = editor.history().len();
        let leaf = editor.document().leaves()[0];
        let result = editor.transact(Origin::User, |tx| {
            tx.apply(Command::InsertText {
                at: Position::new(leaf, 3),
                text: "d".into(),
            })?;
            tx.apply(Command::RemoveBlock {
                block: BlockId::UNASSIGNED,
            })?;
            Ok(None)
        });
        assert_that!(result).is_err();
        assert_eq!(editor.get_content(), before);
        assert_eq!(editor.history().len(), history);
    }

    #[test]
    fn commits_notify_the_host() {
        let mut editor = editor_with("<p>a</p>");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        editor.on_content_changed(move |status| sink.borrow_mut().push(status));
        let leaf = editor.document().leaves()[0];
        editor
            .apply_command(Command::DeleteRange {
                range: Range::within(leaf, 0, 1),
            })
            .unwrap();
        assert_eq!(*seen.borrow(), vec![ContentStatus { is_empty: true }]);
    }

    #[test]
    fn the_selection_follows_edits_before_it() {
        let mut editor = editor_with("<p>abcdef</p>");
        let leaf = editor.document().leaves()[0];
        editor
            .set_selection(Selection::new(
                Position::new(leaf, 3),
                Position::new(leaf, 5),
            ))
            .unwrap();
        editor
            .transact(Origin::Programmatic, |tx| {
                tx.apply(Command::InsertText {
                    at: Position::new(leaf, 0),
                    text: "xy".into(),
                })?;
                Ok(None)
            })
            .unwrap();
        assert_eq!(
            editor.selection(),
            Selection::new(Position::new(leaf, 5), Position::new(leaf, 7))
        );
    }

    #[test]
    fn undo_restores_content_and_caret() {
        let mut editor = editor_with("<p>ab</p>");
        let leaf = editor.document().leaves()[0];
        editor
            .apply_command(Command::InsertText {
                at: Position::new(leaf, 2),
                text: " c".into(),
            })
            .unwrap();
        assert!(editor.undo());
        assert_eq!(editor.get_content(), "<p>ab</p>");
        assert!(editor.redo());
        assert_eq!(editor.get_content(), "<p>ab c</p>");
        let leaf = editor.document().leaves()[0];
        assert_eq!(editor.selection().focus, Position::new(leaf, 4));
    }

    #[test]
    fn tick_only_runs_due_tasks() {
        let mut editor = editor_with("<p>a</p>");
        let leaf = editor.document().leaves()[0];
        editor
            .set_selection(Selection::caret(Position::new(leaf, 1)))
            .unwrap();
        assert_that!(editor.next_tick_due()).is_equal_to(Some(ms(100)));
        editor.tick(ms(50));
        assert_that!(editor.scheduler().len()).is_equal_to(1);
        editor.tick(ms(100));
        assert_that!(editor.scheduler().is_empty()).is_true();
        assert_eq!(editor.document().to_html(), "<p>a</p>");
    }
}
