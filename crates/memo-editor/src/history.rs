// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Snapshot-based undo and redo.
//!
//! The top of the undo stack is always the state currently shown. Undo pops
//! it onto the redo stack and hands back the entry below; redo does the
//! reverse. Selections are stored as `(leaf ordinal, offset)` pairs because
//! block ids do not survive re-parsing the markup.

use crate::dom::document::Document;
use crate::dom::position::{Position, Selection};
use crate::dom::to_html::ToHtml;

const TARGET: &str = "memo_editor::history";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    html: String,
    anchor: Option<(usize, usize)>,
    focus: Option<(usize, usize)>,
}

impl Snapshot {
    pub fn capture(doc: &Document, selection: Option<Selection>) -> Self {
        Self {
            html: doc.to_html(),
            anchor: selection.and_then(|s| doc.ordinal_of(s.anchor)),
            focus: selection.and_then(|s| doc.ordinal_of(s.focus)),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// The stored selection resolved against a document rebuilt from
    /// [`Snapshot::html`], or a caret at the document start.
    pub fn selection_in(&self, doc: &Document) -> Selection {
        let resolve = |saved: Option<(usize, usize)>| {
            saved.and_then(|s| doc.position_at_ordinal(s))
        };
        match (resolve(self.anchor), resolve(self.focus)) {
            (Some(anchor), Some(focus)) => Selection::new(anchor, focus),
            (Some(pos), None) | (None, Some(pos)) => Selection::caret(pos),
            (None, None) => Selection::caret(doc.start()),
        }
    }

    pub fn caret_in(&self, doc: &Document) -> Position {
        self.selection_in(doc).focus
    }
}

#[derive(Clone, Debug)]
pub struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Forgets everything and starts over from `initial`.
    pub fn reset(&mut self, initial: Snapshot) {
        self.undo.clear();
        self.redo.clear();
        self.undo.push(initial);
    }

    /// Records the state after a committed batch. A snapshot with the same
    /// markup as the current state only refreshes its selection, so every
    /// entry differs from its neighbours.
    pub fn push(&mut self, snapshot: Snapshot) {
        if let Some(top) = self.undo.last_mut() {
            if top.html == snapshot.html {
                top.anchor = snapshot.anchor;
                top.focus = snapshot.focus;
                return;
            }
        }
        self.undo.push(snapshot);
        self.redo.clear();
        if self.undo.len() > self.capacity {
            let evicted = self.undo.len() - self.capacity;
            self.undo.drain(..evicted);
            tracing::debug!(target: TARGET, evicted, "history full");
        }
    }

    /// Records the current state on request, even when the change that
    /// produced it came from an origin that skips history.
    pub fn mark_boundary(&mut self, snapshot: Snapshot) {
        tracing::trace!(target: TARGET, "boundary");
        self.push(snapshot);
    }

    /// The entry to restore, if there is anything to undo.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.undo.len() < 2 {
            return None;
        }
        let top = self.undo.pop()?;
        self.redo.push(top);
        tracing::debug!(
            target: TARGET,
            undo = self.undo.len(),
            redo = self.redo.len(),
            "undo"
        );
        self.undo.last()
    }

    pub fn redo(&mut self) -> Option<&Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push(next);
        tracing::debug!(
            target: TARGET,
            undo = self.undo.len(),
            redo = self.redo.len(),
            "redo"
        );
        self.undo.last()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of snapshots held, including the current state.
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.undo.last()
    }
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::dom::block::Block;

    fn snap(text: &str) -> Snapshot {
        let doc = Document::from_blocks(vec![Block::paragraph(text)]);
        Snapshot::capture(&doc, None)
    }

    fn history_with(texts: &[&str]) -> History {
        let mut history = History::new(50);
        history.reset(snap(""));
        for text in texts {
            history.push(snap(text));
        }
        history
    }

    #[test]
    fn identical_snapshots_are_not_stacked() {
        let history = history_with(&["a", "a", "a"]);
        assert_that!(history.len()).is_equal_to(2);
    }

    #[test]
    fn undo_then_redo_returns_to_the_same_state() {
        let mut history = history_with(&["a", "ab"]);
        let undone = history.undo().map(|s| s.html().to_owned());
        assert_that!(undone).is_equal_to(Some("<p>a</p>".to_owned()));
        let redone = history.redo().map(|s| s.html().to_owned());
        assert_that!(redone).is_equal_to(Some("<p>ab</p>".to_owned()));
        assert!(!history.can_redo());
    }

    #[test]
    fn pushing_clears_redo() {
        let mut history = history_with(&["a", "ab"]);
        history.undo();
        assert!(history.can_redo());
        history.push(snap("x"));
        assert!(!history.can_redo());
    }

    #[test]
    fn oldest_entries_are_evicted_at_capacity() {
        let mut history = History::new(50);
        history.reset(snap("s0"));
        for i in 1..60 {
            history.push(snap(&format!("s{i}")));
        }
        assert_that!(history.len()).is_equal_to(50);
        let mut oldest = String::new();
        while let Some(s) = history.undo() {
            oldest = s.html().to_owned();
        }
        assert_that!(oldest).is_equal_to("<p>s10</p>".to_owned());
    }

    #[test]
    fn every_distinct_state_is_its_own_entry() {
        let mut history = history_with(&["x", "x ", "x a", "x ab"]);
        assert_that!(history.len()).is_equal_to(5);
        let undone = history.undo().map(|s| s.html().to_owned());
        assert_that!(undone).is_equal_to(Some("<p>x a</p>".to_owned()));
        let undone = history.undo().map(|s| s.html().to_owned());
        assert_that!(undone).is_equal_to(Some("<p>x </p>".to_owned()));
    }

    #[test]
    fn a_boundary_on_an_unchanged_state_adds_nothing() {
        let mut history = history_with(&["a"]);
        history.mark_boundary(snap("a"));
        assert_that!(history.len()).is_equal_to(2);
        history.mark_boundary(snap("ab"));
        assert_that!(history.len()).is_equal_to(3);
    }

    #[test]
    fn unresolvable_selection_falls_back_to_document_start() {
        let doc = Document::from_blocks(vec![Block::paragraph("abc")]);
        let leaf = doc.leaves()[0];
        let snapshot =
            Snapshot::capture(&doc, Some(Selection::caret(Position::new(leaf, 2))));
        let other = Document::from_blocks(vec![Block::paragraph("a")]);
        assert_that!(snapshot.caret_in(&other)).is_equal_to(other.start());
        let same = Document::from_blocks(vec![Block::paragraph("abc")]);
        assert_that!(snapshot.caret_in(&same).offset).is_equal_to(2);
    }
}
