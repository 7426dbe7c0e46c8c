// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

#![cfg(test)]

use speculoos::prelude::*;

use crate::dom::inline::StyleAttr;
use crate::editor::InputEvent;
use crate::tests::testutils_editor::{caret_at, editor_with, select, type_text};

#[test]
fn undoing_n_commands_returns_to_the_state_before_them() {
    let mut editor = editor_with("<p>one</p>");
    caret_at(&mut editor, 0, 3);
    type_text(&mut editor, " two");
    select(&mut editor, 0, 0, 0, 3);
    editor.toggle_format(StyleAttr::Bold).unwrap();
    let after = editor.get_content();
    assert_eq!(after, "<p><strong>one</strong> two</p>");

    // four keystrokes and one toggle
    for _ in 0..5 {
        assert_that!(editor.undo()).is_true();
    }
    assert_eq!(editor.get_content(), "<p>one</p>");
    assert_that!(editor.can_undo()).is_false();
    for _ in 0..5 {
        assert_that!(editor.redo()).is_true();
    }
    assert_eq!(editor.get_content(), after);
    assert_that!(editor.can_redo()).is_false();
}

#[test]
fn history_keeps_the_newest_fifty_entries() {
    let mut editor = editor_with("<p><br></p>");
    caret_at(&mut editor, 0, 0);
    for _ in 0..60 {
        editor.handle_input(InputEvent::InsertText(".".into()));
    }
    assert_eq!(editor.history().len(), 50);
    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, 49);
    assert_eq!(editor.get_text(), ".".repeat(11));
}

#[test]
fn each_keystroke_undoes_on_its_own() {
    let mut editor = editor_with("<p>x</p>");
    caret_at(&mut editor, 0, 1);
    type_text(&mut editor, " ");
    let before_word = editor.get_content();
    type_text(&mut editor, "ab");
    assert_eq!(editor.get_content(), "<p>x ab</p>");

    assert_that!(editor.undo()).is_true();
    assert_eq!(editor.get_content(), "<p>x a</p>");
    assert_that!(editor.undo()).is_true();
    assert_eq!(editor.get_content(), before_word);
    assert_eq!(before_word, "<p>x </p>");
}

#[test]
fn new_edits_clear_redo() {
    let mut editor = editor_with("<p>a</p>");
    caret_at(&mut editor, 0, 1);
    type_text(&mut editor, "b");
    editor.undo();
    assert_that!(editor.can_redo()).is_true();
    caret_at(&mut editor, 0, 1);
    type_text(&mut editor, "c");
    assert_that!(editor.can_redo()).is_false();
}
