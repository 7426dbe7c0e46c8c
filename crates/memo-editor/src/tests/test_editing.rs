// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

#![cfg(test)]

use speculoos::prelude::*;

use crate::dom::block::BlockNode;
use crate::dom::position::Position;
use crate::editor::InputEvent;
use crate::tests::testutils_editor::{caret_at, editor_with, ms, type_text};

#[test]
fn serialized_content_loads_back_unchanged() {
    let html = concat!(
        "<h1>Plan</h1>",
        "<p>a <strong>bold</strong> <a href=\"https://x.y\">link</a></p>",
        "<ul><li>one</li><li>two</li></ul>",
        "<blockquote><p>quoted</p></blockquote>",
        "<pre><code class=\"language-rust\">fn main() {}</code></pre>",
    );
    let editor = editor_with(html);
    let once = editor.get_content();
    let again = editor_with(&once).get_content();
    assert_eq!(once, again);
}

#[test]
fn a_hash_line_becomes_a_heading_on_enter() {
    let mut editor = editor_with("<p><br></p>");
    caret_at(&mut editor, 0, 0);
    type_text(&mut editor, "# Title");
    editor.handle_input(InputEvent::InsertParagraph);
    editor.tick(ms(0));
    assert_eq!(editor.get_content(), "<h1>Title</h1><p><br></p>");
    let paragraph = editor.document().leaves()[1];
    assert_eq!(editor.selection().focus, Position::new(paragraph, 0));
}

#[test]
fn autoformat_does_not_fire_twice() {
    let mut editor = editor_with("<p><br></p>");
    caret_at(&mut editor, 0, 0);
    type_text(&mut editor, "- item ");
    editor.tick(ms(0));
    let once = editor.get_content();
    editor.tick(ms(1000));
    assert_eq!(editor.get_content(), once);
    assert_that!(once.matches("<li>").count()).is_equal_to(1);
}

#[test]
fn an_accordion_made_and_emptied_turns_back_into_a_paragraph() {
    let mut editor = editor_with("<p><br></p>");
    caret_at(&mut editor, 0, 0);
    type_text(&mut editor, "> note");
    editor.handle_input(InputEvent::InsertParagraph);
    editor.tick(ms(0));

    let accordion = editor.document().blocks()[0].id();
    assert_that!(matches!(
        editor.document().get(accordion).map(|b| b.node()),
        Some(BlockNode::Accordion(_))
    ))
    .is_true();
    assert_ne!(editor.selection().focus.block, accordion);

    caret_at(&mut editor, 0, 4);
    for _ in 0..4 {
        editor.handle_input(InputEvent::DeleteBackward);
    }
    editor.blur();
    assert_eq!(editor.get_content(), "<p><br></p>");
}

#[test]
fn the_listener_sees_emptiness() {
    use std::cell::Cell;
    use std::rc::Rc;

    let mut editor = editor_with("<p>a</p>");
    let empty = Rc::new(Cell::new(false));
    let sink = Rc::clone(&empty);
    editor.on_content_changed(move |status| sink.set(status.is_empty));
    caret_at(&mut editor, 0, 1);
    editor.handle_input(InputEvent::DeleteBackward);
    assert_that!(empty.get()).is_true();
    type_text(&mut editor, "b");
    assert_that!(empty.get()).is_false();
}
