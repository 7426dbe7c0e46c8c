// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

#![cfg(test)]

use speculoos::prelude::*;

use crate::code_block::CodePhase;
use crate::dom::position::Position;
use crate::editor::{InputEvent, InputOutcome};
use crate::tests::testutils_editor::{caret_at, editor_with, ms, select, type_text};

#[test]
fn typing_in_code_is_highlighted_once_typing_stops() {
    let mut editor = editor_with("<pre><code>let </code></pre>");
    editor.tick(ms(300));
    let id = editor.document().code_block_ids()[0];
    assert_eq!(editor.code_blocks().phase(id), CodePhase::Highlighted);

    caret_at(&mut editor, 0, 4);
    type_text(&mut editor, "a");
    assert_that!(editor.code_blocks().phase(id).has_pending_edit()).is_true();

    editor.tick(ms(1499));
    assert_that!(editor.code_blocks().phase(id).has_pending_edit()).is_true();

    editor.tick(ms(1500));
    assert_eq!(editor.code_blocks().phase(id), CodePhase::Highlighted);
    assert_eq!(editor.selection().focus, Position::new(id, 5));
    assert_eq!(
        editor.get_content(),
        r#"<pre><code class="hljs" data-highlighted="yes"><span class="hljs-keyword">let</span> a</code></pre>"#
    );
}

#[test]
fn highlighting_twice_changes_nothing() {
    let mut editor = editor_with("<pre><code>if x { return 1; }</code></pre>");
    let id = editor.document().code_block_ids()[0];
    editor.tick(ms(200));
    let once = editor.get_content();
    assert!(editor.highlight_block(id, true));
    assert_eq!(editor.get_content(), once);
}

#[test]
fn leaving_a_code_block_highlights_it_early() {
    let mut editor = editor_with("<pre><code>let</code></pre><p>after</p>");
    editor.tick(ms(200));
    let id = editor.document().code_block_ids()[0];
    caret_at(&mut editor, 0, 3);
    type_text(&mut editor, " b");
    caret_at(&mut editor, 1, 0);
    editor.tick(ms(300));
    assert_eq!(editor.code_blocks().phase(id), CodePhase::Highlighted);
}

#[test]
fn enter_in_code_keeps_one_block() {
    let mut editor = editor_with("<pre><code>ab</code></pre>");
    caret_at(&mut editor, 0, 1);
    editor.handle_input(InputEvent::InsertParagraph);
    editor.handle_input(InputEvent::InsertLineBreak);
    assert_eq!(editor.document().code_block_ids().len(), 1);
    assert_eq!(editor.get_text(), "a\n\nb");
}

#[test]
fn a_highlighted_block_the_user_deletes_stays_deleted() {
    let mut editor = editor_with("<p>a</p><pre><code>let a;</code></pre><p>b</p>");
    caret_at(&mut editor, 1, 6);
    type_text(&mut editor, "x");
    caret_at(&mut editor, 2, 0);
    editor.tick(ms(100));
    let id = editor.document().code_block_ids()[0];
    assert_eq!(editor.code_blocks().phase(id), CodePhase::Highlighted);

    select(&mut editor, 0, 1, 2, 0);
    assert_eq!(
        editor.handle_input(InputEvent::DeleteBackward),
        InputOutcome::Handled
    );
    assert_eq!(editor.get_content(), "<p>ab</p>");

    editor.tick(ms(200));
    assert_eq!(editor.get_content(), "<p>ab</p>");
    assert_that!(editor.document().code_block_ids().is_empty()).is_true();
}
