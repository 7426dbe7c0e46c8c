// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

#![cfg(test)]

use speculoos::prelude::*;

use crate::tests::testutils_editor::{caret_at, editor_with, select};

#[test]
fn a_lone_image_survives_copy_and_paste() {
    let mut source =
        editor_with(r#"<p>a</p><img src="cat.png" width="320" height="200"><p>b</p>"#);
    select(&mut source, 1, 0, 1, 1);
    let payload = source.copy();
    assert_that!(payload.html.as_deref().unwrap_or_default())
        .starts_with(r#"<img src="cat.png""#);

    let mut target = editor_with("<p>x</p>");
    caret_at(&mut target, 0, 1);
    target.paste(&payload).unwrap();
    let html = target.get_content();
    assert_that!(html.as_str()).starts_with(r#"<p>x</p><img src="cat.png""#);
    assert_that!(html.as_str()).contains("width: 320px;");
}

#[test]
fn copied_paragraphs_carry_their_look() {
    let mut editor =
        editor_with("<p>one</p><p><strong>two</strong></p><p>three</p>");
    select(&mut editor, 0, 0, 2, 5);
    let payload = editor.copy();
    assert_eq!(payload.text, "one\ntwo\nthree");
    let html = payload.html.unwrap_or_default();
    assert_that!(html.matches("<p ").count()).is_equal_to(3);
    assert_that!(html.as_str()).contains("font-weight: 700;");
    assert_that!(html.as_str()).contains("font-size: 16px;");
    assert_that!(html.as_str()).does_not_contain("class=");
}

#[test]
fn pasting_copied_blocks_reproduces_them() {
    let mut source = editor_with("<h2>Title</h2><ul><li>one</li><li>two</li></ul>");
    select(&mut source, 0, 0, 2, 3);
    let payload = source.copy();

    let mut target = editor_with("<p><br></p>");
    target.paste(&payload).unwrap();
    assert_eq!(target.get_text(), "Title\none\ntwo");
    let kinds: Vec<_> = target
        .document()
        .blocks()
        .iter()
        .map(|b| b.kind_name())
        .collect();
    assert_eq!(kinds, vec!["h2", "ul"]);
}
