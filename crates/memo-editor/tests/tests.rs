// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::cell::RefCell;
use std::time::Duration;

use memo_editor::{
    ClipboardPayload, CodePhase, Editor, EditorConfig, FileUpload, Highlighted,
    HighlightError, Highlighter, InputEvent, InputOutcome, KeyCombo,
    PageDraft, PagePersistence, Position, SaveResponse, Selection, StyleAttr,
    UploadEndpoint, UploadKind, UploadResponse,
};

/// Wraps the whole text in one span.
struct OneSpan;

impl Highlighter for OneSpan {
    fn highlight(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<Highlighted, HighlightError> {
        Ok(Highlighted {
            html: format!(
                r#"<span class="hljs-title">{}</span>"#,
                html_escape::encode_text(text)
            ),
            language: language.map(str::to_owned),
        })
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn editor(html: &str) -> Editor {
    let mut editor = Editor::new().with_highlighter(Box::new(OneSpan));
    editor.set_content(html).unwrap();
    editor
}

fn caret(editor: &mut Editor, leaf: usize, offset: usize) {
    let leaf = editor.document().leaves()[leaf];
    editor
        .set_selection(Selection::caret(Position::new(leaf, offset)))
        .unwrap();
}

#[test]
fn can_type_format_and_undo() {
    let mut editor = editor("<p><br></p>");
    caret(&mut editor, 0, 0);
    for c in "hello".chars() {
        assert_eq!(
            editor.handle_input(InputEvent::InsertText(c.to_string())),
            InputOutcome::Handled
        );
    }
    assert_eq!(editor.get_content(), "<p>hello</p>");

    let leaf = editor.document().leaves()[0];
    editor
        .set_selection(Selection::new(Position::new(leaf, 0), Position::new(leaf, 5)))
        .unwrap();
    editor.handle_key(KeyCombo::primary('i'));
    assert_eq!(editor.get_content(), "<p><em>hello</em></p>");

    assert!(editor.undo());
    assert_eq!(editor.get_content(), "<p>hello</p>");
    assert!(editor.undo());
    assert_eq!(editor.get_content(), "<p>hell</p>");
    for _ in 0..4 {
        assert!(editor.undo());
    }
    assert_eq!(editor.get_content(), "<p><br></p>");
    assert!(!editor.undo());
}

#[test]
fn code_blocks_are_highlighted_by_the_host_highlighter() {
    let mut editor = editor("<pre><code class=\"language-sql\">select 1</code></pre>");
    editor.tick(ms(200));
    let id = editor.document().code_block_ids()[0];
    assert_eq!(editor.code_blocks().phase(id), CodePhase::Highlighted);
    assert_eq!(
        editor.get_content(),
        r#"<pre><code class="language-sql hljs" data-highlighted="yes"><span class="hljs-title">select 1</span></code></pre>"#
    );
    assert_eq!(editor.get_text(), "select 1");
}

#[test]
fn an_editor_without_highlighter_keeps_code_plain() {
    let mut editor = Editor::new().without_highlighter();
    editor.set_content("<pre><code>x = 1</code></pre>").unwrap();
    editor.tick(ms(5000));
    assert_eq!(editor.get_content(), "<pre><code>x = 1</code></pre>");
}

#[test]
fn inserted_code_blocks_accept_text_after_settling() {
    let config = EditorConfig::default();
    let settle = config.code_insert_settle;
    let mut editor = Editor::with_config(config).with_highlighter(Box::new(OneSpan));
    editor.set_content("<p>intro</p>").unwrap();
    caret(&mut editor, 0, 5);
    let id = editor.insert_code_block(Some("js"), false).unwrap();
    assert!(matches!(
        editor.handle_input(InputEvent::InsertText("x".into())),
        InputOutcome::Rejected(_)
    ));
    editor.tick(settle);
    assert_eq!(
        editor.handle_input(InputEvent::InsertText("x".into())),
        InputOutcome::Handled
    );
    assert_eq!(editor.document().get(id).map(|b| b.text()), Some("x".to_owned()));
}

#[test]
fn clipboard_round_trip_between_editors() {
    let mut source = editor("<p>one <strong>two</strong></p><p>three</p>");
    let leaves = source.document().leaves();
    source
        .set_selection(Selection::new(
            Position::new(leaves[0], 4),
            Position::new(leaves[1], 5),
        ))
        .unwrap();
    let payload = source.copy();
    assert_eq!(payload.text, "two\nthree");

    let mut target = editor("<p><br></p>");
    target.paste(&payload).unwrap();
    assert_eq!(target.get_text(), "two\nthree");

    let mut plain = editor("<p>ab</p>");
    caret(&mut plain, 0, 1);
    plain.paste(&ClipboardPayload::text("x")).unwrap();
    assert_eq!(plain.get_content(), "<p>axb</p>");
}

#[test]
fn inline_styles_can_be_applied_programmatically() {
    let mut editor = editor("<p>colour</p>");
    let leaf = editor.document().leaves()[0];
    editor
        .set_selection(Selection::new(Position::new(leaf, 0), Position::new(leaf, 6)))
        .unwrap();
    editor
        .apply_inline_style(StyleAttr::FontSize("20px".into()))
        .unwrap();
    assert_eq!(
        editor.get_content(),
        r#"<p><span style="font-size: 20px;">colour</span></p>"#
    );
}

struct Store(RefCell<Vec<PageDraft>>);

impl PagePersistence for Store {
    fn save(&self, draft: &PageDraft) -> SaveResponse {
        self.0.borrow_mut().push(draft.clone());
        SaveResponse::ok()
    }
}

struct Uploads;

impl UploadEndpoint for Uploads {
    fn upload(&self, file: &FileUpload) -> UploadResponse {
        UploadResponse::ok(format!("/uploads/{}", file.name))
    }
}

#[test]
fn pages_with_uploaded_media_can_be_saved() {
    let mut editor = editor("<p>photo:</p>");
    caret(&mut editor, 0, 6);
    let file = FileUpload::new(UploadKind::Image, "a.png", "image/png", vec![1, 2, 3]);
    editor.upload_image(&file, &Uploads).unwrap();

    let store = Store(RefCell::new(Vec::new()));
    editor.save_page("Holiday", &store).unwrap();
    let saved = store.0.borrow();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title, "Holiday");
    assert!(saved[0].content.contains(r#"<img src="/uploads/a.png""#));
}

#[test]
fn markdown_imports_as_rich_content() {
    let mut editor = Editor::new().without_highlighter();
    editor
        .set_content_from_markdown("# Title\n\nSome **bold** text.\n")
        .unwrap();
    assert_eq!(
        editor.get_content(),
        "<h1>Title</h1><p>Some <strong>bold</strong> text.</p>"
    );
    assert!(!editor.is_empty());
}
