// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::input::collapse;
use super::Editor;
use crate::clipboard::{copy_selection, plan_paste, ClipboardPayload, PastePlan};
use crate::command::{BlockAnchor, Command, Origin, Transaction};
use crate::dom::block::{Block, BlockNode};
use crate::dom::position::Position;
use crate::error::EditError;

impl Editor {
    /// The selection as clipboard content. A collapsed selection copies
    /// nothing.
    pub fn copy(&self) -> ClipboardPayload {
        let range = self.selection_range();
        if range.is_collapsed() {
            return ClipboardPayload::default();
        }
        copy_selection(&self.doc, range, &*self.resolver)
    }

    /// Plain text of the selection.
    pub fn selected_text(&self) -> String {
        self.copy().text
    }

    pub fn cut(&mut self) -> ClipboardPayload {
        let payload = self.copy();
        let range = self.selection_range();
        if range.is_collapsed() {
            return payload;
        }
        let result = self.transact(Origin::User, |tx| {
            tx.apply(Command::DeleteRange { range }).map(Some)
        });
        match result {
            Ok(_) => self.after_code_change(),
            Err(e) => tracing::debug!(target: "memo_editor::command", error = %e, "cut refused"),
        }
        payload
    }

    /// Inserts clipboard content at the selection, replacing it.
    pub fn paste(&mut self, payload: &ClipboardPayload) -> Result<(), EditError> {
        let range = self.selection_range();
        let in_code = self.doc.is_code_block(range.start.block);
        let plan = plan_paste(payload, in_code);
        if plan == PastePlan::Nothing {
            return Ok(());
        }
        self.save_state_to_history();
        self.transact(Origin::Clipboard, |tx| {
            let at = collapse(tx, range)?;
            match plan {
                PastePlan::Text(text) => paste_text(tx, at, &text).map(Some),
                PastePlan::Inline(content) => {
                    tx.apply(Command::InsertInline { at, content }).map(Some)
                }
                PastePlan::Embed(embed) => tx.apply(Command::InsertEmbed { at, embed }).map(Some),
                PastePlan::Blocks(blocks) => paste_blocks(tx, at, blocks).map(Some),
                PastePlan::Nothing => Ok(None),
            }
        })?;
        if in_code {
            self.after_code_change();
        } else {
            self.schedule_text_scans();
        }
        tracing::debug!(target: "memo_editor::command", in_code, "pasted");
        Ok(())
    }
}

/// Text lines become separate blocks where the host block can be split.
fn paste_text(tx: &mut Transaction<'_>, at: Position, text: &str) -> Result<Position, EditError> {
    let splits = matches!(
        tx.doc().get(at.block).map(Block::node),
        Some(BlockNode::Paragraph(_) | BlockNode::Heading { .. } | BlockNode::ListItem(_))
    );
    if tx.doc().is_code_block(at.block) {
        return tx.apply(Command::InsertText {
            at,
            text: text.to_owned(),
        });
    }
    if !splits {
        return tx.apply(Command::InsertText {
            at,
            text: text.replace('\n', " "),
        });
    }
    let mut caret = at;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            caret = tx.apply(Command::SplitBlock { at: caret })?;
        }
        caret = tx.apply(Command::InsertText {
            at: caret,
            text: line.to_owned(),
        })?;
    }
    Ok(caret)
}

/// Pasted blocks go beside the caret's block, or beside its list, table
/// or accordion when the caret is inside one.
fn paste_blocks(
    tx: &mut Transaction<'_>,
    at: Position,
    blocks: Vec<Block>,
) -> Result<Position, EditError> {
    let host = tx
        .doc()
        .get(at.block)
        .ok_or_else(|| EditError::invalid("caret is not in the document"))?;
    let empty_paragraph =
        matches!(host.node(), BlockNode::Paragraph(c) if c.is_empty());
    let len = host.text_len();
    let anchor = match host.node() {
        BlockNode::ListItem(_) | BlockNode::TableCell(_) => {
            tx.doc().parent_of(at.block).unwrap_or(at.block)
        }
        _ => at.block,
    };

    if empty_paragraph {
        let caret = tx.apply(Command::InsertBlocks {
            anchor: BlockAnchor::After(at.block),
            blocks,
        })?;
        tx.apply(Command::RemoveBlock { block: at.block })?;
        return Ok(caret);
    }
    if at.offset == 0 {
        let caret = tx.apply(Command::InsertBlocks {
            anchor: BlockAnchor::Before(anchor),
            blocks,
        })?;
        return Ok(caret);
    }
    if at.offset < len && anchor == at.block {
        tx.apply(Command::SplitBlock { at })?;
    }
    tx.apply(Command::InsertBlocks {
        anchor: BlockAnchor::After(anchor),
        blocks,
    })
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::scheduler::Task;
    use crate::tests::testutils_editor::{caret_at, editor_with, select};

    #[test]
    fn a_collapsed_selection_copies_nothing() {
        let mut editor = editor_with("<p>abc</p>");
        caret_at(&mut editor, 0, 1);
        assert_eq!(editor.copy(), ClipboardPayload::default());
    }

    #[test]
    fn cut_removes_what_it_copies() {
        let mut editor = editor_with("<p>abcd</p>");
        select(&mut editor, 0, 1, 0, 3);
        let payload = editor.cut();
        assert_eq!(payload.text, "bc");
        assert_eq!(editor.get_content(), "<p>ad</p>");
    }

    #[test]
    fn text_lines_become_paragraphs() {
        let mut editor = editor_with("<p>ab</p>");
        caret_at(&mut editor, 0, 1);
        editor.paste(&ClipboardPayload::text("x\r\ny")).unwrap();
        assert_eq!(editor.get_content(), "<p>ax</p><p>yb</p>");
        let leaf = editor.document().leaves()[1];
        assert_eq!(editor.selection().focus, Position::new(leaf, 1));
    }

    #[test]
    fn one_paragraph_of_markup_is_spliced_in() {
        let mut editor = editor_with("<p>ab</p>");
        caret_at(&mut editor, 0, 1);
        editor
            .paste(&ClipboardPayload::html("<p><strong>x</strong></p>", "x"))
            .unwrap();
        assert_eq!(editor.get_content(), "<p>a<strong>x</strong>b</p>");
    }

    #[test]
    fn blocks_replace_an_empty_paragraph() {
        let mut editor = editor_with("<p><br></p>");
        editor
            .paste(&ClipboardPayload::html("<h2>T</h2><p>u</p>", "T\nu"))
            .unwrap();
        assert_eq!(editor.get_content(), "<h2>T</h2><p>u</p>");
        let leaf = editor.document().leaves()[1];
        assert_eq!(editor.selection().focus, Position::new(leaf, 1));
    }

    #[test]
    fn blocks_pasted_mid_paragraph_split_it() {
        let mut editor = editor_with("<p>abcd</p>");
        caret_at(&mut editor, 0, 2);
        editor
            .paste(&ClipboardPayload::html("<h2>T</h2><p>u</p>", "T\nu"))
            .unwrap();
        assert_eq!(editor.get_content(), "<p>ab</p><h2>T</h2><p>u</p><p>cd</p>");
    }

    #[test]
    fn code_blocks_take_plain_text() {
        let mut editor = editor_with("<pre><code>a</code></pre>");
        caret_at(&mut editor, 0, 1);
        editor
            .paste(&ClipboardPayload::html("<p><em>b</em></p>\n<p>c</p>", "b\nc"))
            .unwrap();
        assert_eq!(editor.get_content(), "<pre><code>ab\nc</code></pre>");
        let code = editor.document().code_block_ids()[0];
        assert_that!(editor.scheduler().is_scheduled(Task::Highlight(code).key())).is_true();
    }

    #[test]
    fn a_lone_image_is_embedded() {
        let mut editor = editor_with("<p>ab</p>");
        caret_at(&mut editor, 0, 2);
        editor
            .paste(&ClipboardPayload::html(r#"<img src="x.png">"#, ""))
            .unwrap();
        assert_eq!(editor.get_content(), r#"<p>ab</p><img src="x.png"><p><br></p>"#);
    }
}
