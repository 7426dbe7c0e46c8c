// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::Editor;
use crate::command::{Command, Origin, Transaction};
use crate::dom::block::{Block, BlockType};
use crate::dom::inline::{InlineContent, StyleAttr, StyleKey};
use crate::dom::position::Range;
use crate::error::EditError;

impl Editor {
    /// Toggles `attr` on the selection: removed if every selected run has
    /// it, applied otherwise. With a collapsed caret the toggle applies to
    /// the next typed text instead.
    pub fn toggle_format(&mut self, attr: StyleAttr) -> Result<(), EditError> {
        let range = self.selection_range();
        if range.is_collapsed() {
            self.toggle_pending(attr);
            return Ok(());
        }
        self.save_state_to_history();
        self.transact(Origin::User, |tx| {
            let cmd = if spans_have(tx, range, &attr) {
                Command::UnwrapInline {
                    range,
                    key: attr.key(),
                }
            } else {
                Command::WrapInline { range, style: attr }
            };
            tx.apply(cmd)?;
            Ok(None)
        })?;
        Ok(())
    }

    fn toggle_pending(&mut self, attr: StyleAttr) {
        let caret = self.selection.focus;
        let inherited = self
            .doc
            .get(caret.block)
            .and_then(Block::inline)
            .map(|c| c.inherited_style(caret.offset))
            .unwrap_or_default();
        let key = attr.key();
        match self.pending_formats.iter().position(|(a, _)| a.key() == key) {
            Some(i) if self.pending_formats[i].0 == attr => {
                self.pending_formats.remove(i);
            }
            Some(i) => self.pending_formats[i] = (attr, true),
            None => {
                let on = !inherited.has_attr(&attr);
                self.pending_formats.push((attr, on));
            }
        }
    }

    /// Whether `key` is on for the next typed text or across the
    /// selection; toolbars use it for their pressed state.
    pub fn is_format_active(&self, key: StyleKey) -> bool {
        if let Some((_, on)) = self.pending_formats.iter().find(|(a, _)| a.key() == key) {
            return *on;
        }
        let range = self.selection_range();
        let Some(content) = self.doc.get(range.start.block).and_then(Block::inline) else {
            return false;
        };
        if range.is_collapsed() || !range.is_single_block() {
            content.inherited_style(range.start.offset).has(key)
        } else {
            content.all_have(range.start.offset, range.end.offset, key)
        }
    }

    /// Applies a valued style such as a colour or font size to the
    /// selection.
    pub fn apply_inline_style(&mut self, attr: StyleAttr) -> Result<(), EditError> {
        let range = self.selection_range();
        if range.is_collapsed() {
            self.pending_formats.retain(|(a, _)| a.key() != attr.key());
            self.pending_formats.push((attr, true));
            return Ok(());
        }
        self.save_state_to_history();
        self.transact(Origin::User, |tx| {
            tx.apply(Command::WrapInline { range, style: attr })?;
            Ok(None)
        })?;
        Ok(())
    }

    pub fn remove_inline_style(&mut self, key: StyleKey) -> Result<(), EditError> {
        let range = self.selection_range();
        if range.is_collapsed() {
            self.pending_formats.retain(|(a, _)| a.key() != key);
            return Ok(());
        }
        self.save_state_to_history();
        self.transact(Origin::User, |tx| {
            tx.apply(Command::UnwrapInline { range, key })?;
            Ok(None)
        })?;
        Ok(())
    }

    /// Links the selection to `url`, or inserts `url` as linked text at a
    /// collapsed caret. Blank input and the bare `https://` prompt default
    /// are ignored.
    pub fn set_link(&mut self, url: &str) -> Result<(), EditError> {
        let url = url.trim();
        if url.is_empty() || url == "https://" {
            return Ok(());
        }
        let range = self.selection_range();
        let attr = StyleAttr::Link(url.to_owned());
        self.save_state_to_history();
        self.transact(Origin::User, |tx| {
            if !range.is_collapsed() {
                tx.apply(Command::WrapInline { range, style: attr })?;
                return Ok(None);
            }
            let at = range.start;
            let style = tx
                .doc()
                .get(at.block)
                .and_then(Block::inline)
                .map(|c| c.inherited_style(at.offset))
                .unwrap_or_default()
                .with(&attr);
            tx.apply(Command::InsertInline {
                at,
                content: InlineContent::styled(url, style),
            })
            .map(Some)
        })?;
        Ok(())
    }

    pub fn remove_links(&mut self) -> Result<(), EditError> {
        self.remove_inline_style(StyleKey::Link)
    }

    /// Changes the type of every block the selection touches.
    pub fn set_block_type(&mut self, block_type: BlockType) -> Result<(), EditError> {
        let range = self.selection_range();
        self.save_state_to_history();
        self.transact(Origin::User, |tx| {
            let blocks: Vec<_> = tx
                .covered_spans(range)
                .into_iter()
                .map(|(id, _, _)| id)
                .collect();
            for block in blocks {
                tx.apply(Command::SetBlockType {
                    block,
                    block_type: block_type.clone(),
                })?;
            }
            Ok(None)
        })?;
        Ok(())
    }
}

/// True if every text run in `range` carries `attr`. Code blocks are
/// ignored.
fn spans_have(tx: &Transaction<'_>, range: Range, attr: &StyleAttr) -> bool {
    let mut any = false;
    for (id, from, to) in tx.covered_spans(range) {
        let Some(content) = tx.doc().get(id).and_then(Block::inline) else {
            continue;
        };
        if from >= to {
            continue;
        }
        for (_, run) in content.slice(from, to).text_runs() {
            if !run.style.has_attr(attr) {
                return false;
            }
            any = true;
        }
    }
    any
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::dom::block::HeadingLevel;
    use crate::dom::position::{Position, Selection};
    use crate::tests::testutils_editor::{caret_at, editor_with, select, type_text};

    #[test]
    fn bold_toggles_on_a_selection() {
        let mut editor = editor_with("<p>abc</p>");
        select(&mut editor, 0, 0, 0, 2);
        editor.toggle_format(StyleAttr::Bold).unwrap();
        assert_eq!(editor.get_content(), "<p><strong>ab</strong>c</p>");
        editor.toggle_format(StyleAttr::Bold).unwrap();
        assert_eq!(editor.get_content(), "<p>abc</p>");
    }

    #[test]
    fn formatting_keeps_the_selection() {
        let mut editor = editor_with("<p>abc</p>");
        select(&mut editor, 0, 1, 0, 3);
        let before = editor.selection();
        editor.toggle_format(StyleAttr::Italic).unwrap();
        assert_eq!(editor.selection(), before);
    }

    #[test]
    fn a_collapsed_toggle_styles_the_next_text() {
        let mut editor = editor_with("<p>a</p>");
        caret_at(&mut editor, 0, 1);
        editor.toggle_format(StyleAttr::Bold).unwrap();
        assert_that!(editor.is_format_active(StyleKey::Bold)).is_true();
        type_text(&mut editor, "b");
        assert_eq!(editor.get_content(), "<p>a<strong>b</strong></p>");
        type_text(&mut editor, "c");
        assert_eq!(editor.get_content(), "<p>a<strong>bc</strong></p>");
    }

    #[test]
    fn toggling_twice_cancels_the_pending_format() {
        let mut editor = editor_with("<p>a</p>");
        caret_at(&mut editor, 0, 1);
        editor.toggle_format(StyleAttr::Bold).unwrap();
        editor.toggle_format(StyleAttr::Bold).unwrap();
        type_text(&mut editor, "b");
        assert_eq!(editor.get_content(), "<p>ab</p>");
    }

    #[test]
    fn moving_the_caret_drops_pending_formats() {
        let mut editor = editor_with("<p>ab</p>");
        caret_at(&mut editor, 0, 2);
        editor.toggle_format(StyleAttr::Bold).unwrap();
        caret_at(&mut editor, 0, 0);
        type_text(&mut editor, "x");
        assert_eq!(editor.get_content(), "<p>xab</p>");
    }

    #[test]
    fn a_link_at_a_caret_inserts_the_url() {
        let mut editor = editor_with("<p>go </p>");
        caret_at(&mut editor, 0, 3);
        editor.set_link("https://example.org").unwrap();
        assert_eq!(
            editor.get_content(),
            r#"<p>go <a href="https://example.org">https://example.org</a></p>"#
        );
        let leaf = editor.document().leaves()[0];
        assert_eq!(editor.selection().focus, Position::new(leaf, 22));
    }

    #[test]
    fn the_prompt_default_is_not_a_link() {
        let mut editor = editor_with("<p>go</p>");
        select(&mut editor, 0, 0, 0, 2);
        editor.set_link("https://").unwrap();
        assert_eq!(editor.get_content(), "<p>go</p>");
    }

    #[test]
    fn block_types_apply_to_every_selected_block() {
        let mut editor = editor_with("<p>a</p><p>b</p>");
        let leaves = editor.document().leaves();
        editor
            .set_selection(Selection::new(
                Position::new(leaves[0], 0),
                Position::new(leaves[1], 1),
            ))
            .unwrap();
        editor
            .set_block_type(BlockType::Heading(HeadingLevel::new(2)))
            .unwrap();
        assert_eq!(editor.get_content(), "<h2>a</h2><h2>b</h2>");
    }
}
