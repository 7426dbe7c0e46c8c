// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::Editor;
use crate::command::{Command, Origin};
use crate::dom::block::{Block, BlockId, BlockNode};
use crate::dom::position::Position;
use crate::error::EditError;

impl Editor {
    /// Opens or closes an accordion, giving its new state. Closing it with
    /// the caret inside the body moves the caret to the end of the title.
    pub fn toggle_accordion(&mut self, block: BlockId) -> Result<bool, EditError> {
        let Some(BlockNode::Accordion(accordion)) = self.doc.get(block).map(Block::node)
        else {
            return Err(EditError::invalid(format!("block {block} is not an accordion")));
        };
        let expanded = !accordion.expanded;
        let title_end = Position::new(block, accordion.title.len());
        let caret_inside = self
            .doc
            .ancestors(self.selection.focus.block)
            .contains(&block);

        self.transact(Origin::User, |tx| {
            tx.apply(Command::SetAccordionExpanded { block, expanded })?;
            Ok((!expanded && caret_inside).then_some(title_end))
        })?;
        Ok(expanded)
    }

    /// An accordion whose title was emptied turns back into a paragraph once
    /// the caret leaves it.
    pub(crate) fn collapse_emptied_title(&mut self, block: BlockId) {
        let emptied = match self.doc.get(block).map(Block::node) {
            Some(BlockNode::Accordion(accordion)) => accordion.title.text().trim().is_empty(),
            _ => false,
        };
        if !emptied {
            return;
        }
        let caret_was_here = self.selection.focus.block == block;
        let result = self.transact(Origin::User, |tx| {
            let caret = tx.apply(Command::ReplaceBlock {
                block,
                with: vec![Block::empty_paragraph()],
            })?;
            Ok(caret_was_here.then_some(caret))
        });
        if let Err(e) = result {
            tracing::debug!(
                target: "memo_editor::command",
                %block,
                error = %e,
                "emptied accordion kept"
            );
        }
    }
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::dom::document::Document;
    use crate::dom::to_html::ToHtml;
    use crate::tests::testutils_editor::{caret_at, editor_with};

    fn accordion_html(title: &str, body: Block, expanded: bool) -> String {
        Document::from_blocks(vec![Block::accordion(title, vec![body], expanded)]).to_html()
    }

    fn accordion_id(editor: &Editor) -> BlockId {
        editor.document().blocks()[0].id()
    }

    #[test]
    fn toggling_flips_the_open_state() {
        let open = accordion_html("Title", Block::paragraph("body"), true);
        let mut editor = editor_with(&open);
        let id = accordion_id(&editor);
        assert_that!(editor.toggle_accordion(id)).is_equal_to(Ok(false));
        assert_eq!(
            editor.get_content(),
            accordion_html("Title", Block::paragraph("body"), false)
        );
        assert_that!(editor.toggle_accordion(id)).is_equal_to(Ok(true));
        assert_eq!(editor.get_content(), open);
    }

    #[test]
    fn closing_moves_the_caret_out_of_the_body() {
        let mut editor = editor_with(&accordion_html("Title", Block::paragraph("body"), true));
        let id = accordion_id(&editor);
        caret_at(&mut editor, 1, 2);
        editor.toggle_accordion(id).unwrap();
        assert_eq!(editor.selection().focus, Position::new(id, 5));
    }

    #[test]
    fn only_accordions_toggle() {
        let mut editor = editor_with("<p>a</p>");
        let id = accordion_id(&editor);
        assert_that!(editor.toggle_accordion(id)).is_err();
    }

    #[test]
    fn an_emptied_title_becomes_a_paragraph_on_blur() {
        let mut editor = editor_with(&accordion_html("", Block::empty_paragraph(), true));
        caret_at(&mut editor, 0, 0);
        editor.blur();
        assert_eq!(editor.get_content(), "<p><br></p>");
    }

    #[test]
    fn a_titled_accordion_survives_blur() {
        let html = accordion_html("kept", Block::empty_paragraph(), true);
        let mut editor = editor_with(&html);
        caret_at(&mut editor, 0, 4);
        editor.blur();
        assert_eq!(editor.get_content(), html);
    }
}
