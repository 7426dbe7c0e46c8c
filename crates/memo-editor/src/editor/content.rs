// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::Editor;
use crate::collaborators::{PageDraft, PagePersistence};
use crate::dom::document::Document;
use crate::dom::parser::parse_document;
use crate::dom::position::Selection;
use crate::dom::to_html::ToHtml;
use crate::error::EditError;
use crate::history::Snapshot;
use crate::markdown::markdown_to_html;
use crate::scheduler::Task;

impl Editor {
    /// Replaces the whole document with `html`.
    ///
    /// History starts over from the loaded content. Malformed markup is
    /// refused and the current document is kept.
    pub fn set_content(&mut self, html: &str) -> Result<(), EditError> {
        let doc = parse_document(html)?;
        self.load(doc);
        Ok(())
    }

    /// Replaces the whole document with rendered markdown.
    pub fn set_content_from_markdown(&mut self, markdown: &str) -> Result<(), EditError> {
        self.set_content(&markdown_to_html(markdown))
    }

    pub fn get_content(&self) -> String {
        self.doc.to_html()
    }

    /// Plain text, one line per leaf block.
    pub fn get_text(&self) -> String {
        self.doc.text()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    fn load(&mut self, doc: Document) {
        self.doc = doc;
        self.selection = Selection::caret(self.doc.start());
        self.pending_formats.clear();
        self.history.reset(Snapshot::capture(&self.doc, Some(self.selection)));
        self.code.reset(&self.doc);
        self.scheduler = Default::default();
        self.feed.clear();
        tracing::debug!(
            target: "memo_editor::parser",
            blocks = self.doc.blocks().len(),
            "content loaded"
        );
        if !self.doc.code_block_ids().is_empty() {
            self.scheduler.schedule(
                self.now,
                self.config.rehighlight_delay,
                Task::RehighlightAll,
            );
        }
        self.notify();
    }

    /// Sends the page to `persistence`. The title is required.
    pub fn save_page(
        &self,
        title: &str,
        persistence: &dyn PagePersistence,
    ) -> Result<(), EditError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EditError::Persistence("title is required".into()));
        }
        let draft = PageDraft {
            title: title.to_owned(),
            content: self.get_content(),
        };
        let response = persistence.save(&draft);
        if response.success {
            tracing::info!(target: "memo_editor::command", title, "page saved");
            Ok(())
        } else {
            let error = response.error.unwrap_or_else(|| "unknown error".into());
            tracing::warn!(target: "memo_editor::command", title, %error, "save failed");
            Err(EditError::Persistence(error))
        }
    }
}
