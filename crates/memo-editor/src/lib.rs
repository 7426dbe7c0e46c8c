// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Editing engine for a rich-text page/notes editor.
//!
//! The [`Editor`] owns a [`Document`] and routes every mutation through the
//! command layer, so history snapshots, the code-block subsystem and the
//! change feed all observe the same stream of committed batches. Hosts render
//! the editable surface from [`Editor::get_content`] and forward input,
//! selection, clipboard and timing events back to the editor.

mod autoformat;
mod change_feed;
mod clipboard;
mod code_block;
mod collaborators;
mod command;
mod config;
mod dom;
mod editor;
mod error;
mod history;
mod markdown;
mod scheduler;

#[cfg(test)]
mod tests;

pub use crate::autoformat::{detect_block_rule, Activation, BlockRule, BLOCK_RULES};
pub use crate::change_feed::{ChangeRecord, PlatformMutation};
pub use crate::clipboard::{
    prepare_html_for_copy, AncestorStyle, ClipboardPayload, ElementContext,
    ModelStyleResolver, StyleResolver, COPY_STYLE_ALLOW_LIST,
};
pub use crate::code_block::{
    default_highlighter, Activity, CodeBlockState, CodePhase, Gate,
    Highlighted, Highlighter,
};
#[cfg(feature = "syntect")]
pub use crate::code_block::SyntectHighlighter;
pub use crate::collaborators::{
    FileUpload, PageDraft, PagePersistence, SaveResponse, UploadEndpoint,
    UploadKind, UploadResponse,
};
pub use crate::command::{
    map_position, Applied, BlockAnchor, Command, Effect, Origin,
};
pub use crate::config::EditorConfig;
pub use crate::dom::block::{
    Accordion, Block, BlockId, BlockNode, BlockType, HeadingLevel, ListType,
    Media, MediaKind, Table, TableCell, TableRow,
};
pub use crate::dom::code_block::{CodeBlock, CodeRun};
pub use crate::dom::document::Document;
pub use crate::dom::inline::{
    InlineContent, InlineNode, StyleAttr, StyleKey, StyleSet, TextRun,
};
pub use crate::dom::parser::{parse_blocks, parse_document, HtmlParseError};
pub use crate::dom::position::{Position, Range, Selection};
pub use crate::dom::to_html::ToHtml;
pub use crate::dom::to_tree::ToTree;
pub use crate::editor::keys::{Key, KeyCombo, KeyOutcome, Modifiers, Shortcut};
pub use crate::editor::media::{video_embed_url, VideoSize};
pub use crate::editor::{ContentStatus, Editor, InputEvent, InputOutcome};
pub use crate::error::{EditError, HighlightError};
pub use crate::history::{History, Snapshot};
pub use crate::scheduler::{Scheduler, Task, TaskKind};
