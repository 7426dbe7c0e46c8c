// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Portable markup for the system clipboard.
//!
//! Copied markup carries its look inline, since the page it is pasted into
//! will not have the editor's stylesheet. Pasted markup goes through the
//! lenient parser and is inserted according to what it turned out to hold.

mod copy;
mod paste;
mod style_inline;

pub(crate) use copy::{copy_selection, is_lone_media};
pub(crate) use paste::{plan_paste, PastePlan};
pub use style_inline::{
    prepare_html_for_copy, AncestorStyle, ElementContext, ModelStyleResolver,
    StyleResolver, COPY_STYLE_ALLOW_LIST,
};

/// The two flavours a clipboard transfer carries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: Option<String>,
    pub text: String,
}

impl ClipboardPayload {
    pub fn html(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            html: None,
            text: text.into(),
        }
    }
}
