// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use thiserror::Error;

use crate::dom::block::BlockId;
use crate::dom::parser::HtmlParseError;

/// Errors surfaced by the command layer and the editor facade.
///
/// Nothing here is fatal: every variant leaves the document in its last
/// valid state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EditError {
    /// The range or position crosses a non-editable boundary or no longer
    /// resolves against the document. The command is refused.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// The target is inside a transient locked region, such as a code block
    /// that is still being inserted. Retry on a later tick.
    #[error("blocked: {0}")]
    Blocked(String),

    /// An upload collaborator reported a failure. The document is untouched.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Platform damage to a code block. Repaired internally, only logged.
    #[error("code block {0} is structurally damaged")]
    StructuralCorruption(BlockId),

    #[error(transparent)]
    Markup(#[from] HtmlParseError),

    #[error("page could not be saved: {0}")]
    Persistence(String),
}

impl EditError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRange(reason.into())
    }

    pub(crate) fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked(reason.into())
    }
}

/// Failure reported by a [`crate::Highlighter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HighlightError {
    #[error("no grammar available for language `{0}`")]
    UnknownLanguage(String),

    #[error("highlighter failed: {0}")]
    Failed(String),
}
