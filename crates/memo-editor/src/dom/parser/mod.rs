// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

mod padom;
mod padom_creator;
mod parse;

pub(crate) use padom::{PaDom, PaDomHandle, PaDomNode};
pub(crate) use parse::{parse_blocks_lenient, parse_dom_lenient};
pub use parse::{parse_blocks, parse_document};

/// Markup html5ever could only parse by repairing it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("markup could not be parsed cleanly: {}", parse_errors.join(", "))]
pub struct HtmlParseError {
    pub parse_errors: Vec<String>,
}
