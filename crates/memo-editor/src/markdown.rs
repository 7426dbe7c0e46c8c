// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use pulldown_cmark::{html, Options, Parser};

/// Renders CommonMark (plus tables and strikethrough) to markup the block
/// parser understands.
pub(crate) fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);

    // push_html separates blocks with newlines, which would otherwise turn
    // into stray whitespace between blocks
    let trimmed = out.trim_end_matches('\n');
    trimmed.replace(">\n<", "><")
}
