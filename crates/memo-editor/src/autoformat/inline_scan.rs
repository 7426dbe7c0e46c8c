// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::command::{Command, Transaction};
use crate::dom::block::BlockId;
use crate::dom::inline::{InlineContent, InlineNode, StyleAttr, StyleSet};
use crate::dom::position::{Position, Range};
use crate::error::EditError;

static CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*[^*]+\*\*|\[[^\]]+\]\([^)]+\)|`[^`]+`|\*[^*]+\*|_[^_]+_")
        .expect("valid regex")
});
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex")
});
static CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*([^*]+)\*|_([^_]+)_").expect("valid regex")
});

type Stage = fn(&str, &StyleSet, &mut InlineContent);

/// Converts inline markdown in every plain text run of the document.
///
/// Runs that are already bold, italic, inline code or a link are left
/// alone, as is everything in code blocks. Returns the number of runs
/// rewritten.
pub(crate) fn scan_inline_markdown(
    tx: &mut Transaction<'_>,
) -> Result<usize, EditError> {
    let mut rewrites: Vec<(BlockId, usize, usize, InlineContent)> = Vec::new();
    for id in tx.doc().leaves() {
        let Some(content) = tx.doc().get(id).and_then(|b| b.inline()) else {
            continue;
        };
        for (start, run) in content.text_runs() {
            if run.style.is_scan_exempt() || !CANDIDATE.is_match(&run.text) {
                continue;
            }
            let converted = convert(&run.text, &run.style);
            if converted.text() != run.text {
                let len = run.text.chars().count();
                rewrites.push((id, start, len, converted));
            }
        }
    }
    let count = rewrites.len();
    // later runs first so earlier offsets stay valid
    for (id, start, len, content) in rewrites.into_iter().rev() {
        tx.apply(Command::DeleteRange {
            range: Range::within(id, start, start + len),
        })?;
        tx.apply(Command::InsertInline {
            at: Position::new(id, start),
            content,
        })?;
    }
    if count > 0 {
        tracing::debug!(target: "memo_editor::autoformat", count, "inline scan");
    }
    Ok(count)
}

/// Bold first, then links, inline code and italic in what is left.
fn convert(text: &str, base: &StyleSet) -> InlineContent {
    let mut out = InlineContent::new();
    bold(text, base, &mut out);
    out.normalized()
}

fn bold(text: &str, base: &StyleSet, out: &mut InlineContent) {
    split(&BOLD, text, base, out, link, |c| (group(c, 1), StyleAttr::Bold));
}

fn link(text: &str, base: &StyleSet, out: &mut InlineContent) {
    split(&LINK, text, base, out, code, |c| {
        (group(c, 1), StyleAttr::Link(group(c, 2).trim().to_owned()))
    });
}

fn code(text: &str, base: &StyleSet, out: &mut InlineContent) {
    split(&CODE, text, base, out, italic, |c| (group(c, 1), StyleAttr::Code));
}

fn italic(text: &str, base: &StyleSet, out: &mut InlineContent) {
    split(&ITALIC, text, base, out, plain, |c| {
        let inner = c.get(1).or_else(|| c.get(2)).map(|m| m.as_str());
        (inner.unwrap_or_default().to_owned(), StyleAttr::Italic)
    });
}

fn plain(text: &str, base: &StyleSet, out: &mut InlineContent) {
    out.push(InlineNode::text(text, base.clone()));
}

fn group(c: &Captures<'_>, i: usize) -> String {
    c.get(i).map(|m| m.as_str().to_owned()).unwrap_or_default()
}

/// Styles every match of `re` and hands the text between matches to the
/// next stage.
fn split(
    re: &Regex,
    text: &str,
    base: &StyleSet,
    out: &mut InlineContent,
    rest: Stage,
    matched: impl Fn(&Captures<'_>) -> (String, StyleAttr),
) {
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            rest(&text[last..whole.start()], base, out);
        }
        let (inner, attr) = matched(&caps);
        out.push(InlineNode::text(inner, base.clone().with(&attr)));
        last = whole.end();
    }
    if last < text.len() {
        rest(&text[last..], base, out);
    }
}
