// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::Highlighter;
use crate::dom::block::BlockNode;
use crate::dom::code_block::{retained_language, CodeBlock, CodeRun};
use crate::dom::parser::parse_blocks_lenient;
use crate::error::HighlightError;

/// Builds the highlighted replacement for `code`.
///
/// Prior markup is stripped first, so highlighting never nests. Returns
/// `None` for blocks that are not highlighted at all: `no-highlight`
/// blocks and blank ones.
pub(crate) fn rebuild(
    code: &CodeBlock,
    highlighter: &dyn Highlighter,
) -> Result<Option<CodeBlock>, HighlightError> {
    if code.no_highlight {
        return Ok(None);
    }
    let text = code.text();
    if text.trim().is_empty() {
        return Ok(None);
    }
    let hint = retained_language(code.language.as_deref());
    let highlighted = highlighter.highlight(&text, hint.as_deref())?;

    let mut runs = parse_highlighted(&highlighted.html);
    if runs_text(&runs) != text {
        tracing::warn!(
            target: "memo_editor::code_block",
            "highlighter changed the text, keeping it plain"
        );
        runs = vec![CodeRun::plain(text)];
    }
    let language = retained_language(highlighted.language.as_deref()).or(hint);
    Ok(Some(CodeBlock {
        language,
        no_highlight: false,
        highlighted: true,
        runs,
    }))
}

/// Reads tagged-span markup into code runs; the innermost class list
/// wins.
pub(crate) fn parse_highlighted(html: &str) -> Vec<CodeRun> {
    let wrapped = format!(r#"<pre><code class="hljs">{html}</code></pre>"#);
    parse_blocks_lenient(&wrapped)
        .into_iter()
        .find_map(|block| match block.node {
            BlockNode::CodeBlock(code) => Some(code.runs),
            _ => None,
        })
        .unwrap_or_default()
}

fn runs_text(runs: &[CodeRun]) -> String {
    let mut out = String::new();
    for run in runs {
        match run {
            CodeRun::Text { text, .. } => out.push_str(text),
            CodeRun::LineBreak => out.push('\n'),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::code_block::Highlighted;

    /// Wraps every word in a keyword span.
    struct Words;

    impl Highlighter for Words {
        fn highlight(
            &self,
            text: &str,
            language: Option<&str>,
        ) -> Result<Highlighted, HighlightError> {
            let html = text
                .split(' ')
                .map(|w| format!(r#"<span class="hljs-keyword">{w}</span>"#))
                .collect::<Vec<_>>()
                .join(" ");
            Ok(Highlighted {
                html,
                language: language.map(str::to_owned).or(Some("text".into())),
            })
        }
    }

    struct Mangler;

    impl Highlighter for Mangler {
        fn highlight(&self, _: &str, _: Option<&str>) -> Result<Highlighted, HighlightError> {
            Ok(Highlighted {
                html: "<span>something else</span>".into(),
                language: None,
            })
        }
    }

    #[test]
    fn markup_becomes_classed_runs() {
        let code = CodeBlock::new(Some("rust".into()), false).with_text("let x");
        let out = rebuild(&code, &Words).unwrap().unwrap();
        assert!(out.highlighted);
        assert_eq!(out.language.as_deref(), Some("rust"));
        assert_eq!(
            out.runs,
            vec![
                CodeRun::Text {
                    text: "let".into(),
                    classes: Some("hljs-keyword".into())
                },
                CodeRun::plain(" "),
                CodeRun::Text {
                    text: "x".into(),
                    classes: Some("hljs-keyword".into())
                },
            ]
        );
    }

    #[test]
    fn rehighlighting_does_not_nest_markup() {
        let code = CodeBlock::new(None, false).with_text("a b");
        let once = rebuild(&code, &Words).unwrap().unwrap();
        let twice = rebuild(&once, &Words).unwrap().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn blank_and_opted_out_blocks_are_skipped() {
        let blank = CodeBlock::new(None, false).with_text("  \n");
        assert_eq!(rebuild(&blank, &Words).unwrap(), None);
        let off = CodeBlock::new(None, true).with_text("x");
        assert_eq!(rebuild(&off, &Words).unwrap(), None);
    }

    #[test]
    fn text_changing_markup_is_replaced_by_plain_text() {
        let code = CodeBlock::new(None, false).with_text("abc");
        let out = rebuild(&code, &Mangler).unwrap().unwrap();
        assert_eq!(out.runs, vec![CodeRun::plain("abc")]);
        assert!(out.highlighted);
    }
}
