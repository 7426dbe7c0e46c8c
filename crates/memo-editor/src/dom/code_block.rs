// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::inline::{byte_offset, char_len};

/// A run inside a code block: highlighted text carries the class list of
/// the highlighter span it came from. Line breaks only appear when the
/// platform injected a `<br>` and are repaired into `\n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodeRun {
    Text {
        text: String,
        classes: Option<String>,
    },
    LineBreak,
}

impl CodeRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            classes: None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text { text, .. } => char_len(text),
            Self::LineBreak => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeBlock {
    /// Declared language, without the `language-` prefix.
    pub language: Option<String>,
    /// Opted out of highlighting.
    pub no_highlight: bool,
    /// Carries highlighter markup (`hljs`, `data-highlighted`).
    pub highlighted: bool,
    pub runs: Vec<CodeRun>,
}

impl CodeBlock {
    pub fn new(language: Option<String>, no_highlight: bool) -> Self {
        Self {
            language: retained_language(language.as_deref()),
            no_highlight,
            highlighted: false,
            runs: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.set_plain_text(text);
        self
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                CodeRun::Text { text, .. } => out.push_str(text),
                CodeRun::LineBreak => out.push('\n'),
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.runs.iter().map(CodeRun::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_line_breaks(&self) -> bool {
        self.runs.iter().any(|r| matches!(r, CodeRun::LineBreak))
    }

    /// Replaces all runs with one unhighlighted run.
    pub fn set_plain_text(&mut self, text: &str) {
        self.runs.clear();
        if !text.is_empty() {
            self.runs.push(CodeRun::plain(text));
        }
        self.highlighted = false;
    }

    /// Drops highlighter markup, keeping the text and retained language.
    pub fn strip_markup(&mut self) {
        let text = self.text();
        self.set_plain_text(&text);
    }

    /// Turns stray line-break runs into literal newlines in place.
    pub fn normalize_line_breaks(&mut self) {
        for run in &mut self.runs {
            if matches!(run, CodeRun::LineBreak) {
                *run = CodeRun::plain("\n");
            }
        }
    }

    /// Direct splice into the run containing `offset`; the run structure is
    /// left alone apart from the run growing.
    pub fn insert_text(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut pos = 0;
        let mut target = None;
        for (i, run) in self.runs.iter().enumerate() {
            let len = run.len();
            // the run ending at the caret wins over the one starting there
            if matches!(run, CodeRun::Text { .. })
                && offset >= pos
                && offset <= pos + len
            {
                target = Some((i, offset - pos));
                break;
            }
            pos += len;
        }
        match target {
            Some((i, local)) => {
                if let CodeRun::Text { text: run_text, .. } = &mut self.runs[i]
                {
                    let at = byte_offset(run_text, local);
                    run_text.insert_str(at, text);
                }
            }
            None => {
                let idx = self.split_at(offset);
                self.runs.insert(idx, CodeRun::plain(text));
            }
        }
    }

    /// Inserts a line-break run, as a platform `<br>` would.
    pub(crate) fn insert_line_break(&mut self, offset: usize) {
        let idx = self.split_at(offset);
        self.runs.insert(idx, CodeRun::LineBreak);
    }

    pub fn delete(&mut self, from: usize, to: usize) {
        if from >= to {
            return;
        }
        let start = self.split_at(from);
        let end = self.split_at(to);
        self.runs.drain(start..end);
    }

    /// Splits the block at `offset`; the tail keeps the language but not the
    /// highlight markup.
    pub fn split_off(&mut self, offset: usize) -> CodeBlock {
        let idx = self.split_at(offset);
        let tail_runs = self.runs.split_off(idx);
        let mut tail = CodeBlock::new(self.language.clone(), self.no_highlight);
        tail.runs = tail_runs;
        tail.strip_markup();
        tail
    }

    pub fn slice(&self, from: usize, to: usize) -> CodeBlock {
        let text: String = self
            .text()
            .chars()
            .skip(from)
            .take(to.saturating_sub(from))
            .collect();
        CodeBlock::new(self.language.clone(), self.no_highlight)
            .with_text(&text)
    }

    fn split_at(&mut self, offset: usize) -> usize {
        let mut pos = 0;
        for i in 0..self.runs.len() {
            if offset == pos {
                return i;
            }
            let len = self.runs[i].len();
            if offset < pos + len {
                if let CodeRun::Text { text, classes } = &mut self.runs[i] {
                    let tail = text.split_off(byte_offset(text, offset - pos));
                    let classes = classes.clone();
                    self.runs
                        .insert(i + 1, CodeRun::Text { text: tail, classes });
                }
                return i + 1;
            }
            pos += len;
        }
        self.runs.len()
    }
}

/// Languages that count as "not declared".
pub(crate) fn retained_language(language: Option<&str>) -> Option<String> {
    match language.map(str::trim) {
        None | Some("") | Some("undefined") | Some("plaintext")
        | Some("text") => None,
        Some(lang) => Some(lang.to_lowercase()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn highlighted(parts: &[(&str, Option<&str>)]) -> CodeBlock {
        let mut block = CodeBlock::new(Some("rust".into()), false);
        block.runs = parts
            .iter()
            .map(|(t, c)| CodeRun::Text {
                text: t.to_string(),
                classes: c.map(str::to_owned),
            })
            .collect();
        block.highlighted = true;
        block
    }

    #[test]
    fn splice_grows_the_run_at_the_caret() {
        let mut block =
            highlighted(&[("fn", Some("hljs-keyword")), (" main", None)]);
        block.insert_text(2, "x");
        assert_eq!(block.text(), "fnx main");
        assert_eq!(block.runs.len(), 2);
        assert_eq!(
            block.runs[0],
            CodeRun::Text {
                text: "fnx".into(),
                classes: Some("hljs-keyword".into())
            }
        );
    }

    #[test]
    fn splice_into_an_empty_block_creates_a_run() {
        let mut block = CodeBlock::new(None, false);
        block.insert_text(0, "a");
        assert_eq!(block.text(), "a");
    }

    #[test]
    fn strip_markup_keeps_text_and_language() {
        let mut block =
            highlighted(&[("let", Some("hljs-keyword")), (" x = 1;", None)]);
        block.strip_markup();
        assert_eq!(block.runs, vec![CodeRun::plain("let x = 1;")]);
        assert_eq!(block.language.as_deref(), Some("rust"));
        assert!(!block.highlighted);
    }

    #[test]
    fn line_breaks_become_newlines() {
        let mut block = CodeBlock::new(None, false);
        block.runs = vec![
            CodeRun::plain("a"),
            CodeRun::LineBreak,
            CodeRun::plain("b"),
        ];
        assert!(block.has_line_breaks());
        block.normalize_line_breaks();
        assert!(!block.has_line_breaks());
        assert_eq!(block.text(), "a\nb");
    }

    #[test]
    fn delete_and_split() {
        let mut block = CodeBlock::new(None, false).with_text("abcdef");
        block.delete(1, 3);
        assert_eq!(block.text(), "adef");
        let tail = block.split_off(2);
        assert_eq!(block.text(), "ad");
        assert_eq!(tail.text(), "ef");
    }

    #[test]
    fn plaintext_is_not_a_retained_language() {
        assert_eq!(retained_language(Some("plaintext")), None);
        assert_eq!(retained_language(Some("Python")), Some("python".into()));
    }
}
