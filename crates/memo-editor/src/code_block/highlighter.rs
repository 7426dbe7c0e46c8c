// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::error::HighlightError;

/// Output of a highlighter: tagged-span markup for the text and the
/// language it was highlighted as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Highlighted {
    /// `<span class="...">` markup whose text content equals the input.
    pub html: String,
    pub language: Option<String>,
}

/// A pluggable syntax highlighter.
pub trait Highlighter {
    /// Highlights `text`. `language` is the block's declared language, if
    /// any; implementations may detect one otherwise.
    fn highlight(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<Highlighted, HighlightError>;
}

/// The highlighter an editor gets when the host does not supply one.
pub fn default_highlighter() -> Option<Box<dyn Highlighter>> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "syntect")] {
            Some(Box::new(SyntectHighlighter::new()))
        } else {
            None
        }
    }
}

#[cfg(feature = "syntect")]
pub use self::syntect_backend::SyntectHighlighter;

#[cfg(feature = "syntect")]
mod syntect_backend {
    use syntect::html::{ClassStyle, ClassedHTMLGenerator};
    use syntect::parsing::{SyntaxReference, SyntaxSet};
    use syntect::util::LinesWithEndings;

    use super::{Highlighted, Highlighter};
    use crate::error::HighlightError;

    /// Highlights with syntect's bundled grammars, emitting `hljs-` prefixed
    /// classes so stylesheets written for highlight.js keep working.
    pub struct SyntectHighlighter {
        syntaxes: SyntaxSet,
    }

    impl Default for SyntectHighlighter {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SyntectHighlighter {
        pub fn new() -> Self {
            Self {
                syntaxes: SyntaxSet::load_defaults_newlines(),
            }
        }

        fn syntax_for(&self, text: &str, language: Option<&str>) -> &SyntaxReference {
            language
                .and_then(|lang| self.syntaxes.find_syntax_by_token(lang))
                .or_else(|| {
                    text.lines()
                        .next()
                        .and_then(|line| self.syntaxes.find_syntax_by_first_line(line))
                })
                .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
        }
    }

    impl Highlighter for SyntectHighlighter {
        fn highlight(
            &self,
            text: &str,
            language: Option<&str>,
        ) -> Result<Highlighted, HighlightError> {
            let syntax = self.syntax_for(text, language);
            let mut generator = ClassedHTMLGenerator::new_with_class_style(
                syntax,
                &self.syntaxes,
                ClassStyle::SpacedPrefixed { prefix: "hljs-" },
            );
            for line in LinesWithEndings::from(text) {
                generator
                    .parse_html_for_line_which_includes_newline(line)
                    .map_err(|e| HighlightError::Failed(e.to_string()))?;
            }
            let language = if syntax.name == "Plain Text" {
                language.map(str::to_owned)
            } else {
                Some(syntax.name.to_lowercase())
            };
            Ok(Highlighted {
                html: generator.finalize(),
                language,
            })
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;
        use crate::code_block::highlight::parse_highlighted;

        #[test]
        fn rust_is_tagged_and_keeps_its_text() {
            let highlighter = SyntectHighlighter::new();
            let text = "fn main() {}\n";
            let out = highlighter.highlight(text, Some("rust")).unwrap();
            assert_eq!(out.language.as_deref(), Some("rust"));
            assert!(out.html.contains("hljs-"));
            let runs = parse_highlighted(&out.html);
            let rebuilt: String = runs
                .iter()
                .map(|r| match r {
                    crate::dom::code_block::CodeRun::Text { text, .. } => text.as_str(),
                    crate::dom::code_block::CodeRun::LineBreak => "\n",
                })
                .collect();
            assert_eq!(rebuilt, text);
        }

        #[test]
        fn unknown_languages_fall_back_to_plain_text() {
            let highlighter = SyntectHighlighter::new();
            let out = highlighter.highlight("hello", Some("no-such-lang")).unwrap();
            assert_eq!(out.language.as_deref(), Some("no-such-lang"));
        }
    }
}
