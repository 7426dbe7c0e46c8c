// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::block::{Block, BlockNode};
use crate::dom::document::Document;
use crate::dom::inline::{InlineContent, InlineNode, StyleSet};

/// A debug rendering of the block tree, one block per line.
///
/// Text runs are prefixed with their style letters: `b` bold, `i` italic,
/// `u` underline, `s` strike, `c` inline code, `a` link, `k` color.
pub trait ToTree {
    fn to_tree(&self) -> String;
}

impl ToTree for Document {
    fn to_tree(&self) -> String {
        let mut out = String::new();
        write_children(&mut out, self.blocks(), "");
        out
    }
}

impl ToTree for Block {
    fn to_tree(&self) -> String {
        let mut out = String::new();
        write_children(&mut out, std::slice::from_ref(self), "");
        out
    }
}

fn write_children(out: &mut String, blocks: &[Block], indent: &str) {
    for (i, block) in blocks.iter().enumerate() {
        let last = i + 1 == blocks.len();
        out.push_str(indent);
        out.push_str(if last { "└>" } else { "├>" });
        out.push_str(&describe(block));
        out.push('\n');
        let child_indent =
            format!("{indent}{}", if last { "  " } else { "│ " });
        match block.node() {
            BlockNode::Table(table) => {
                for (r, row) in table.rows.iter().enumerate() {
                    let last_row = r + 1 == table.rows.len();
                    out.push_str(&child_indent);
                    out.push_str(if last_row { "└>tr\n" } else { "├>tr\n" });
                    let cell_indent = format!(
                        "{child_indent}{}",
                        if last_row { "  " } else { "│ " }
                    );
                    write_children(out, &row.cells, &cell_indent);
                }
            }
            _ => {
                for list in block.child_lists() {
                    write_children(out, list, &child_indent);
                }
            }
        }
    }
}

fn describe(block: &Block) -> String {
    let name = block.kind_name();
    match block.node() {
        BlockNode::CodeBlock(code) => {
            let lang = code
                .language
                .as_deref()
                .map(|l| format!("({l})"))
                .unwrap_or_default();
            format!("{name}{lang} {:?}", code.text())
        }
        BlockNode::Media(media) => format!("{name} {:?}", media.src),
        BlockNode::Accordion(accordion) => {
            let state = if accordion.expanded { " expanded" } else { "" };
            format!("{name} {}{state}", inline_runs(&accordion.title))
        }
        _ => match block.inline() {
            Some(content) => format!("{name} {}", inline_runs(content)),
            None => name.to_owned(),
        },
    }
}

fn inline_runs(content: &InlineContent) -> String {
    let content = content.normalized();
    if content.nodes().is_empty() {
        return "\"\"".to_owned();
    }
    content
        .nodes()
        .iter()
        .map(|node| match node {
            InlineNode::Text(run) => {
                format!("{}{:?}", style_letters(&run.style), run.text)
            }
            InlineNode::LineBreak => "↵".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn style_letters(style: &StyleSet) -> String {
    [
        (style.bold, 'b'),
        (style.italic, 'i'),
        (style.underline, 'u'),
        (style.strike, 's'),
        (style.code, 'c'),
        (style.link.is_some(), 'a'),
        (style.color.is_some(), 'k'),
    ]
    .iter()
    .filter(|(on, _)| *on)
    .map(|(_, letter)| *letter)
    .collect()
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;
    use crate::dom::block::ListType;

    #[test]
    fn tree_shows_nesting() {
        let doc = Document::from_blocks(vec![
            Block::heading(1, "Title"),
            Block::list(ListType::Unordered, &["a", "b"]),
            Block::accordion("acc", vec![Block::empty_paragraph()], true),
        ]);
        assert_eq!(
            doc.to_tree(),
            indoc! {r#"
                ├>h1 "Title"
                ├>ul
                │ ├>li "a"
                │ └>li "b"
                └>accordion "acc" expanded
                  └>p ""
            "#}
        );
    }
}
