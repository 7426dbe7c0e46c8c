// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{is_lone_media, ClipboardPayload};
use crate::dom::block::{Block, BlockNode, Media};
use crate::dom::inline::InlineContent;
use crate::dom::parser::parse_blocks_lenient;

/// How a paste is going to be inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PastePlan {
    /// Literal text; newlines start new paragraphs.
    Text(String),
    /// One paragraph's worth of content, spliced into the caret block.
    Inline(InlineContent),
    /// A lone media object, inserted as an embed.
    Embed(Media),
    Blocks(Vec<Block>),
    Nothing,
}

/// Decides what a paste inserts. Inside a code block only the plain text
/// is used.
pub(crate) fn plan_paste(payload: &ClipboardPayload, in_code_block: bool) -> PastePlan {
    let html = payload.html.as_deref().filter(|h| !h.trim().is_empty());
    let blocks = html.map(parse_blocks_lenient).unwrap_or_default();

    if in_code_block {
        let text = if payload.text.is_empty() {
            blocks.iter().map(Block::text).collect::<Vec<_>>().join("\n")
        } else {
            payload.text.clone()
        };
        return text_plan(text.replace("\r\n", "\n"));
    }
    if yields_nothing(&blocks) {
        return text_plan(payload.text.replace("\r\n", "\n"));
    }
    if is_lone_media(&blocks) {
        if let Some(media) = blocks.first().and_then(Block::media_node) {
            return PastePlan::Embed(media.clone());
        }
    }
    match blocks.as_slice() {
        [single] => match single.node() {
            BlockNode::Paragraph(content) => PastePlan::Inline(content.clone()),
            _ => PastePlan::Blocks(blocks),
        },
        _ => PastePlan::Blocks(blocks),
    }
}

fn text_plan(text: String) -> PastePlan {
    if text.is_empty() {
        PastePlan::Nothing
    } else {
        PastePlan::Text(text)
    }
}

/// Markup that parsed to no visible content.
fn yields_nothing(blocks: &[Block]) -> bool {
    blocks.iter().all(|b| {
        b.inline().is_some_and(InlineContent::is_empty) && b.child_lists().is_empty()
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dom::to_html::ToHtml;

    #[test]
    fn one_paragraph_is_spliced_inline() {
        let plan = plan_paste(
            &ClipboardPayload::html("<p>a <b>b</b></p>", "a b"),
            false,
        );
        let PastePlan::Inline(content) = plan else {
            panic!("expected inline content, got {plan:?}");
        };
        assert_eq!(content.to_html(), "a <strong>b</strong>");
    }

    #[test]
    fn a_lone_image_becomes_an_embed() {
        let plan = plan_paste(
            &ClipboardPayload::html(
                r#"<meta charset="utf-8"><img src="a.png" width="10" height="20">"#,
                "",
            ),
            false,
        );
        assert_eq!(
            plan,
            PastePlan::Embed(
                Media::image("a.png")
                    .with_attr("width", "10")
                    .with_attr("height", "20")
            )
        );
    }

    #[test]
    fn tables_are_kept_as_blocks() {
        let plan = plan_paste(
            &ClipboardPayload::html("<table><tr><td>x</td></tr></table>", "x"),
            false,
        );
        let PastePlan::Blocks(blocks) = plan else {
            panic!("expected blocks, got {plan:?}");
        };
        assert!(blocks[0]
            .to_html()
            .starts_with(r#"<div class="table-wrapper" contenteditable="false">"#));
    }

    #[test]
    fn empty_markup_falls_back_to_text() {
        assert_eq!(
            plan_paste(&ClipboardPayload::html("<span></span>", "raw"), false),
            PastePlan::Text("raw".into())
        );
        assert_eq!(
            plan_paste(&ClipboardPayload::text("a\r\nb"), false),
            PastePlan::Text("a\nb".into())
        );
        assert_eq!(plan_paste(&ClipboardPayload::text(""), false), PastePlan::Nothing);
    }

    #[test]
    fn code_blocks_only_take_text() {
        assert_eq!(
            plan_paste(&ClipboardPayload::html("<p><b>x</b></p>", "x"), true),
            PastePlan::Text("x".into())
        );
    }
}
