// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{prepare_html_for_copy, ClipboardPayload, StyleResolver};
use crate::dom::block::{Block, BlockId, BlockNode};
use crate::dom::document::Document;
use crate::dom::parser::{parse_dom_lenient, PaDomNode};
use crate::dom::position::Range;
use crate::dom::style::{format_style, parse_px, parse_style, set_style_value};
use crate::dom::to_html::ToHtml;

/// Clipboard content for `range`.
///
/// A selection holding exactly one media object and nothing else copies
/// only that object, with its geometry pinned. Anything else is copied as
/// markup with computed styles inlined.
pub(crate) fn copy_selection(
    doc: &Document,
    range: Range,
    resolver: &dyn StyleResolver,
) -> ClipboardPayload {
    let selected = SelectedLeaves::new(doc, range);
    let blocks = selected.prune(doc.blocks());
    let text = selected.text(doc);

    if let [block] = blocks.as_slice() {
        if let Some(media) = block.media_node() {
            return ClipboardPayload::html(lone_media_html(block), media.src.clone());
        }
    }
    let html = blocks.as_slice().to_html();
    ClipboardPayload::html(prepare_html_for_copy(&html, resolver), text)
}

/// True if `blocks` is one media object and nothing else.
pub(crate) fn is_lone_media(blocks: &[Block]) -> bool {
    matches!(blocks, [block] if block.is_media())
}

/// The media element's own markup with `width`/`height` copied into its
/// inline style.
fn lone_media_html(block: &Block) -> String {
    let mut dom = parse_dom_lenient(&block.to_html());
    let roots = dom.fragment_children();
    for root in &roots {
        if let PaDomNode::Container(el) = dom.get_mut_node(*root) {
            let mut style = el
                .get_attr("style")
                .map(parse_style)
                .unwrap_or_default();
            for name in ["width", "height"] {
                if let Some(px) = el.get_attr(name).and_then(parse_px) {
                    if name == "width" {
                        set_style_value(&mut style, "max-width", "none");
                    }
                    set_style_value(&mut style, name, &format!("{px}px"));
                }
            }
            el.attrs.retain(|(n, _)| n != "style" && n != "class" && n != "id");
            if !style.is_empty() {
                el.attrs.push(("style".to_owned(), format_style(&style)));
            }
        }
    }
    let mut out = String::new();
    for root in roots {
        dom.write_html(root, &mut out);
    }
    out
}

/// The leaves a range covers, with the covered part of each.
struct SelectedLeaves {
    spans: Vec<(BlockId, usize, usize)>,
}

impl SelectedLeaves {
    fn new(doc: &Document, range: Range) -> Self {
        let leaves = doc.leaves();
        let (Some(first), Some(last)) = (
            leaves.iter().position(|l| *l == range.start.block),
            leaves.iter().position(|l| *l == range.end.block),
        ) else {
            return Self { spans: Vec::new() };
        };
        let mut spans = Vec::new();
        for (i, id) in leaves.iter().enumerate().take(last + 1).skip(first) {
            let len = doc.get(*id).map(Block::text_len).unwrap_or(0);
            let from = if i == first { range.start.offset } else { 0 };
            let to = if i == last { range.end.offset } else { len };
            // a selection ending at the very start of a block leaves it out
            if i == last && i != first && to == 0 {
                continue;
            }
            spans.push((*id, from.min(len), to.min(len)));
        }
        Self { spans }
    }

    fn span_of(&self, id: BlockId) -> Option<(usize, usize)> {
        self.spans
            .iter()
            .find(|(b, _, _)| *b == id)
            .map(|(_, from, to)| (*from, *to))
    }

    fn text(&self, doc: &Document) -> String {
        self.spans
            .iter()
            .filter_map(|(id, from, to)| {
                let text = doc.get(*id)?.text();
                Some(text.chars().skip(*from).take(to - from).collect::<String>())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clones the part of `blocks` the selection covers. Containers keep
    /// only their covered children; tables are copied whole.
    fn prune(&self, blocks: &[Block]) -> Vec<Block> {
        blocks.iter().filter_map(|b| self.prune_block(b)).collect()
    }

    fn prune_block(&self, block: &Block) -> Option<Block> {
        match block.node() {
            BlockNode::Table(_) => {
                self.covers_any_cell(block).then(|| block.clone())
            }
            BlockNode::List { .. } | BlockNode::Quote(_) => {
                let mut copy = block.clone();
                let children: Vec<Block> = block
                    .child_lists()
                    .into_iter()
                    .flat_map(|list| self.prune(list))
                    .collect();
                if children.is_empty() {
                    return None;
                }
                if let Some(list) = copy.child_lists_mut().into_iter().next() {
                    *list = children;
                }
                Some(copy)
            }
            BlockNode::Accordion(_) => {
                let body: Vec<Block> = block
                    .child_lists()
                    .into_iter()
                    .flat_map(|list| self.prune(list))
                    .collect();
                let title = self.span_of(block.id());
                if title.is_none() && body.is_empty() {
                    return None;
                }
                let mut copy = block.clone();
                if let BlockNode::Accordion(accordion) = copy.node_mut() {
                    if let Some((from, to)) = title {
                        accordion.title = accordion.title.slice(from, to);
                    }
                    accordion.body = body;
                }
                Some(copy)
            }
            _ => {
                let (from, to) = self.span_of(block.id())?;
                let mut copy = block.clone();
                if let Some(code) = copy.code_mut() {
                    *code = code.slice(from, to);
                } else if let Some(inline) = copy.inline_mut() {
                    *inline = inline.slice(from, to);
                }
                Some(copy)
            }
        }
    }

    fn covers_any_cell(&self, table: &Block) -> bool {
        table
            .child_lists()
            .into_iter()
            .flatten()
            .any(|cell| self.span_of(cell.id()).is_some())
    }
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::clipboard::ModelStyleResolver;
    use crate::dom::block::Media;
    use crate::dom::position::Position;

    #[test]
    fn a_lone_image_is_copied_with_its_geometry() {
        let doc = Document::from_blocks(vec![
            Block::paragraph("before"),
            Block::media(
                Media::image("cat.png")
                    .with_attr("width", "320")
                    .with_attr("height", "200"),
            ),
        ]);
        let img = doc.leaves()[1];
        let payload = copy_selection(
            &doc,
            Range::within(img, 0, 1),
            &ModelStyleResolver::default(),
        );
        assert_eq!(
            payload.html.as_deref(),
            Some(
                r#"<img src="cat.png" width="320" height="200" style="max-width: none; width: 320px; height: 200px;">"#
            )
        );
        assert_eq!(payload.text, "cat.png");
    }

    #[test]
    fn a_partial_selection_copies_the_covered_text() {
        let doc = Document::from_blocks(vec![
            Block::paragraph("hello"),
            Block::paragraph("world"),
        ]);
        let leaves = doc.leaves();
        let payload = copy_selection(
            &doc,
            Range {
                start: Position::new(leaves[0], 3),
                end: Position::new(leaves[1], 2),
            },
            &ModelStyleResolver::default(),
        );
        assert_eq!(payload.text, "lo\nwo");
        let html = payload.html.unwrap_or_default();
        assert_that!(html.as_str()).contains(">lo</p>");
        assert_that!(html.as_str()).contains(">wo</p>");
    }

    #[test]
    fn lone_media_detection() {
        assert!(is_lone_media(&[Block::media(Media::image("a.png"))]));
        assert!(!is_lone_media(&[Block::paragraph("a")]));
    }
}
