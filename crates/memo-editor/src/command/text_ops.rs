// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{Effect, Transaction};
use crate::dom::block::{Block, BlockId, BlockNode};
use crate::dom::document::Step;
use crate::dom::inline::{char_len, InlineContent};
use crate::dom::position::{Position, Range};
use crate::error::EditError;

/// Content cut from the end of a range, waiting to be joined to its start.
enum Tail {
    Inline(InlineContent),
    Text(String),
}

impl Tail {
    fn is_empty(&self) -> bool {
        match self {
            Self::Inline(c) => c.is_empty(),
            Self::Text(t) => t.is_empty(),
        }
    }

    fn into_inline(self) -> InlineContent {
        match self {
            Self::Inline(c) => c,
            Self::Text(t) => InlineContent::plain(&t),
        }
    }

    fn into_text(self) -> String {
        match self {
            Self::Inline(c) => c.text(),
            Self::Text(t) => t,
        }
    }
}

impl Transaction<'_> {
    pub(super) fn insert_text(
        &mut self,
        at: Position,
        text: &str,
    ) -> Result<Position, EditError> {
        let at = self.doc.resolve(at)?;
        let text = text.replace('\r', "");
        if text.is_empty() {
            return Ok(at);
        }
        let locked = self.is_locked(at.block);
        let block = self.doc.get_mut(at.block).ok_or_else(|| {
            EditError::invalid(format!("block {} is not attached", at.block))
        })?;
        if block.is_media() {
            return Err(EditError::blocked("media blocks do not take text"));
        }
        if let Some(code) = block.code_mut() {
            if locked {
                return Err(EditError::blocked(format!(
                    "code block {} is still being inserted",
                    at.block
                )));
            }
            code.insert_text(at.offset, &text);
        } else {
            let content = block
                .inline_mut()
                .ok_or_else(|| EditError::invalid("block cannot hold text"))?;
            let style = content.inherited_style(at.offset);
            content.insert_text(at.offset, &text, style);
        }
        let len = char_len(&text);
        self.record(Effect::TextInserted {
            block: at.block,
            offset: at.offset,
            len,
        });
        Ok(Position::new(at.block, at.offset + len))
    }

    pub(super) fn insert_inline(
        &mut self,
        at: Position,
        content: InlineContent,
    ) -> Result<Position, EditError> {
        let at = self.doc.resolve(at)?;
        let len = content.len();
        if len == 0 {
            return Ok(at);
        }
        if self.doc.is_code_block(at.block) {
            return self.insert_text(at, &content.text());
        }
        let block = self.doc.get_mut(at.block).ok_or_else(|| {
            EditError::invalid(format!("block {} is not attached", at.block))
        })?;
        let target = block
            .inline_mut()
            .ok_or_else(|| EditError::blocked("block does not take text"))?;
        target.insert_content(at.offset, content);
        self.record(Effect::TextInserted {
            block: at.block,
            offset: at.offset,
            len,
        });
        Ok(Position::new(at.block, at.offset + len))
    }

    pub(super) fn delete_range(
        &mut self,
        range: Range,
    ) -> Result<Position, EditError> {
        let range = self.doc.range(range.start, range.end)?;
        if range.is_collapsed() {
            return Ok(range.start);
        }
        if range.is_single_block() {
            return self.delete_within(
                range.start.block,
                range.start.offset,
                range.end.offset,
            );
        }
        if self.covers_document(range) {
            return self.clear_document();
        }
        self.delete_across(range)
    }

    fn delete_within(
        &mut self,
        id: BlockId,
        from: usize,
        to: usize,
    ) -> Result<Position, EditError> {
        if self.doc.get(id).is_some_and(Block::is_media) {
            return self.remove_block(id);
        }
        let block = self.doc.get_mut(id).ok_or_else(|| {
            EditError::invalid(format!("block {id} is not attached"))
        })?;
        if let Some(code) = block.code_mut() {
            code.delete(from, to);
        } else if let Some(content) = block.inline_mut() {
            content.delete(from, to);
        }
        self.record(Effect::TextDeleted {
            block: id,
            from,
            to,
        });
        Ok(Position::new(id, from))
    }

    fn covers_document(&self, range: Range) -> bool {
        let leaves = self.doc.leaves();
        let (Some(first), Some(last)) = (leaves.first(), leaves.last()) else {
            return false;
        };
        let last_len = self.doc.get(*last).map(Block::text_len).unwrap_or(0);
        range.start == Position::new(*first, 0)
            && range.end == Position::new(*last, last_len)
    }

    fn clear_document(&mut self) -> Result<Position, EditError> {
        let removed = std::mem::take(&mut self.doc.blocks);
        for block in &removed {
            self.record_removed(block);
        }
        let mut p = Block::empty_paragraph();
        self.doc.adopt(&mut p);
        let id = p.id();
        self.doc.blocks.push(p);
        self.record(Effect::BlocksInserted { blocks: vec![id] });
        Ok(Position::new(id, 0))
    }

    /// Deletes a range whose ends are siblings in one container: the blocks
    /// between go, and what is left of the last block joins the first.
    fn delete_across(&mut self, range: Range) -> Result<Position, EditError> {
        let (start, end) = (range.start, range.end);
        let start_path = self.require_path(start.block)?;
        let end_path = self.require_path(end.block)?;
        if !same_list(&start_path, &end_path) {
            return Err(EditError::invalid(
                "range crosses a container boundary",
            ));
        }
        if self.doc.is_in_table(start.block) {
            return Err(EditError::invalid("range crosses table cells"));
        }
        let last_block = self.require(end.block)?;
        if !last_block.child_lists().is_empty() {
            return Err(EditError::invalid(
                "range ends inside a block with nested content",
            ));
        }
        let fallback = self.caret_near(start.block);
        let first_len = self.require(start.block)?.text_len();

        let i = start_path.last().map(|s| s.index).unwrap_or(0);
        let j = end_path.last().map(|s| s.index).unwrap_or(0);
        let list = self.doc.list_containing_mut(&start_path).ok_or_else(
            || EditError::invalid("range start is not attached"),
        )?;

        let (tail, remove_last) = match list[j].node() {
            BlockNode::Media(_) => (None, end.offset > 0),
            BlockNode::CodeBlock(code) => {
                let text = code.slice(end.offset, code.len()).text();
                (Some(Tail::Text(text)), true)
            }
            _ => {
                let content = list[j]
                    .inline()
                    .map(|c| c.slice(end.offset, c.len()))
                    .unwrap_or_default();
                (Some(Tail::Inline(content)), true)
            }
        };
        let removed: Vec<Block> =
            list.drain(i + 1..if remove_last { j + 1 } else { j }).collect();

        let first_id = list[i].id();
        let first_is_media = list[i].is_media();
        let mut caret = Position::new(first_id, start.offset);
        let mut orphan_tail = None;
        let mut first_removed = false;
        if first_is_media {
            orphan_tail = tail.filter(|t| !t.is_empty());
            if start.offset == 0 {
                list.remove(i);
                first_removed = true;
                caret = fallback;
            }
        } else if let Some(code) = list[i].code_mut() {
            code.delete(start.offset, code.len());
            if let Some(tail) = tail {
                let text = tail.into_text();
                code.insert_text(code.len(), &text);
            }
        } else if let Some(content) = list[i].inline_mut() {
            let len = content.len();
            content.delete(start.offset, len);
            if let Some(tail) = tail {
                content.append(tail.into_inline());
            }
        }

        if first_removed {
            self.record(Effect::BlockRemoved { block: first_id });
        } else if !first_is_media {
            self.record(Effect::TextDeleted {
                block: first_id,
                from: start.offset,
                to: first_len,
            });
        }
        for block in &removed {
            if block.id() == end.block && !first_is_media {
                self.record(Effect::TextDeleted {
                    block: end.block,
                    from: 0,
                    to: end.offset,
                });
                self.record(Effect::BlocksMerged {
                    into: first_id,
                    from: end.block,
                    offset: start.offset,
                });
            } else {
                self.record_removed(block);
            }
        }

        if let Some(tail) = orphan_tail {
            let mut p = Block::new(BlockNode::Paragraph(tail.into_inline()));
            self.doc.adopt(&mut p);
            let id = p.id();
            let at = if first_removed { i } else { i + 1 };
            if let Some(list) = self.doc.list_containing_mut(&start_path) {
                list.insert(at.min(list.len()), p);
            }
            self.record(Effect::BlocksInserted { blocks: vec![id] });
            caret = Position::new(id, 0);
        } else if first_is_media && !first_removed {
            caret = Position::new(first_id, 1);
        }
        Ok(caret)
    }

    pub(super) fn split_block(
        &mut self,
        at: Position,
    ) -> Result<Position, EditError> {
        let at = self.doc.resolve(at)?;
        let path = self.require_path(at.block)?;
        let block = self.doc.get_mut(at.block).ok_or_else(|| {
            EditError::invalid(format!("block {} is not attached", at.block))
        })?;
        let kind = block.kind_name();
        let mut new_block = match block.node_mut() {
            BlockNode::Paragraph(content) => {
                Block::new(BlockNode::Paragraph(content.split_off(at.offset)))
            }
            BlockNode::Heading { level, content } => {
                let tail = content.split_off(at.offset);
                if tail.is_empty() {
                    Block::empty_paragraph()
                } else {
                    Block::new(BlockNode::Heading {
                        level: *level,
                        content: tail,
                    })
                }
            }
            BlockNode::ListItem(content) => {
                Block::new(BlockNode::ListItem(content.split_off(at.offset)))
            }
            BlockNode::CodeBlock(code) => {
                Block::new(BlockNode::CodeBlock(code.split_off(at.offset)))
            }
            BlockNode::Media(_) => Block::empty_paragraph(),
            _ => {
                return Err(EditError::invalid(format!("{kind} cannot be split")))
            }
        };
        let media_before = self.doc.get(at.block).is_some_and(Block::is_media)
            && at.offset == 0;
        self.doc.adopt(&mut new_block);
        let new_id = new_block.id();
        let index = path.last().map(|s| s.index).unwrap_or(0);
        let list = self.doc.list_containing_mut(&path).ok_or_else(|| {
            EditError::invalid(format!("block {} is not attached", at.block))
        })?;
        if media_before {
            list.insert(index, new_block);
            self.record(Effect::BlocksInserted {
                blocks: vec![new_id],
            });
            return Ok(at);
        }
        list.insert(index + 1, new_block);
        self.record(Effect::BlockSplit {
            block: at.block,
            offset: at.offset,
            new_block: new_id,
        });
        Ok(Position::new(new_id, 0))
    }

    pub(super) fn merge_blocks(
        &mut self,
        first: BlockId,
        second: BlockId,
    ) -> Result<Position, EditError> {
        if first == second {
            return Err(EditError::invalid("cannot merge a block into itself"));
        }
        let into = self.require(first)?;
        let from = self.require(second)?;
        let mergeable = |b: &Block| {
            (b.inline().is_some() || b.is_code_block())
                && !matches!(b.node(), BlockNode::TableCell(_))
        };
        if !mergeable(into) || !mergeable(from) {
            return Err(EditError::invalid(format!(
                "cannot merge {} into {}",
                from.kind_name(),
                into.kind_name()
            )));
        }
        if !from.child_lists().is_empty() {
            return Err(EditError::invalid(
                "cannot merge a block with nested content",
            ));
        }
        let offset = into.text_len();
        let path = self.require_path(second)?;
        let index = path.last().map(|s| s.index).unwrap_or(0);
        let removed = self
            .doc
            .list_containing_mut(&path)
            .map(|list| list.remove(index))
            .ok_or_else(|| EditError::invalid("block is not attached"))?;
        let tail = match removed.node() {
            BlockNode::CodeBlock(code) => Tail::Text(code.text()),
            _ => Tail::Inline(removed.inline().cloned().unwrap_or_default()),
        };
        let target = self
            .doc
            .get_mut(first)
            .ok_or_else(|| EditError::invalid("block is not attached"))?;
        if let Some(code) = target.code_mut() {
            let text = tail.into_text();
            code.insert_text(code.len(), &text);
        } else if let Some(content) = target.inline_mut() {
            content.append(tail.into_inline());
        }
        self.record(Effect::BlocksMerged {
            into: first,
            from: second,
            offset,
        });
        Ok(Position::new(first, offset))
    }

    pub(super) fn require(&self, id: BlockId) -> Result<&Block, EditError> {
        self.doc
            .get(id)
            .ok_or_else(|| EditError::invalid(format!("block {id} is not attached")))
    }

    pub(super) fn require_path(
        &self,
        id: BlockId,
    ) -> Result<Vec<Step>, EditError> {
        self.doc
            .path_of(id)
            .ok_or_else(|| EditError::invalid(format!("block {id} is not attached")))
    }
}

fn same_list(a: &[Step], b: &[Step]) -> bool {
    match (a.split_last(), b.split_last()) {
        (Some((la, pa)), Some((lb, pb))) => pa == pb && la.list == lb.list,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::super::{Command, Origin};
    use crate::dom::block::{Block, ListType, Media};
    use crate::dom::document::Document;
    use crate::dom::position::{Position, Range};
    use crate::error::EditError;
    use crate::{ToHtml, ToTree};

    fn doc(blocks: Vec<Block>) -> Document {
        Document::from_blocks(blocks)
    }

    fn apply(doc: &mut Document, cmd: Command) -> Result<Position, EditError> {
        cmd.apply_to(doc, Origin::User).map(|a| a.caret)
    }

    #[test]
    fn insert_text_inherits_the_left_style() {
        let mut d = Document::from_blocks(vec![Block::paragraph("ab")]);
        let leaf = d.leaves()[0];
        apply(&mut d, Command::WrapInline {
            range: Range::within(leaf, 0, 2),
            style: crate::StyleAttr::Bold,
        })
        .unwrap();
        let caret = apply(&mut d, Command::InsertText {
            at: Position::new(leaf, 2),
            text: "c".into(),
        })
        .unwrap();
        assert_eq!(caret, Position::new(leaf, 3));
        assert_eq!(d.to_html(), "<p><strong>abc</strong></p>");
    }

    #[test]
    fn insert_text_into_media_is_blocked() {
        let mut d = doc(vec![Block::media(Media::image("a.png"))]);
        let leaf = d.leaves()[0];
        let result = apply(&mut d, Command::InsertText {
            at: Position::new(leaf, 0),
            text: "x".into(),
        });
        assert!(matches!(result, Err(EditError::Blocked(_))));
    }

    #[test]
    fn delete_across_sibling_paragraphs_merges_the_tail() {
        let mut d = doc(vec![
            Block::paragraph("hello"),
            Block::paragraph("middle"),
            Block::paragraph("world"),
        ]);
        let leaves = d.leaves();
        let caret = apply(&mut d, Command::DeleteRange {
            range: Range {
                start: Position::new(leaves[0], 2),
                end: Position::new(leaves[2], 3),
            },
        })
        .unwrap();
        assert_eq!(d.to_html(), "<p>held</p>");
        assert_eq!(caret, Position::new(leaves[0], 2));
    }

    #[test]
    fn delete_across_containers_is_refused() {
        let mut d = doc(vec![
            Block::paragraph("a"),
            Block::list(ListType::Unordered, &["b"]),
            Block::paragraph("c"),
        ]);
        let leaves = d.leaves();
        let result = apply(&mut d, Command::DeleteRange {
            range: Range {
                start: Position::new(leaves[0], 0),
                end: Position::new(leaves[1], 1),
            },
        });
        assert!(matches!(result, Err(EditError::InvalidRange(_))));
    }

    #[test]
    fn deleting_everything_leaves_one_empty_paragraph() {
        let mut d = doc(vec![
            Block::heading(1, "a"),
            Block::list(ListType::Unordered, &["b"]),
            Block::code_block(None, "c"),
        ]);
        let leaves = d.leaves();
        apply(&mut d, Command::DeleteRange {
            range: Range {
                start: Position::new(leaves[0], 0),
                end: Position::new(leaves[2], 1),
            },
        })
        .unwrap();
        assert_eq!(d.to_html(), "<p><br></p>");
    }

    #[test]
    fn split_heading_at_end_gives_a_paragraph() {
        let mut d = doc(vec![Block::heading(2, "Title")]);
        let leaf = d.leaves()[0];
        let caret = apply(&mut d, Command::SplitBlock {
            at: Position::new(leaf, 5),
        })
        .unwrap();
        assert_eq!(d.to_html(), "<h2>Title</h2><p><br></p>");
        assert_eq!(caret.block, d.leaves()[1]);
    }

    #[test]
    fn split_list_item_creates_a_sibling_item() {
        let mut d = doc(vec![Block::list(ListType::Ordered, &["onetwo"])]);
        let leaf = d.leaves()[0];
        apply(&mut d, Command::SplitBlock {
            at: Position::new(leaf, 3),
        })
        .unwrap();
        assert_eq!(d.to_html(), "<ol><li>one</li><li>two</li></ol>");
    }

    #[test]
    fn merge_list_item_into_previous_paragraph_drops_the_empty_list() {
        let mut d = doc(vec![
            Block::paragraph("a"),
            Block::list(ListType::Unordered, &["b"]),
        ]);
        let leaves = d.leaves();
        let caret = apply(&mut d, Command::MergeBlocks {
            first: leaves[0],
            second: leaves[1],
        })
        .unwrap();
        assert_eq!(d.to_tree(), "└>p \"ab\"\n");
        assert_eq!(caret, Position::new(leaves[0], 1));
    }

    #[test]
    fn merge_paragraph_into_code_appends_plain_text() {
        let mut d = doc(vec![
            Block::code_block(Some("rust"), "let a;\n"),
            Block::paragraph("b"),
        ]);
        let leaves = d.leaves();
        apply(&mut d, Command::MergeBlocks {
            first: leaves[0],
            second: leaves[1],
        })
        .unwrap();
        assert_eq!(d.blocks().len(), 1);
        assert_eq!(d.blocks()[0].text(), "let a;\nb");
    }
}
