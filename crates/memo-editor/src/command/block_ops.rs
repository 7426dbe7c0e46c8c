// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{BlockAnchor, Effect, Transaction};
use crate::dom::block::{
    Accordion, Block, BlockId, BlockNode, BlockType, ListType, Media,
};
use crate::dom::code_block::{retained_language, CodeBlock};
use crate::dom::document::{Document, Step};
use crate::dom::inline::InlineContent;
use crate::dom::position::Position;
use crate::error::EditError;

impl Transaction<'_> {
    pub(super) fn set_block_type(
        &mut self,
        id: BlockId,
        block_type: BlockType,
    ) -> Result<Position, EditError> {
        let block = self.require(id)?;
        if !block.is_leaf()
            || matches!(block.node(), BlockNode::TableCell(_) | BlockNode::Media(_))
        {
            return Err(EditError::invalid(format!(
                "{} cannot change type",
                block.kind_name()
            )));
        }
        let content = match block.node() {
            BlockNode::CodeBlock(code) => InlineContent::plain(&code.text()),
            _ => block.inline().cloned().unwrap_or_default(),
        };
        if block_type == BlockType::Accordion
            && matches!(block.node(), BlockNode::Accordion(_))
        {
            return Ok(Position::new(id, 0));
        }
        let list_type = self.enclosing_list_type(id);

        match block_type {
            BlockType::ListItem(target) => {
                self.make_list_item(id, content, list_type, target)?
            }
            BlockType::Quote => {
                if list_type.is_some() {
                    self.lift_out_of_list(id)?;
                    self.replace_node(id, BlockNode::Paragraph(content))?;
                }
                self.toggle_quote(id)?;
            }
            other => {
                if list_type.is_some() {
                    self.lift_out_of_list(id)?;
                }
                let node = match other {
                    BlockType::Heading(level) => {
                        BlockNode::Heading { level, content }
                    }
                    BlockType::CodeBlock {
                        language,
                        no_highlight,
                    } => BlockNode::CodeBlock(
                        CodeBlock::new(
                            retained_language(language.as_deref()),
                            no_highlight,
                        )
                        .with_text(&content.text()),
                    ),
                    BlockType::Accordion => {
                        let mut body = Block::empty_paragraph();
                        self.doc.adopt(&mut body);
                        BlockNode::Accordion(Accordion {
                            title: content,
                            body: vec![body],
                            expanded: true,
                        })
                    }
                    _ => BlockNode::Paragraph(content),
                };
                self.replace_node(id, node)?;
            }
        }
        self.record(Effect::BlockChanged { block: id });
        Ok(Position::new(id, 0))
    }

    fn enclosing_list_type(&self, id: BlockId) -> Option<ListType> {
        let parent = self.doc.parent_of(id)?;
        match self.doc.get(parent)?.node() {
            BlockNode::List { list_type, .. } => Some(*list_type),
            _ => None,
        }
    }

    /// Swaps the node of `id` in place. An accordion that stops being one
    /// leaves its body behind as following siblings.
    fn replace_node(
        &mut self,
        id: BlockId,
        node: BlockNode,
    ) -> Result<(), EditError> {
        let path = self.require_path(id)?;
        let block = self.doc.get_mut(id).ok_or_else(|| {
            EditError::invalid(format!("block {id} is not attached"))
        })?;
        let keeps_body = matches!(node, BlockNode::Accordion(_));
        let old = std::mem::replace(&mut block.node, node);
        if let (BlockNode::Accordion(old), false) = (old, keeps_body) {
            let index = path.last().map(|s| s.index).unwrap_or(0);
            self.splice(&path, index + 1, old.body)?;
        }
        Ok(())
    }

    /// Moves a list item out of its list, splitting the list around it.
    fn lift_out_of_list(&mut self, id: BlockId) -> Result<(), EditError> {
        let path = self.require_path(id)?;
        let Some((item_step, list_path)) = path.split_last() else {
            return Ok(());
        };
        let wrapper_id = self.doc.next_block_id();
        let list_block =
            self.doc.block_at_path_mut(list_path).ok_or_else(|| {
                EditError::invalid(format!("block {id} is not attached"))
            })?;
        let BlockNode::List { list_type, items } = list_block.node_mut() else {
            return Ok(());
        };
        let list_type = *list_type;
        let after = items.split_off(item_step.index + 1);
        let item = items.remove(item_step.index);
        let mut moved = vec![item];
        if !after.is_empty() {
            let mut tail = Block::new(BlockNode::List {
                list_type,
                items: after,
            });
            tail.id = wrapper_id;
            moved.push(tail);
        }
        let list_index = list_path.last().map(|s| s.index).unwrap_or(0);
        self.splice(list_path, list_index + 1, moved)
    }

    fn make_list_item(
        &mut self,
        id: BlockId,
        content: InlineContent,
        current: Option<ListType>,
        target: ListType,
    ) -> Result<(), EditError> {
        if let Some(current) = current {
            if current != target {
                let parent = self.doc.parent_of(id).ok_or_else(|| {
                    EditError::invalid("list item has no list")
                })?;
                if let Some(BlockNode::List { list_type, .. }) =
                    self.doc.get_mut(parent).map(Block::node_mut)
                {
                    *list_type = target;
                }
            }
            return Ok(());
        }

        let previous = self.doc.previous_sibling(id);
        let joins_previous = previous
            .and_then(|p| self.doc.get(p))
            .is_some_and(|p| {
                matches!(p.node(), BlockNode::List { list_type, .. } if *list_type == target)
            });

        // the body of an accordion being turned into an item stays behind
        self.replace_node(id, BlockNode::ListItem(content))?;
        let (path, item) = self.detach(id)?;
        let index = path.last().map(|s| s.index).unwrap_or(0);

        if let (true, Some(previous)) = (joins_previous, previous) {
            if let Some(BlockNode::List { items, .. }) =
                self.doc.get_mut(previous).map(Block::node_mut)
            {
                items.push(item);
            }
            return Ok(());
        }
        let mut list = Block::new(BlockNode::List {
            list_type: target,
            items: vec![item],
        });
        list.id = self.doc.next_block_id();
        self.splice(&path, index, vec![list])
    }

    /// Wraps the block in a quote, or unwraps the quote it is already in.
    fn toggle_quote(&mut self, id: BlockId) -> Result<(), EditError> {
        if let Some(parent) = self.doc.parent_of(id) {
            if matches!(
                self.doc.get(parent).map(Block::node),
                Some(BlockNode::Quote(_))
            ) {
                let (path, quote) = self.detach(parent)?;
                let index = path.last().map(|s| s.index).unwrap_or(0);
                let BlockNode::Quote(children) = quote.node else {
                    return Ok(());
                };
                return self.splice(&path, index, children);
            }
        }
        let (path, block) = self.detach(id)?;
        let index = path.last().map(|s| s.index).unwrap_or(0);
        let mut quote = Block::new(BlockNode::Quote(vec![block]));
        quote.id = self.doc.next_block_id();
        self.splice(&path, index, vec![quote])
    }

    pub(super) fn insert_blocks(
        &mut self,
        anchor: BlockAnchor,
        blocks: Vec<Block>,
    ) -> Result<Position, EditError> {
        if blocks.is_empty() {
            return Err(EditError::invalid("nothing to insert"));
        }
        let (path, index) = self.anchor_slot(anchor)?;
        self.check_fits(&path, &blocks)?;
        let mut blocks = blocks;
        for block in &mut blocks {
            self.doc.adopt(block);
        }
        let ids: Vec<BlockId> = blocks.iter().map(Block::id).collect();
        let caret = blocks.last().and_then(Document::last_leaf_of);
        self.splice(&path, index, blocks)?;
        self.record(Effect::BlocksInserted { blocks: ids });
        let caret = caret
            .and_then(|leaf| self.doc.get(leaf).map(|b| (leaf, b.text_len())))
            .map(|(leaf, len)| Position::new(leaf, len))
            .unwrap_or_else(|| self.doc.start());
        Ok(caret)
    }

    pub(super) fn remove_block(
        &mut self,
        id: BlockId,
    ) -> Result<Position, EditError> {
        let caret = self.caret_near(id);
        let (_, removed) = self.detach(id)?;
        self.record_removed(&removed);
        Ok(caret)
    }

    pub(super) fn replace_block(
        &mut self,
        id: BlockId,
        with: Vec<Block>,
    ) -> Result<Position, EditError> {
        if with.is_empty() {
            return self.remove_block(id);
        }
        let path = self.require_path(id)?;
        self.check_fits(&path, &with)?;
        let (path, removed) = self.detach(id)?;
        let index = path.last().map(|s| s.index).unwrap_or(0);
        let mut with = with;
        for block in &mut with {
            self.doc.adopt(block);
        }
        let ids: Vec<BlockId> = with.iter().map(Block::id).collect();
        let first_leaf = with.first().and_then(Document::first_leaf_of);
        self.splice(&path, index, with)?;
        self.record_removed(&removed);
        self.record(Effect::BlocksInserted { blocks: ids });
        Ok(first_leaf
            .map(|leaf| Position::new(leaf, 0))
            .unwrap_or_else(|| self.doc.start()))
    }

    /// Inserts a media block at a caret. Media never nests inside list
    /// items, table cells or accordion titles, so in those it goes after the
    /// enclosing container.
    pub(super) fn insert_embed(
        &mut self,
        at: Position,
        embed: Media,
    ) -> Result<Position, EditError> {
        let at = self.doc.resolve(at)?;
        let host = self.require(at.block)?;
        let host_len = host.text_len();
        let host_is_media = host.is_media();
        let host_is_code = host.is_code_block();
        let host_is_empty = host.inline().is_some_and(InlineContent::is_empty);

        let mut media = Block::media(embed);
        self.doc.adopt(&mut media);
        let media_id = media.id();

        if let Some(container) = self.embed_container(at.block) {
            let (path, index) = self.anchor_slot(BlockAnchor::After(container))?;
            self.splice(&path, index, vec![media])?;
        } else if host_is_empty && !host_is_code {
            let (path, removed) = self.detach(at.block)?;
            let index = path.last().map(|s| s.index).unwrap_or(0);
            self.splice(&path, index, vec![media])?;
            self.record_removed(&removed);
        } else {
            let anchor = if host_is_media || host_is_code {
                if host_is_media && at.offset == 0 {
                    BlockAnchor::Before(at.block)
                } else {
                    BlockAnchor::After(at.block)
                }
            } else if at.offset == 0 {
                BlockAnchor::Before(at.block)
            } else if at.offset >= host_len {
                BlockAnchor::After(at.block)
            } else {
                self.split_block(at)?;
                BlockAnchor::After(at.block)
            };
            let (path, index) = self.anchor_slot(anchor)?;
            self.splice(&path, index, vec![media])?;
        }
        self.record(Effect::BlocksInserted {
            blocks: vec![media_id],
        });
        self.caret_after(media_id)
    }

    /// List, table or accordion the media has to be placed after.
    fn embed_container(&self, id: BlockId) -> Option<BlockId> {
        let block = self.doc.get(id)?;
        match block.node() {
            BlockNode::Accordion(_) => Some(id),
            BlockNode::TableCell(_) => self.doc.parent_of(id),
            _ => {
                let parent = self.doc.parent_of(id)?;
                matches!(
                    self.doc.get(parent)?.node(),
                    BlockNode::List { .. }
                )
                .then_some(parent)
            }
        }
    }

    /// Start of the block following `id`, creating an empty paragraph when
    /// nothing follows.
    fn caret_after(&mut self, id: BlockId) -> Result<Position, EditError> {
        if let Some(next) = self.doc.next_sibling(id) {
            if let Some(leaf) = self.doc.get(next).and_then(Document::first_leaf_of)
            {
                return Ok(Position::new(leaf, 0));
            }
        }
        let mut p = Block::empty_paragraph();
        self.doc.adopt(&mut p);
        let p_id = p.id();
        let (path, index) = self.anchor_slot(BlockAnchor::After(id))?;
        self.splice(&path, index, vec![p])?;
        self.record(Effect::BlocksInserted { blocks: vec![p_id] });
        Ok(Position::new(p_id, 0))
    }

    pub(super) fn replace_code_content(
        &mut self,
        id: BlockId,
        code: CodeBlock,
    ) -> Result<Position, EditError> {
        let target = self.code_block_mut(id)?;
        let len = code.len();
        *target = code;
        self.record(Effect::CodeReplaced { block: id });
        Ok(Position::new(id, len))
    }

    pub(super) fn normalize_line_breaks(
        &mut self,
        id: BlockId,
    ) -> Result<Position, EditError> {
        let code = self.code_block_mut(id)?;
        code.normalize_line_breaks();
        let len = code.len();
        self.record(Effect::CodeReplaced { block: id });
        Ok(Position::new(id, len))
    }

    pub(super) fn set_accordion_expanded(
        &mut self,
        id: BlockId,
        expanded: bool,
    ) -> Result<Position, EditError> {
        let block = self.doc.get_mut(id).ok_or_else(|| {
            EditError::invalid(format!("block {id} is not attached"))
        })?;
        let BlockNode::Accordion(accordion) = block.node_mut() else {
            return Err(EditError::invalid(format!("{id} is not an accordion")));
        };
        accordion.expanded = expanded;
        self.record(Effect::BlockChanged { block: id });
        Ok(Position::new(id, 0))
    }

    fn code_block_mut(&mut self, id: BlockId) -> Result<&mut CodeBlock, EditError> {
        self.doc
            .get_mut(id)
            .and_then(Block::code_mut)
            .ok_or_else(|| EditError::invalid(format!("{id} is not a code block")))
    }

    /// Removes a block from its sibling list, returning where it was.
    fn detach(&mut self, id: BlockId) -> Result<(Vec<Step>, Block), EditError> {
        let path = self.require_path(id)?;
        let index = path.last().map(|s| s.index).unwrap_or(0);
        let list = self.doc.list_containing_mut(&path).ok_or_else(|| {
            EditError::invalid(format!("block {id} is not attached"))
        })?;
        if index >= list.len() {
            return Err(EditError::invalid(format!("block {id} is not attached")));
        }
        let block = list.remove(index);
        Ok((path, block))
    }

    /// Inserts `blocks` at `index` of the sibling list addressed by `path`.
    fn splice(
        &mut self,
        path: &[Step],
        index: usize,
        blocks: Vec<Block>,
    ) -> Result<(), EditError> {
        let list = self
            .doc
            .list_containing_mut(path)
            .ok_or_else(|| EditError::invalid("insertion point is not attached"))?;
        let index = index.min(list.len());
        list.splice(index..index, blocks);
        Ok(())
    }

    /// The sibling list and index an anchor inserts at.
    fn anchor_slot(
        &self,
        anchor: BlockAnchor,
    ) -> Result<(Vec<Step>, usize), EditError> {
        match anchor {
            BlockAnchor::Before(id) | BlockAnchor::After(id) => {
                let path = self.require_path(id)?;
                let index = path.last().map(|s| s.index).unwrap_or(0);
                let index = match anchor {
                    BlockAnchor::After(_) => index + 1,
                    _ => index,
                };
                Ok((path, index))
            }
            BlockAnchor::End => {
                let index = self.doc.blocks.len();
                Ok((vec![Step { list: 0, index }], index))
            }
        }
    }

    /// List items only go into lists, and lists only take list items.
    fn check_fits(&self, path: &[Step], blocks: &[Block]) -> Result<(), EditError> {
        let parent = path
            .split_last()
            .filter(|(_, parents)| !parents.is_empty())
            .and_then(|(_, parents)| self.doc.block_at_path(parents));
        let into_list = matches!(parent.map(Block::node), Some(BlockNode::List { .. }));
        if matches!(parent.map(Block::node), Some(BlockNode::Table(_))) {
            return Err(EditError::invalid("blocks cannot be inserted into a table"));
        }
        for block in blocks {
            let is_item = matches!(block.node(), BlockNode::ListItem(_));
            if matches!(block.node(), BlockNode::TableCell(_)) || is_item != into_list {
                return Err(EditError::invalid(format!(
                    "{} does not fit here",
                    block.kind_name()
                )));
            }
        }
        Ok(())
    }
}
