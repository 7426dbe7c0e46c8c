// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::cmp::Ordering;

use crate::dom::block::{Block, BlockId, BlockNode};
use crate::dom::position::{Position, Range};
use crate::error::EditError;

/// One step of a path from the document root to a block: which child list
/// of the parent (tables have one per row) and the index inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) list: usize,
    pub(crate) index: usize,
}

/// The in-memory block tree. Only the command layer mutates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub(crate) blocks: Vec<Block>,
    next_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding one empty paragraph.
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    /// Takes ownership of `blocks`, giving every block a fresh id and
    /// restoring the structural invariants.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut doc = Self {
            blocks,
            next_id: 1,
        };
        let mut next_id = doc.next_id;
        for block in &mut doc.blocks {
            assign_ids(block, &mut next_id);
        }
        doc.next_id = next_id;
        doc.ensure_structure();
        doc
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Gives `block` and everything inside it fresh ids.
    pub(crate) fn adopt(&mut self, block: &mut Block) {
        assign_ids(block, &mut self.next_id);
    }

    /// A fresh id for a wrapper block whose children keep theirs.
    pub(crate) fn next_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn path_of(&self, id: BlockId) -> Option<Vec<Step>> {
        let mut path = Vec::new();
        if find_path(&self.blocks, id, 0, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.path_of(id).is_some()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.block_at_path(&self.path_of(id)?)
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        let path = self.path_of(id)?;
        self.block_at_path_mut(&path)
    }

    pub(crate) fn block_at_path(&self, path: &[Step]) -> Option<&Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get(first.index)?;
        for step in rest {
            block = block
                .child_lists()
                .into_iter()
                .nth(step.list)?
                .get(step.index)?;
        }
        Some(block)
    }

    pub(crate) fn block_at_path_mut(
        &mut self,
        path: &[Step],
    ) -> Option<&mut Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get_mut(first.index)?;
        for step in rest {
            block = block
                .child_lists_mut()
                .into_iter()
                .nth(step.list)?
                .get_mut(step.index)?;
        }
        Some(block)
    }

    /// The sibling list holding the block at `path`.
    pub(crate) fn list_containing_mut(
        &mut self,
        path: &[Step],
    ) -> Option<&mut Vec<Block>> {
        let (last, parents) = path.split_last()?;
        if parents.is_empty() {
            return Some(&mut self.blocks);
        }
        self.block_at_path_mut(parents)?
            .child_lists_mut()
            .into_iter()
            .nth(last.list)
    }

    pub(crate) fn list_containing(&self, path: &[Step]) -> Option<&Vec<Block>> {
        let (last, parents) = path.split_last()?;
        if parents.is_empty() {
            return Some(&self.blocks);
        }
        self.block_at_path(parents)?
            .child_lists()
            .into_iter()
            .nth(last.list)
    }

    pub fn parent_of(&self, id: BlockId) -> Option<BlockId> {
        let path = self.path_of(id)?;
        let parent_path = &path[..path.len().saturating_sub(1)];
        if parent_path.is_empty() {
            None
        } else {
            self.block_at_path(parent_path).map(Block::id)
        }
    }

    /// Ids of every enclosing block, innermost first.
    pub fn ancestors(&self, id: BlockId) -> Vec<BlockId> {
        let Some(path) = self.path_of(id) else {
            return Vec::new();
        };
        (1..path.len())
            .rev()
            .filter_map(|len| self.block_at_path(&path[..len]).map(Block::id))
            .collect()
    }

    pub fn previous_sibling(&self, id: BlockId) -> Option<BlockId> {
        let path = self.path_of(id)?;
        let index = path.last()?.index;
        let list = self.list_containing(&path)?;
        index.checked_sub(1).and_then(|i| list.get(i)).map(Block::id)
    }

    pub fn next_sibling(&self, id: BlockId) -> Option<BlockId> {
        let path = self.path_of(id)?;
        let index = path.last()?.index;
        self.list_containing(&path)?.get(index + 1).map(Block::id)
    }

    /// Every block a position can point into, in document order.
    pub fn leaves(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        collect_leaves(&self.blocks, &mut out);
        out
    }

    pub fn leaf_index(&self, id: BlockId) -> Option<usize> {
        self.leaves().iter().position(|leaf| *leaf == id)
    }

    pub fn first_leaf_of(block: &Block) -> Option<BlockId> {
        let mut out = Vec::new();
        collect_leaves(std::slice::from_ref(block), &mut out);
        out.first().copied()
    }

    pub fn last_leaf_of(block: &Block) -> Option<BlockId> {
        let mut out = Vec::new();
        collect_leaves(std::slice::from_ref(block), &mut out);
        out.last().copied()
    }

    pub fn code_block_ids(&self) -> Vec<BlockId> {
        self.leaves()
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(Block::is_code_block))
            .collect()
    }

    pub fn is_code_block(&self, id: BlockId) -> bool {
        self.get(id).is_some_and(Block::is_code_block)
    }

    pub fn is_in_table(&self, id: BlockId) -> bool {
        self.get(id)
            .is_some_and(|b| matches!(b.node(), BlockNode::TableCell(_)))
    }

    /// Plain text of all leaves, one per line.
    pub fn text(&self) -> String {
        self.leaves()
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// No visible text and no embedded object or table.
    pub fn is_empty(&self) -> bool {
        fn has_object(blocks: &[Block]) -> bool {
            blocks.iter().any(|b| {
                matches!(b.node(), BlockNode::Media(_) | BlockNode::Table(_))
                    || b.child_lists().into_iter().any(|l| has_object(l))
            })
        }
        !has_object(&self.blocks)
            && self.leaves().into_iter().all(|id| {
                self.get(id).is_none_or(|b| b.text().trim().is_empty())
            })
    }

    /// Caret at the start of the first leaf.
    pub fn start(&self) -> Position {
        Position::new(
            self.leaves().first().copied().unwrap_or(BlockId::UNASSIGNED),
            0,
        )
    }

    /// Checks the position points into a live leaf within its length.
    pub fn resolve(&self, pos: Position) -> Result<Position, EditError> {
        let block = self.get(pos.block).ok_or_else(|| {
            EditError::invalid(format!("block {} is not attached", pos.block))
        })?;
        if !block.is_leaf() {
            return Err(EditError::invalid(format!(
                "{} {} cannot hold a caret",
                block.kind_name(),
                pos.block
            )));
        }
        if pos.offset > block.text_len() {
            return Err(EditError::invalid(format!(
                "offset {} is past the end of {}",
                pos.offset, pos.block
            )));
        }
        Ok(pos)
    }

    /// Like `resolve`, but clamps an overlong offset instead of failing.
    pub fn clamp(&self, pos: Position) -> Option<Position> {
        let block = self.get(pos.block).filter(|b| b.is_leaf())?;
        Some(Position::new(pos.block, pos.offset.min(block.text_len())))
    }

    pub fn compare(&self, a: Position, b: Position) -> Option<Ordering> {
        let leaves = self.leaves();
        let ia = leaves.iter().position(|id| *id == a.block)?;
        let ib = leaves.iter().position(|id| *id == b.block)?;
        Some(ia.cmp(&ib).then(a.offset.cmp(&b.offset)))
    }

    /// Orders two resolved positions into a range.
    pub fn range(&self, a: Position, b: Position) -> Result<Range, EditError> {
        let a = self.resolve(a)?;
        let b = self.resolve(b)?;
        match self.compare(a, b) {
            Some(Ordering::Greater) => Ok(Range { start: b, end: a }),
            Some(_) => Ok(Range { start: a, end: b }),
            None => Err(EditError::invalid("positions are not comparable")),
        }
    }

    /// `(leaf ordinal, offset)`, stable across a serialize/parse cycle.
    pub(crate) fn ordinal_of(&self, pos: Position) -> Option<(usize, usize)> {
        Some((self.leaf_index(pos.block)?, pos.offset))
    }

    pub(crate) fn position_at_ordinal(
        &self,
        (ordinal, offset): (usize, usize),
    ) -> Option<Position> {
        let id = *self.leaves().get(ordinal)?;
        self.resolve(Position::new(id, offset)).ok()
    }

    pub fn normalize(&mut self) {
        fn walk(blocks: &mut [Block]) {
            for block in blocks {
                if let Some(inline) = block.inline_mut() {
                    inline.normalize();
                }
                for list in block.child_lists_mut() {
                    walk(list);
                }
            }
        }
        walk(&mut self.blocks);
    }

    /// Restores the structural invariants after a mutation: no empty lists,
    /// quotes or tables, accordions always have a body, and the document
    /// always has at least one block.
    pub(crate) fn ensure_structure(&mut self) {
        fix_children(&mut self.blocks, &mut self.next_id);
        if self.blocks.is_empty() {
            let mut p = Block::empty_paragraph();
            assign_ids(&mut p, &mut self.next_id);
            self.blocks.push(p);
        }
    }

    /// Panics if the structural invariants do not hold.
    #[cfg(any(test, feature = "assert-invariants"))]
    pub(crate) fn explicitly_assert_invariants(&self) {
        fn walk(blocks: &[Block], seen: &mut Vec<BlockId>) {
            for block in blocks {
                assert!(
                    !seen.contains(&block.id),
                    "duplicate block id {}",
                    block.id
                );
                seen.push(block.id);
                match block.node() {
                    BlockNode::List { items, .. } => {
                        assert!(!items.is_empty(), "empty list {}", block.id);
                        assert!(
                            items
                                .iter()
                                .all(|i| matches!(i.node(), BlockNode::ListItem(_))),
                            "list {} holds a non-item",
                            block.id
                        );
                    }
                    BlockNode::Accordion(accordion) => {
                        assert!(
                            !accordion.body.is_empty(),
                            "accordion {} has no body",
                            block.id
                        );
                    }
                    _ => {}
                }
                for list in block.child_lists() {
                    walk(list, seen);
                }
            }
        }
        assert!(!self.blocks.is_empty(), "document has no blocks");
        walk(&self.blocks, &mut Vec::new());
    }
}

fn assign_ids(block: &mut Block, next_id: &mut u64) {
    block.id = BlockId(*next_id);
    *next_id += 1;
    for list in block.child_lists_mut() {
        for child in list.iter_mut() {
            assign_ids(child, next_id);
        }
    }
}

fn find_path(
    list: &[Block],
    id: BlockId,
    list_index: usize,
    path: &mut Vec<Step>,
) -> bool {
    for (index, block) in list.iter().enumerate() {
        path.push(Step {
            list: list_index,
            index,
        });
        if block.id == id {
            return true;
        }
        for (child_list, children) in block.child_lists().into_iter().enumerate()
        {
            if find_path(children, id, child_list, path) {
                return true;
            }
        }
        path.pop();
    }
    false
}

fn collect_leaves(blocks: &[Block], out: &mut Vec<BlockId>) {
    for block in blocks {
        if block.is_leaf() {
            out.push(block.id);
        }
        for list in block.child_lists() {
            collect_leaves(list, out);
        }
    }
}

fn fix_children(blocks: &mut Vec<Block>, next_id: &mut u64) {
    for block in blocks.iter_mut() {
        if let BlockNode::Accordion(accordion) = block.node_mut() {
            if accordion.body.is_empty() {
                let mut p = Block::empty_paragraph();
                assign_ids(&mut p, next_id);
                accordion.body.push(p);
            }
        }
        if let BlockNode::Table(table) = block.node_mut() {
            table.rows.retain(|row| !row.cells.is_empty());
        }
        for list in block.child_lists_mut() {
            fix_children(list, next_id);
        }
    }
    blocks.retain(|block| match block.node() {
        BlockNode::List { items, .. } => !items.is_empty(),
        BlockNode::Quote(children) => !children.is_empty(),
        BlockNode::Table(table) => !table.rows.is_empty(),
        _ => true,
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dom::block::ListType;

    fn sample() -> Document {
        Document::from_blocks(vec![
            Block::heading(1, "Title"),
            Block::list(ListType::Unordered, &["one", "two"]),
            Block::accordion("acc", vec![Block::paragraph("inside")], false),
            Block::code_block(None, "let x;"),
        ])
    }

    #[test]
    fn ids_are_unique_and_nested_blocks_are_found() {
        let doc = sample();
        let leaves = doc.leaves();
        assert_eq!(leaves.len(), 6);
        let mut sorted = leaves.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), leaves.len());
        let texts: Vec<String> = leaves
            .iter()
            .map(|id| doc.get(*id).map(Block::text).unwrap_or_default())
            .collect();
        assert_eq!(texts, ["Title", "one", "two", "acc", "inside", "let x;"]);
    }

    #[test]
    fn parents_and_siblings() {
        let doc = sample();
        let leaves = doc.leaves();
        let list = doc.blocks()[1].id();
        assert_eq!(doc.parent_of(leaves[1]), Some(list));
        assert_eq!(doc.parent_of(leaves[0]), None);
        assert_eq!(doc.next_sibling(leaves[1]), Some(leaves[2]));
        assert_eq!(doc.previous_sibling(leaves[1]), None);
        assert_eq!(doc.ancestors(leaves[4]), vec![leaves[3]]);
    }

    #[test]
    fn empty_containers_are_removed() {
        let doc = Document::from_blocks(vec![Block::list(
            ListType::Ordered,
            &[],
        )]);
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.blocks()[0].kind_name(), "p");
        assert!(doc.is_empty());
    }

    #[test]
    fn resolve_rejects_stale_and_overlong_positions() {
        let doc = sample();
        let title = doc.leaves()[0];
        assert!(doc.resolve(Position::new(title, 5)).is_ok());
        assert!(matches!(
            doc.resolve(Position::new(title, 6)),
            Err(EditError::InvalidRange(_))
        ));
        assert!(doc.resolve(Position::new(BlockId(999), 0)).is_err());
        assert_eq!(
            doc.clamp(Position::new(title, 60)),
            Some(Position::new(title, 5))
        );
    }

    #[test]
    fn ranges_are_ordered() {
        let doc = sample();
        let leaves = doc.leaves();
        let range = doc
            .range(Position::new(leaves[2], 1), Position::new(leaves[0], 3))
            .unwrap();
        assert_eq!(range.start, Position::new(leaves[0], 3));
        assert_eq!(range.end, Position::new(leaves[2], 1));
    }

    #[test]
    fn ordinals_survive_a_rebuild() {
        let doc = sample();
        let pos = Position::new(doc.leaves()[4], 2);
        let ordinal = doc.ordinal_of(pos).unwrap();
        let rebuilt = Document::from_blocks(doc.blocks().to_vec());
        let restored = rebuilt.position_at_ordinal(ordinal).unwrap();
        assert_eq!(rebuilt.get(restored.block).unwrap().text(), "inside");
        assert_eq!(restored.offset, 2);
    }
}
