// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::block::BlockId;

/// A point inside a leaf block, counted in characters from its start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub block: BlockId,
    pub offset: usize,
}

impl Position {
    pub fn new(block: BlockId, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// An ordered pair of positions, `start` first in document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn caret(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// A range inside a single block; offsets are swapped if needed.
    pub fn within(block: BlockId, from: usize, to: usize) -> Self {
        Self {
            start: Position::new(block, from.min(to)),
            end: Position::new(block, from.max(to)),
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn is_single_block(&self) -> bool {
        self.start.block == self.end.block
    }
}

/// Anchor and focus as the user made them; the focus may come first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(pos: Position) -> Self {
        Self::new(pos, pos)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}
