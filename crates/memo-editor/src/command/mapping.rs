// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::Effect;
use crate::dom::position::Position;

/// Carries a position recorded before a batch through the batch's effects.
///
/// Returns `None` when the block the position pointed into was removed.
/// Positions in a code block whose content was replaced keep their offset
/// and are clamped by the caller.
pub fn map_position(effects: &[Effect], pos: Position) -> Option<Position> {
    let mut pos = pos;
    for effect in effects {
        match *effect {
            Effect::TextInserted { block, offset, len } => {
                if pos.block == block && pos.offset >= offset {
                    pos.offset += len;
                }
            }
            Effect::TextDeleted { block, from, to } => {
                if pos.block == block && pos.offset > from {
                    pos.offset = from + pos.offset.saturating_sub(to);
                }
            }
            Effect::BlockSplit {
                block,
                offset,
                new_block,
            } => {
                if pos.block == block && pos.offset > offset {
                    pos = Position::new(new_block, pos.offset - offset);
                }
            }
            Effect::BlocksMerged { into, from, offset } => {
                if pos.block == from {
                    pos = Position::new(into, offset + pos.offset);
                }
            }
            Effect::BlockRemoved { block } => {
                if pos.block == block {
                    return None;
                }
            }
            Effect::Restyled { .. }
            | Effect::BlocksInserted { .. }
            | Effect::BlockChanged { .. }
            | Effect::CodeReplaced { .. } => {}
        }
    }
    Some(pos)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dom::block::BlockId;

    const A: BlockId = BlockId(1);
    const B: BlockId = BlockId(2);

    #[test]
    fn insertions_before_shift_and_after_do_not() {
        let effects = [Effect::TextInserted {
            block: A,
            offset: 2,
            len: 3,
        }];
        assert_eq!(
            map_position(&effects, Position::new(A, 2)),
            Some(Position::new(A, 5))
        );
        assert_eq!(
            map_position(&effects, Position::new(A, 1)),
            Some(Position::new(A, 1))
        );
        assert_eq!(
            map_position(&effects, Position::new(B, 4)),
            Some(Position::new(B, 4))
        );
    }

    #[test]
    fn deleted_positions_collapse_to_the_start() {
        let effects = [Effect::TextDeleted {
            block: A,
            from: 2,
            to: 6,
        }];
        assert_eq!(
            map_position(&effects, Position::new(A, 4)),
            Some(Position::new(A, 2))
        );
        assert_eq!(
            map_position(&effects, Position::new(A, 8)),
            Some(Position::new(A, 4))
        );
    }

    #[test]
    fn split_then_merge() {
        let effects = [
            Effect::BlockSplit {
                block: A,
                offset: 3,
                new_block: B,
            },
            Effect::BlocksMerged {
                into: A,
                from: B,
                offset: 3,
            },
        ];
        assert_eq!(
            map_position(&effects, Position::new(A, 5)),
            Some(Position::new(A, 5))
        );
    }

    #[test]
    fn removed_blocks_lose_their_positions() {
        let effects = [Effect::BlockRemoved { block: A }];
        assert_eq!(map_position(&effects, Position::new(A, 0)), None);
    }
}
