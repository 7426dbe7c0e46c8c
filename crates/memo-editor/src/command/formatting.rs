// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use super::{Effect, Transaction};
use crate::dom::block::BlockId;
use crate::dom::inline::{InlineContent, StyleAttr, StyleKey};
use crate::dom::position::{Position, Range};
use crate::error::EditError;

impl Transaction<'_> {
    pub(super) fn wrap_inline(
        &mut self,
        range: Range,
        style: &StyleAttr,
    ) -> Result<Position, EditError> {
        self.restyle(range, |content, from, to| content.wrap(from, to, style))
    }

    pub(super) fn unwrap_inline(
        &mut self,
        range: Range,
        key: StyleKey,
    ) -> Result<Position, EditError> {
        self.restyle(range, |content, from, to| content.unwrap(from, to, key))
    }

    /// Runs `f` over the part of every text-bearing leaf the range covers.
    /// Code blocks and media are skipped.
    fn restyle(
        &mut self,
        range: Range,
        mut f: impl FnMut(&mut InlineContent, usize, usize),
    ) -> Result<Position, EditError> {
        let range = self.doc.range(range.start, range.end)?;
        for (id, from, to) in self.covered_spans(range) {
            if from >= to {
                continue;
            }
            let Some(content) =
                self.doc.get_mut(id).and_then(|b| b.inline_mut())
            else {
                continue;
            };
            f(content, from, to);
            self.record(Effect::Restyled {
                block: id,
                from,
                to,
            });
        }
        Ok(range.end)
    }

    /// `(leaf, from, to)` for every leaf between the ends of `range`.
    pub(crate) fn covered_spans(&self, range: Range) -> Vec<(BlockId, usize, usize)> {
        let leaves = self.doc.leaves();
        let (Some(first), Some(last)) = (
            leaves.iter().position(|l| *l == range.start.block),
            leaves.iter().position(|l| *l == range.end.block),
        ) else {
            return Vec::new();
        };
        leaves[first..=last]
            .iter()
            .map(|id| {
                let len = self.doc.get(*id).map(|b| b.text_len()).unwrap_or(0);
                let from = if *id == range.start.block {
                    range.start.offset
                } else {
                    0
                };
                let to = if *id == range.end.block {
                    range.end.offset
                } else {
                    len
                };
                (*id, from, to)
            })
            .collect()
    }
}
