// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::VecDeque;

use crate::command::{Effect, Origin};
use crate::dom::block::BlockId;
use crate::dom::position::Position;

/// A change the platform made to the editable surface on its own, such as
/// the browser splitting a `<pre>` on Enter. Hosts report these after the
/// fact so the model can follow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformMutation {
    SplitBlock { at: Position },
    InsertLineBreak { at: Position },
    /// Markup the platform inserted after a block.
    InsertBlocks { after: BlockId, html: String },
    RemoveBlock { block: BlockId },
    InsertText { at: Position, text: String },
}

/// One committed batch as the change feed sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    pub batch: u64,
    pub origin: Origin,
    pub effects: Vec<Effect>,
}

impl ChangeRecord {
    /// Every block any effect of the batch touched, without duplicates.
    pub fn touched_blocks(&self) -> Vec<BlockId> {
        let mut out: Vec<BlockId> = Vec::new();
        for id in self.effects.iter().flat_map(Effect::blocks) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

/// Queue of committed batches waiting for reconciliation.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChangeFeed {
    queue: VecDeque<ChangeRecord>,
    next_batch: u64,
}

impl ChangeFeed {
    pub(crate) fn push(&mut self, origin: Origin, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        self.next_batch += 1;
        self.queue.push_back(ChangeRecord {
            batch: self.next_batch,
            origin,
            effects,
        });
    }

    /// Takes every queued record, oldest first.
    pub(crate) fn drain(&mut self) -> Vec<ChangeRecord> {
        self.queue.drain(..).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}
