// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Per-block highlight state and the subsystem gate.
//!
//! Every code block is in exactly one [`CodePhase`]. The subsystem as a
//! whole holds at most one [`Activity`] at a time through the [`Gate`];
//! the editor drives transitions from input, the change feed and timers.

mod highlight;
mod highlighter;
mod reconcile;

use std::collections::HashMap;
use std::time::Duration;

use strum_macros::{AsRefStr, Display};

use crate::dom::block::BlockId;
use crate::dom::document::Document;

pub(crate) use highlight::rebuild;
pub use highlighter::{default_highlighter, Highlighted, Highlighter};
#[cfg(feature = "syntect")]
pub use highlighter::SyntectHighlighter;
pub(crate) use reconcile::{plan_repairs, Repair};

const TARGET: &str = "memo_editor::code_block";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodePhase {
    /// Never highlighted, or highlighting is off for the block.
    Plain,
    /// Programmatically inserted and still settling; refuses user text.
    Inserting,
    Highlighted,
    /// Edited since the last highlight pass.
    Stale { last_edited_at: Duration },
}

impl CodePhase {
    pub fn has_pending_edit(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    pub fn is_highlighted(&self) -> bool {
        *self == Self::Highlighted
    }

    pub fn last_edited_at(&self) -> Option<Duration> {
        match self {
            Self::Stale { last_edited_at } => Some(*last_edited_at),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Activity {
    InsertingCodeBlock,
    Highlighting,
    ProcessingInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Gate {
    #[default]
    Idle,
    Busy { activity: Activity, since: Duration },
}

/// Where a highlighted block lived, so it can be rebuilt if it goes away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CachedBlock {
    pub(crate) text: String,
    pub(crate) language: Option<String>,
    pub(crate) previous: Option<BlockId>,
    pub(crate) parent: Option<BlockId>,
}

#[derive(Clone, Debug, Default)]
pub struct CodeBlockState {
    phases: HashMap<BlockId, CodePhase>,
    gate: Gate,
    cache: HashMap<BlockId, CachedBlock>,
}

impl CodeBlockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase of `block`; blocks the state has not seen yet are `Plain`.
    pub fn phase(&self, block: BlockId) -> CodePhase {
        self.phases.get(&block).copied().unwrap_or(CodePhase::Plain)
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn is_busy_with(&self, activity: Activity) -> bool {
        matches!(self.gate, Gate::Busy { activity: a, .. } if a == activity)
    }

    pub(crate) fn set_phase(&mut self, block: BlockId, phase: CodePhase) {
        let old = self.phases.insert(block, phase);
        if old != Some(phase) {
            tracing::debug!(target: TARGET, %block, ?old, new = ?phase, "phase");
        }
    }

    pub(crate) fn mark_stale(&mut self, block: BlockId, now: Duration) {
        self.set_phase(block, CodePhase::Stale { last_edited_at: now });
    }

    /// Takes the gate for `activity`. Returns false if another activity
    /// holds it.
    pub(crate) fn try_acquire(&mut self, activity: Activity, now: Duration) -> bool {
        match self.gate {
            Gate::Idle => {
                self.gate = Gate::Busy {
                    activity,
                    since: now,
                };
                tracing::trace!(target: TARGET, %activity, "gate acquired");
                true
            }
            Gate::Busy { activity: held, .. } => {
                tracing::debug!(target: TARGET, %activity, %held, "gate busy");
                false
            }
        }
    }

    /// Releases the gate if `activity` holds it.
    pub(crate) fn release(&mut self, activity: Activity) {
        if self.is_busy_with(activity) {
            self.gate = Gate::Idle;
            tracing::trace!(target: TARGET, %activity, "gate released");
        }
    }

    /// Releases a gate held for at least `timeout`. Returns the activity
    /// that was holding it.
    pub(crate) fn release_expired(
        &mut self,
        now: Duration,
        timeout: Duration,
    ) -> Option<Activity> {
        match self.gate {
            Gate::Busy { activity, since } if now >= since + timeout => {
                self.gate = Gate::Idle;
                Some(activity)
            }
            _ => None,
        }
    }

    /// Code blocks that refuse text right now.
    pub(crate) fn locked_blocks(&self) -> Vec<BlockId> {
        self.phases
            .iter()
            .filter(|(_, p)| **p == CodePhase::Inserting)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Stale blocks, oldest edit first.
    pub(crate) fn stale_blocks(&self) -> Vec<BlockId> {
        let mut stale: Vec<(Duration, BlockId)> = self
            .phases
            .iter()
            .filter_map(|(id, p)| p.last_edited_at().map(|at| (at, *id)))
            .collect();
        stale.sort();
        stale.into_iter().map(|(_, id)| id).collect()
    }

    pub(crate) fn cache(&mut self, block: BlockId, cached: CachedBlock) {
        self.cache.insert(block, cached);
    }

    pub(crate) fn take_cached(&mut self, block: BlockId) -> Option<CachedBlock> {
        self.cache.remove(&block)
    }

    /// Drops cached rebuilds whose block is no longer in `doc` and returns
    /// their ids.
    pub(crate) fn forget_detached(&mut self, doc: &Document) -> Vec<BlockId> {
        let gone: Vec<BlockId> = self
            .cache
            .keys()
            .copied()
            .filter(|id| !doc.contains(*id))
            .collect();
        for id in &gone {
            self.cache.remove(id);
        }
        gone
    }

    /// Follows the document after a committed batch: forgets blocks that
    /// are gone and picks up new ones, highlighted or not as their markup
    /// says.
    pub(crate) fn sync(&mut self, doc: &Document) {
        let live = doc.code_block_ids();
        self.phases.retain(|id, _| live.contains(id));
        for id in live {
            if self.phases.contains_key(&id) {
                continue;
            }
            let highlighted = doc
                .get(id)
                .and_then(|b| b.code())
                .is_some_and(|c| c.highlighted);
            let phase = if highlighted {
                CodePhase::Highlighted
            } else {
                CodePhase::Plain
            };
            self.phases.insert(id, phase);
        }
    }

    /// Forgets everything, for a freshly loaded document.
    pub(crate) fn reset(&mut self, doc: &Document) {
        self.phases.clear();
        self.cache.clear();
        self.sync(doc);
    }
}
