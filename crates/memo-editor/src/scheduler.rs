// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Keyed delayed tasks driven by host time.
//!
//! Scheduling a task replaces any pending task with the same key, so every
//! debounce is "last writer wins". Nothing runs on its own: the editor pops
//! due tasks when the host calls `tick(now)`.

use std::time::Duration;

use strum_macros::EnumDiscriminants;

use crate::autoformat::BlockRule;
use crate::dom::block::BlockId;

#[derive(Clone, Debug, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(TaskKind), derive(Hash))]
pub enum Task {
    /// A block rule matched on a trigger key; runs on the next tick.
    Autoformat { block: BlockId, rule: BlockRule },
    InlineScan,
    AutoLink,
    /// Idle debounce of a code block that was typed into.
    Highlight(BlockId),
    ExitCheck,
    RehighlightAll,
    /// Next-frame check that a rebuilt code block is still attached.
    PostRebuildCheck(BlockId),
    /// End of the settle time of a programmatically inserted code block.
    FinishCodeInsert(BlockId),
    GateFallback,
}

impl Task {
    /// Tasks with equal keys replace each other.
    pub fn key(&self) -> (TaskKind, Option<BlockId>) {
        let block = match self {
            Self::Autoformat { block, .. }
            | Self::Highlight(block)
            | Self::PostRebuildCheck(block)
            | Self::FinishCodeInsert(block) => Some(*block),
            _ => None,
        };
        (TaskKind::from(self), block)
    }
}

#[derive(Clone, Debug)]
struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    pending: Vec<Pending>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `task` to run `delay` after `now`, replacing a pending task
    /// with the same key.
    pub fn schedule(&mut self, now: Duration, delay: Duration, task: Task) {
        let key = task.key();
        self.pending.retain(|p| p.task.key() != key);
        self.seq += 1;
        tracing::trace!(
            target: "memo_editor::scheduler",
            ?task,
            delay_ms = delay.as_millis() as u64,
            "schedule"
        );
        self.pending.push(Pending {
            due: now + delay,
            seq: self.seq,
            task,
        });
    }

    pub fn cancel(&mut self, key: (TaskKind, Option<BlockId>)) {
        self.pending.retain(|p| p.task.key() != key);
    }

    /// Drops every pending task of `kind`, whatever block it is for.
    pub fn cancel_kind(&mut self, kind: TaskKind) {
        self.pending.retain(|p| TaskKind::from(&p.task) != kind);
    }

    pub fn is_scheduled(&self, key: (TaskKind, Option<BlockId>)) -> bool {
        self.pending.iter().any(|p| p.task.key() == key)
    }

    /// Removes and returns the earliest task due at `now`, ties broken by
    /// scheduling order.
    pub fn pop_due(&mut self, now: Duration) -> Option<Task> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(i, _)| i)?;
        Some(self.pending.remove(index).task)
    }

    /// When the host should call `tick` next.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn rescheduling_a_key_replaces_the_pending_task() {
        let mut scheduler = Scheduler::new();
        let block = BlockId(3);
        scheduler.schedule(ms(0), ms(1200), Task::Highlight(block));
        scheduler.schedule(ms(500), ms(1200), Task::Highlight(block));
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pop_due(ms(1200)), None);
        assert_eq!(scheduler.pop_due(ms(1700)), Some(Task::Highlight(block)));
    }

    #[test]
    fn different_blocks_have_different_keys() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ms(0), ms(10), Task::Highlight(BlockId(1)));
        scheduler.schedule(ms(0), ms(10), Task::Highlight(BlockId(2)));
        assert_eq!(scheduler.len(), 2);
        scheduler.cancel_kind(TaskKind::Highlight);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn due_tasks_pop_in_due_then_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ms(0), ms(100), Task::ExitCheck);
        scheduler.schedule(ms(0), ms(0), Task::InlineScan);
        scheduler.schedule(ms(0), ms(0), Task::AutoLink);
        assert_eq!(scheduler.next_due(), Some(ms(0)));
        assert_eq!(scheduler.pop_due(ms(100)), Some(Task::InlineScan));
        assert_eq!(scheduler.pop_due(ms(100)), Some(Task::AutoLink));
        assert_eq!(scheduler.pop_due(ms(100)), Some(Task::ExitCheck));
        assert_eq!(scheduler.pop_due(ms(100)), None);
    }
}
