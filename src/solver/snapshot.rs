use std::collections::{HashMap, VecDeque};

use super::comm::HighLevelNode;
use super::lacam::{Phase, Status};
use crate::common::{Config, Solution};
use crate::stat::Stats;

/// Deep copy of everything the driver mutates. Node and constraint ids are
/// arena indices, so restoring is a plain field copy with no reference
/// relinking. Distance memos are excluded: they are pure caches and cannot
/// change post-restore evolution.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) nodes: Vec<HighLevelNode>,
    pub(crate) open: Vec<usize>,
    pub(crate) explored: HashMap<String, usize>,
    pub(crate) phase: Phase,
    pub(crate) status: Status,
    pub(crate) current: Option<usize>,
    pub(crate) constraint: Option<usize>,
    pub(crate) generated: Option<Config>,
    pub(crate) solution: Option<Solution>,
    pub(crate) stats: Stats,
    pub(crate) next_constraint_id: usize,
}

/// Keeps memory finite during long interactive sessions.
pub(crate) const HISTORY_LIMIT: usize = 200;

/// Bounded FIFO of snapshots, newest last.
#[derive(Debug, Default)]
pub(crate) struct History {
    entries: VecDeque<Snapshot>,
}

impl History {
    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        if self.entries.len() == HISTORY_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    pub(crate) fn pop(&mut self) -> Option<Snapshot> {
        self.entries.pop_back()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
