use cellframe_vm::Program;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::channel::ChannelId;
use crate::library::FrameOp;

/// Lineage snapshot assembled by a reproducing cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SireRecord {
    pub source_pos: usize,
    /// Absolute direction from the parent to the offspring tile.
    pub dir: usize,
    /// Level reproduction actually happened at, after any fall-through.
    pub level: usize,
    pub generations: Vec<u64>,
    pub ids: Vec<ChannelId>,
    pub ages: Vec<u64>,
    pub prev_chan: Option<ChannelId>,
}

impl SireRecord {
    /// Parent's generation counter at the reproduction level.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generations.get(self.level).copied().unwrap_or(0)
    }
}

/// Reproduction hand-off: record, program copy and the debited endowment.
#[derive(Debug, Clone, PartialEq)]
pub struct Sire {
    pub record: SireRecord,
    pub program: Program<FrameOp>,
    pub endowment: f64,
}

/// FIFO of sires waiting to be settled into one tile.
#[derive(Debug, Clone, Default)]
pub struct SireIntake {
    queue: VecDeque<Sire>,
}

impl SireIntake {
    pub fn push(&mut self, sire: Sire) {
        self.queue.push_back(sire);
    }

    pub fn pop(&mut self) -> Option<Sire> {
        self.queue.pop_front()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&Sire> {
        self.queue.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Resource held by queued sires and not yet credited anywhere.
    #[must_use]
    pub fn pending_endowment(&self) -> f64 {
        self.queue.iter().map(|sire| sire.endowment).sum()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Sire> + '_ {
        self.queue.drain(..)
    }
}
