use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::Tick;
use crate::channel::ChannelId;

/// Parent/child bookkeeping for the current occupant of a cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Family {
    parent_pos: Option<usize>,
    child_pos: BTreeSet<usize>,
    birth_tick: Tick,
    prev_chan: Option<ChannelId>,
}

impl Family {
    /// Start a new occupancy born at `birth_tick`.
    pub fn settle(&mut self, parent_pos: Option<usize>, birth_tick: Tick, prev_chan: Option<ChannelId>) {
        self.parent_pos = parent_pos;
        self.child_pos.clear();
        self.birth_tick = birth_tick;
        self.prev_chan = prev_chan;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub const fn parent_pos(&self) -> Option<usize> {
        self.parent_pos
    }

    #[must_use]
    pub fn is_parent_pos(&self, pos: usize) -> bool {
        self.parent_pos == Some(pos)
    }

    pub fn add_child_pos(&mut self, pos: usize) {
        self.child_pos.insert(pos);
    }

    #[must_use]
    pub fn has_child_pos(&self, pos: usize) -> bool {
        self.child_pos.contains(&pos)
    }

    pub fn child_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.child_pos.iter().copied()
    }

    #[must_use]
    pub const fn birth_tick(&self) -> Tick {
        self.birth_tick
    }

    /// Ticks since birth; zero on the birth tick itself.
    #[must_use]
    pub const fn cell_age(&self, now: Tick) -> u64 {
        now.0.saturating_sub(self.birth_tick.0)
    }

    /// Top-level channel of the propagule this occupant descends from.
    #[must_use]
    pub const fn prev_chan(&self) -> Option<ChannelId> {
        self.prev_chan
    }
}

/// Programmed cell death mark, consumed by the lifecycle collaborator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Apoptosis {
    #[default]
    None,
    /// Occupant dies but its channel stays visible to neighbours.
    Partial,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_replaces_previous_occupancy() {
        let mut family = Family::default();
        family.settle(Some(3), Tick(10), Some(77));
        family.add_child_pos(4);
        assert!(family.is_parent_pos(3));
        assert!(family.has_child_pos(4));
        assert_eq!(family.cell_age(Tick(10)), 0);
        assert_eq!(family.cell_age(Tick(15)), 5);

        family.settle(None, Tick(20), None);
        assert!(!family.has_child_pos(4));
        assert_eq!(family.parent_pos(), None);
        assert_eq!(family.prev_chan(), None);
        assert_eq!(family.cell_age(Tick(5)), 0);
    }
}
