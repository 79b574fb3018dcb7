//! Per-cell arenas shared by every frame in the dish.
//!
//! Frames never own neighbour state; they reach it through the [`Manager`] by
//! grid position, which keeps cross-cell mutation explicit and index based.

use cellframe_vm::Program;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::array;
use std::collections::VecDeque;
use tracing::debug;

use crate::channel::ChannelRecord;
use crate::family::{Apoptosis, Family};
use crate::library::FrameOp;
use crate::message::Message;
use crate::sire::{Sire, SireIntake};
use crate::stockpile::{Reserve, Stockpile};
use crate::topology::{GridTopology, NUM_DIRS, opposite};
use crate::triggers::TriggerTags;
use crate::{ConfigError, FrameConfig, Tick};

/// Per-frame switches that sibling frames may flip.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameControls {
    pub inbox_active: bool,
    pub reserve: Reserve,
    repr_paused: Vec<bool>,
}

impl FrameControls {
    /// Controls for `nlev` levels plus the terminal level `nlev`.
    #[must_use]
    pub fn new(nlev: usize) -> Self {
        Self {
            inbox_active: true,
            reserve: Reserve::default(),
            repr_paused: vec![false; nlev + 1],
        }
    }

    #[must_use]
    pub fn is_repr_paused(&self, level: usize) -> bool {
        self.repr_paused.get(level).copied().unwrap_or(false)
    }

    pub fn pause_repr(&mut self, level: usize) {
        if let Some(flag) = self.repr_paused.get_mut(level) {
            *flag = true;
        }
    }

    pub fn resume_repr(&mut self, level: usize) {
        if let Some(flag) = self.repr_paused.get_mut(level) {
            *flag = false;
        }
    }

    pub fn pause_all(&mut self) {
        self.repr_paused.iter_mut().for_each(|flag| *flag = true);
    }

    pub fn clear_pauses(&mut self) {
        self.repr_paused.iter_mut().for_each(|flag| *flag = false);
    }

    pub fn reset(&mut self) {
        self.inbox_active = true;
        self.reserve.clear();
        self.clear_pauses();
    }
}

/// Shared simulation context: topology, trigger tags and every per-cell arena.
#[derive(Debug, Clone)]
pub struct Manager {
    config: FrameConfig,
    topology: GridTopology,
    trigger_tags: TriggerTags,
    stockpiles: Vec<Stockpile>,
    channels: Vec<ChannelRecord>,
    families: Vec<Family>,
    apoptoses: Vec<Apoptosis>,
    intakes: Vec<SireIntake>,
    live: Vec<bool>,
    controls: Vec<[FrameControls; NUM_DIRS]>,
    inboxes: Vec<[VecDeque<Message>; NUM_DIRS]>,
    rng: SmallRng,
}

impl Manager {
    pub fn new(config: FrameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let topology = GridTopology::new(config.grid_width, config.grid_height)?;
        let cells = topology.len();
        let nlev = config.nlev;
        Ok(Self {
            trigger_tags: TriggerTags::new(config.seed, nlev),
            stockpiles: vec![Stockpile::new(nlev); cells],
            channels: vec![ChannelRecord::new(&config.levels); cells],
            families: vec![Family::default(); cells],
            apoptoses: vec![Apoptosis::None; cells],
            intakes: vec![SireIntake::default(); cells],
            live: vec![false; cells],
            controls: (0..cells)
                .map(|_| array::from_fn(|_| FrameControls::new(nlev)))
                .collect(),
            inboxes: (0..cells).map(|_| array::from_fn(|_| VecDeque::new())).collect(),
            rng: SmallRng::seed_from_u64(config.seed),
            topology,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &FrameConfig {
        &self.config
    }

    #[must_use]
    pub const fn topology(&self) -> &GridTopology {
        &self.topology
    }

    #[must_use]
    pub const fn trigger_tags(&self) -> &TriggerTags {
        &self.trigger_tags
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    #[must_use]
    pub fn neighbor(&self, pos: usize, dir: usize) -> usize {
        self.topology.neighbor(pos, dir)
    }

    #[must_use]
    pub fn is_live(&self, pos: usize) -> bool {
        self.live[pos]
    }

    #[must_use]
    pub fn stockpile(&self, pos: usize) -> &Stockpile {
        &self.stockpiles[pos]
    }

    pub fn stockpile_mut(&mut self, pos: usize) -> &mut Stockpile {
        &mut self.stockpiles[pos]
    }

    #[must_use]
    pub fn channel(&self, pos: usize) -> &ChannelRecord {
        &self.channels[pos]
    }

    pub fn channel_mut(&mut self, pos: usize) -> &mut ChannelRecord {
        &mut self.channels[pos]
    }

    #[must_use]
    pub fn family(&self, pos: usize) -> &Family {
        &self.families[pos]
    }

    pub fn family_mut(&mut self, pos: usize) -> &mut Family {
        &mut self.families[pos]
    }

    #[must_use]
    pub fn apoptosis(&self, pos: usize) -> Apoptosis {
        self.apoptoses[pos]
    }

    pub fn mark_apoptosis(&mut self, pos: usize, mark: Apoptosis) {
        debug!(pos, ?mark, "apoptosis marked");
        self.apoptoses[pos] = mark;
    }

    #[must_use]
    pub fn intake(&self, pos: usize) -> &SireIntake {
        &self.intakes[pos]
    }

    pub fn intake_mut(&mut self, pos: usize) -> &mut SireIntake {
        &mut self.intakes[pos]
    }

    #[must_use]
    pub fn controls(&self, pos: usize, facing: usize) -> &FrameControls {
        &self.controls[pos][facing % NUM_DIRS]
    }

    pub fn controls_mut(&mut self, pos: usize, facing: usize) -> &mut FrameControls {
        &mut self.controls[pos][facing % NUM_DIRS]
    }

    #[must_use]
    pub fn inbox(&self, pos: usize, facing: usize) -> &VecDeque<Message> {
        &self.inboxes[pos][facing % NUM_DIRS]
    }

    pub fn inbox_mut(&mut self, pos: usize, facing: usize) -> &mut VecDeque<Message> {
        &mut self.inboxes[pos][facing % NUM_DIRS]
    }

    pub fn deliver(&mut self, pos: usize, facing: usize, message: Message) {
        self.inbox_mut(pos, facing).push_back(message);
    }

    /// Install a founder lineage at `pos`.
    pub fn found(&mut self, pos: usize, tick: Tick) {
        self.channels[pos] = ChannelRecord::founder(&self.config.levels, &mut self.rng);
        self.families[pos].settle(None, tick, None);
        self.occupy(pos);
    }

    /// Settle the first queued sire at `pos`, returning the program to load.
    ///
    /// Endowments of the other queued sires go back to their parents.
    pub fn settle_sire(&mut self, pos: usize, tick: Tick) -> Option<Program<FrameOp>> {
        let sire = self.intakes[pos].pop()?;
        self.refund_intake(pos);

        let record = &sire.record;
        self.channels[pos] = ChannelRecord::from_sire(&self.config.levels, record, &mut self.rng);
        self.families[pos].settle(Some(record.source_pos), tick, record.prev_chan);
        self.families[record.source_pos].add_child_pos(pos);
        self.stockpiles[pos].external_contribute(sire.endowment, opposite(record.dir));
        self.occupy(pos);
        debug!(
            pos,
            parent = record.source_pos,
            level = record.level,
            generation = record.generation(),
            "sire settled"
        );
        Some(sire.program)
    }

    /// Empty the intake at `pos`, crediting each endowment back to its parent.
    ///
    /// Returns how many sires were turned away.
    pub fn refund_intake(&mut self, pos: usize) -> usize {
        let turned_away: Vec<Sire> = self.intakes[pos].drain().collect();
        for sire in &turned_away {
            let parent = sire.record.source_pos;
            self.stockpiles[parent].external_contribute(sire.endowment, sire.record.dir);
        }
        if !turned_away.is_empty() {
            debug!(pos, count = turned_away.len(), "sires refunded");
        }
        turned_away.len()
    }

    fn occupy(&mut self, pos: usize) {
        self.live[pos] = true;
        self.apoptoses[pos] = Apoptosis::None;
        for controls in &mut self.controls[pos] {
            controls.reset();
        }
        for inbox in &mut self.inboxes[pos] {
            inbox.clear();
        }
    }

    /// Carry out a pending apoptosis mark, returning it.
    ///
    /// Partial death keeps the channel so neighbours still sense the tile as occupied.
    pub fn apply_apoptosis(&mut self, pos: usize) -> Apoptosis {
        let mark = self.apoptoses[pos];
        match mark {
            Apoptosis::None => {}
            Apoptosis::Partial => self.kill(pos, false),
            Apoptosis::Complete => self.kill(pos, true),
        }
        mark
    }

    /// Remove the occupant at `pos`; its resource stays in the tile's stockpile.
    pub fn vacate(&mut self, pos: usize) {
        self.kill(pos, true);
    }

    fn kill(&mut self, pos: usize, forget_channel: bool) {
        self.live[pos] = false;
        self.apoptoses[pos] = Apoptosis::None;
        if forget_channel {
            self.channels[pos].clear();
            self.families[pos].reset();
        }
        for controls in &mut self.controls[pos] {
            controls.reset();
        }
        for inbox in &mut self.inboxes[pos] {
            inbox.clear();
        }
    }

    /// Sum of every stockpile balance.
    #[must_use]
    pub fn total_resource(&self) -> f64 {
        self.stockpiles.iter().map(Stockpile::query_resource).sum()
    }

    /// Resource debited by reproduction and still waiting in intakes.
    #[must_use]
    pub fn pending_endowment(&self) -> f64 {
        self.intakes.iter().map(SireIntake::pending_endowment).sum()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }
}
