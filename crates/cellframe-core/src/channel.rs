//! Hierarchical lineage identifiers with generation and age counters.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::LevelConfig;
use crate::sire::SireRecord;

/// Lineage identifier at one organizational level.
pub type ChannelId = u64;

/// Largest age increment accepted by one [`ChannelRecord::incr_cell_age`] call.
pub const MAX_AGE_INCREMENT: f64 = 1_000_000.0;

/// Channel state of one cell across all levels.
///
/// `ids` is `None` for an empty tile. Identifiers are assigned when the
/// occupant is founded or settled and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelRecord {
    ids: Option<Vec<ChannelId>>,
    generations: Vec<u64>,
    ages: Vec<u64>,
    expirations: Vec<u64>,
}

impl ChannelRecord {
    /// Record of an empty tile.
    #[must_use]
    pub fn new(levels: &[LevelConfig]) -> Self {
        Self {
            ids: None,
            generations: vec![0; levels.len()],
            ages: vec![0; levels.len()],
            expirations: levels.iter().map(|level| level.expiration).collect(),
        }
    }

    /// Fresh lineage with no ancestry at any level.
    #[must_use]
    pub fn founder(levels: &[LevelConfig], rng: &mut dyn RngCore) -> Self {
        let mut record = Self::new(levels);
        record.ids = Some(levels.iter().map(|_| rng.next_u64()).collect());
        record
    }

    /// Channel of an offspring founded from `sire`.
    ///
    /// Levels below the reproduction level start fresh (new id, generation 0, age 0);
    /// levels at or above it inherit the parent's id and age with the generation bumped.
    #[must_use]
    pub fn from_sire(levels: &[LevelConfig], sire: &SireRecord, rng: &mut dyn RngCore) -> Self {
        let mut record = Self::new(levels);
        let mut ids = Vec::with_capacity(levels.len());
        for lev in 0..levels.len() {
            match sire.ids.get(lev) {
                Some(id) if lev >= sire.level => {
                    ids.push(*id);
                    record.generations[lev] =
                        sire.generations.get(lev).copied().unwrap_or(0).saturating_add(1);
                    record.ages[lev] = sire.ages.get(lev).copied().unwrap_or(0);
                }
                _ => ids.push(rng.next_u64()),
            }
        }
        record.ids = Some(ids);
        record
    }

    #[must_use]
    pub fn nlev(&self) -> usize {
        self.generations.len()
    }

    #[must_use]
    pub fn id(&self, level: usize) -> Option<ChannelId> {
        self.ids.as_ref().and_then(|ids| ids.get(level).copied())
    }

    /// Full identifier set; `None` for an empty tile.
    #[must_use]
    pub fn ids(&self) -> Option<&[ChannelId]> {
        self.ids.as_deref()
    }

    #[must_use]
    pub fn generation(&self, level: usize) -> u64 {
        self.generations.get(level).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn generations(&self) -> &[u64] {
        &self.generations
    }

    #[must_use]
    pub fn age(&self, level: usize) -> u64 {
        self.ages.get(level).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn ages(&self) -> &[u64] {
        &self.ages
    }

    /// Accumulate `delta` (clamped to `[0, 1e6]`, then rounded to the nearest
    /// whole tick) onto the age at `level`.
    pub fn incr_cell_age(&mut self, level: usize, delta: f64) {
        let delta = if delta.is_nan() {
            0.0
        } else {
            delta.clamp(0.0, MAX_AGE_INCREMENT).round()
        };
        if let Some(age) = self.ages.get_mut(level) {
            *age = age.saturating_add(delta as u64);
        }
    }

    /// Age every level of a live record by `delta`.
    pub fn advance_ages(&mut self, delta: u64) {
        if self.ids.is_none() {
            return;
        }
        for age in &mut self.ages {
            *age = age.saturating_add(delta);
        }
    }

    /// How far the age at `level` exceeds its threshold; zero when not expired.
    #[must_use]
    pub fn expiration(&self, level: usize) -> u64 {
        match (self.ages.get(level), self.expirations.get(level)) {
            (Some(age), Some(threshold)) => age.saturating_sub(*threshold),
            _ => 0,
        }
    }

    /// Levels past the last configured one never expire.
    #[must_use]
    pub fn is_expired(&self, level: usize) -> bool {
        self.expiration(level) > 0
    }

    /// Both records hold the same defined id at `level`.
    #[must_use]
    pub fn check_match(&self, other: &Self, level: usize) -> bool {
        matches!((self.id(level), other.id(level)), (Some(mine), Some(theirs)) if mine == theirs)
    }

    /// Forget the occupant: ids, generations and ages.
    pub fn clear(&mut self) {
        self.ids = None;
        self.generations.iter_mut().for_each(|generation| *generation = 0);
        self.ages.iter_mut().for_each(|age| *age = 0);
    }
}
