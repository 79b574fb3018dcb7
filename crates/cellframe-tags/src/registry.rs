//! Regulated nearest-match registry mapping tags to dispatch targets.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::Tag;

new_key_type! {
    /// Stable handle for a registry entry; never reused while the entry is live.
    pub struct Uid;
}

/// Additive bias applied to an entry's match distance, with a countdown back to neutral.
///
/// Negative values up-regulate (the entry wins more often), positive values
/// down-regulate it. The registry only applies the current value; callers own
/// the decay schedule through [`AffinityRegistry::decay_regulators`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Regulator {
    value: f64,
    countdown: u32,
}

impl Regulator {
    /// Value of a regulator that leaves match distances untouched.
    pub const NEUTRAL: f64 = 0.0;

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Remaining decay calls before the regulator reverts to neutral.
    #[must_use]
    pub const fn countdown(&self) -> u32 {
        self.countdown
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.value == Self::NEUTRAL
    }

    fn set(&mut self, value: f64, duration: u32) {
        if value.is_finite() {
            self.value = value;
            self.countdown = duration;
        }
    }

    fn decay(&mut self) {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.value = Self::NEUTRAL;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry<V> {
    tag: Tag,
    value: V,
    regulator: Regulator,
}

/// Content-addressable registry resolving query tags to the closest registered entries.
///
/// Matches are ranked by regulated distance; entries whose regulated similarity
/// falls below the registry threshold never match. Ties keep insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityRegistry<V> {
    entries: SlotMap<Uid, Entry<V>>,
    order: Vec<Uid>,
    threshold: f64,
}

impl<V> Default for AffinityRegistry<V> {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<V> AffinityRegistry<V> {
    /// Create an empty registry accepting matches with similarity of at least `threshold`.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            entries: SlotMap::with_key(),
            order: Vec::new(),
            threshold: sanitize_threshold(threshold),
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = sanitize_threshold(threshold);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Register `value` under `tag`, returning its handle.
    pub fn insert(&mut self, tag: Tag, value: V) -> Uid {
        let uid = self.entries.insert(Entry {
            tag,
            value,
            regulator: Regulator::default(),
        });
        self.order.push(uid);
        uid
    }

    /// Remove an entry, returning its value if it was present.
    pub fn remove(&mut self, uid: Uid) -> Option<V> {
        let entry = self.entries.remove(uid)?;
        self.order.retain(|candidate| *candidate != uid);
        Some(entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn get(&self, uid: Uid) -> Option<&V> {
        self.entries.get(uid).map(|entry| &entry.value)
    }

    #[must_use]
    pub fn get_mut(&mut self, uid: Uid) -> Option<&mut V> {
        self.entries.get_mut(uid).map(|entry| &mut entry.value)
    }

    #[must_use]
    pub fn tag(&self, uid: Uid) -> Option<Tag> {
        self.entries.get(uid).map(|entry| entry.tag)
    }

    /// Handles in insertion order.
    pub fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.order.iter().copied()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Uid, Tag, &V)> + '_ {
        self.order.iter().filter_map(|uid| {
            self.entries
                .get(*uid)
                .map(|entry| (*uid, entry.tag, &entry.value))
        })
    }

    /// First entry registered under exactly `tag`.
    #[must_use]
    pub fn find_tag(&self, tag: Tag) -> Option<Uid> {
        self.order
            .iter()
            .copied()
            .find(|uid| self.entries.get(*uid).is_some_and(|entry| entry.tag == tag))
    }

    /// Regulated similarity of an entry to `query`, if the entry exists.
    #[must_use]
    pub fn score(&self, uid: Uid, query: Tag) -> Option<f64> {
        self.entries
            .get(uid)
            .map(|entry| 1.0 - regulated_distance(entry, query))
    }

    /// Up to `n` entries clearing the threshold, best first.
    #[must_use]
    pub fn match_ranked(&self, query: Tag, n: usize) -> Vec<Uid> {
        if n == 0 {
            return Vec::new();
        }
        let cutoff = 1.0 - self.threshold;
        let mut ranked: Vec<(OrderedFloat<f64>, Uid)> = self
            .order
            .iter()
            .filter_map(|uid| {
                let entry = self.entries.get(*uid)?;
                let distance = regulated_distance(entry, query);
                (distance <= cutoff).then_some((OrderedFloat(distance), *uid))
            })
            .collect();
        // Stable sort keeps insertion order among equal distances.
        ranked.sort_by_key(|(distance, _)| *distance);
        ranked.truncate(n);
        ranked.into_iter().map(|(_, uid)| uid).collect()
    }

    /// Best entry clearing the threshold.
    #[must_use]
    pub fn match_best(&self, query: Tag) -> Option<Uid> {
        self.match_ranked(query, 1).into_iter().next()
    }

    #[must_use]
    pub fn regulator(&self, uid: Uid) -> Option<Regulator> {
        self.entries.get(uid).map(|entry| entry.regulator)
    }

    /// Add `delta` to an entry's regulator and restart its countdown.
    pub fn adj_regulator(&mut self, uid: Uid, delta: f64, duration: u32) -> bool {
        match self.entries.get_mut(uid) {
            Some(entry) => {
                let next = entry.regulator.value + delta;
                entry.regulator.set(next, duration);
                true
            }
            None => false,
        }
    }

    /// Overwrite an entry's regulator and restart its countdown.
    pub fn set_regulator(&mut self, uid: Uid, value: f64, duration: u32) -> bool {
        match self.entries.get_mut(uid) {
            Some(entry) => {
                entry.regulator.set(value, duration);
                true
            }
            None => false,
        }
    }

    /// Advance every regulator countdown by one step.
    pub fn decay_regulators(&mut self) {
        for entry in self.entries.values_mut() {
            entry.regulator.decay();
        }
    }

    pub fn reset_regulators(&mut self) {
        for entry in self.entries.values_mut() {
            entry.regulator = Regulator::default();
        }
    }

    /// Copy this registry's regulators onto `target` entries with identical tags.
    ///
    /// Target entries whose tag is absent here are left untouched.
    pub fn imprint_regulators<W>(&self, target: &mut AffinityRegistry<W>) {
        for entry in target.entries.values_mut() {
            if let Some(source) = self.find_tag(entry.tag).and_then(|uid| self.entries.get(uid)) {
                entry.regulator = source.regulator;
            }
        }
    }
}

fn sanitize_threshold(threshold: f64) -> f64 {
    if threshold.is_nan() {
        0.0
    } else {
        threshold.clamp(0.0, 1.0)
    }
}

fn regulated_distance<V>(entry: &Entry<V>, query: Tag) -> f64 {
    (entry.tag.distance(query) + entry.regulator.value).max(0.0)
}
