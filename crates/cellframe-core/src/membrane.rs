//! Decaying tag filter deciding which inbound messages reach the interpreter.

use cellframe_tags::{AffinityRegistry, Tag, Uid};
use std::collections::HashMap;

/// Registered tags with decaying multiplicities.
///
/// Decay subtracts 2 per qualifying tick, so an entry keeps its parity for its
/// whole life: odd entries admit matching messages, even entries block them.
#[derive(Debug, Clone)]
pub struct Membrane {
    registry: AffinityRegistry<u32>,
    tags: HashMap<Tag, Uid>,
}

impl Default for Membrane {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Membrane {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            registry: AffinityRegistry::new(threshold),
            tags: HashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Insert `tag`, or reset an existing entry, with the given multiplicity.
    pub fn register(&mut self, tag: Tag, multiplicity: u32) {
        if let Some(value) = self
            .tags
            .get(&tag)
            .and_then(|uid| self.registry.get_mut(*uid))
        {
            *value = multiplicity;
            return;
        }
        let uid = self.registry.insert(tag, multiplicity);
        self.tags.insert(tag, uid);
    }

    /// Admit messages matching `tag` for `duration` qualifying ticks.
    pub fn register_bringer(&mut self, tag: Tag, duration: u32) {
        self.register(tag, duration.saturating_mul(2).saturating_add(1));
    }

    /// Block messages matching `tag` for `duration` qualifying ticks.
    pub fn register_blocker(&mut self, tag: Tag, duration: u32) {
        self.register(tag, duration.saturating_mul(2));
    }

    /// Exact-tag multiplicity.
    #[must_use]
    pub fn multiplicity(&self, tag: Tag) -> Option<u32> {
        self.tags
            .get(&tag)
            .and_then(|uid| self.registry.get(*uid))
            .copied()
    }

    /// One decay step: multiplicities above 2 drop by 2, the rest are removed.
    pub fn decay(&mut self) {
        let mut expired = Vec::new();
        for uid in self.registry.uids().collect::<Vec<_>>() {
            if let Some(value) = self.registry.get_mut(uid) {
                if *value > 2 {
                    *value -= 2;
                } else {
                    expired.push(uid);
                }
            }
        }
        for uid in expired {
            if let Some(tag) = self.registry.tag(uid) {
                self.tags.remove(&tag);
            }
            self.registry.remove(uid);
        }
    }

    /// Multiplicities of up to `n` entries matching `tag`, best first.
    #[must_use]
    pub fn match_ranked(&self, tag: Tag, n: usize) -> Vec<u32> {
        self.registry
            .match_ranked(tag, n)
            .into_iter()
            .filter_map(|uid| self.registry.get(uid).copied())
            .collect()
    }

    /// Whether a message with affinity `tag` passes: its best match must be odd.
    #[must_use]
    pub fn admits(&self, tag: Tag) -> bool {
        self.match_ranked(tag, 1)
            .first()
            .is_some_and(|multiplicity| multiplicity % 2 == 1)
    }

    /// Registered tags and multiplicities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, u32)> + '_ {
        self.registry.iter().map(|(_, tag, value)| (tag, *value))
    }

    pub fn clear(&mut self) {
        self.registry.clear();
        self.tags.clear();
    }
}
