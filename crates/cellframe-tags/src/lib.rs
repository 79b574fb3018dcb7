//! Fixed-width bit tags and the regulated affinity registry used for tag-based dispatch.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

mod registry;

pub use registry::{AffinityRegistry, Regulator, Uid};

/// Number of significant bits carried by every tag in the system.
pub const TAG_WIDTH: u32 = 16;

const TAG_MASK: u64 = u64::MAX >> (64 - TAG_WIDTH);

/// Immutable fixed-width bit string used for approximate (best-match) routing.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct Tag(u64);

impl Tag {
    /// Construct a tag from raw bits; bits above [`TAG_WIDTH`] are discarded.
    #[must_use]
    pub const fn new(bits: u64) -> Self {
        Self(bits & TAG_MASK)
    }

    /// Draw a uniformly random tag.
    #[must_use]
    pub fn random(rng: &mut dyn RngCore) -> Self {
        Self::new(rng.next_u64())
    }

    /// Raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Bitwise complement within the tag width (the "anti" instance of a signal).
    #[must_use]
    pub const fn toggled(self) -> Self {
        Self::new(!self.0)
    }

    /// Number of differing bits.
    #[must_use]
    pub const fn hamming(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Normalised mismatch in `[0, 1]`; zero for identical tags.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        f64::from(self.hamming(other)) / f64::from(TAG_WIDTH)
    }

    /// Normalised similarity in `[0, 1]`; one for identical tags.
    #[must_use]
    pub fn similarity(self, other: Self) -> f64 {
        1.0 - self.distance(other)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.0, width = TAG_WIDTH as usize)
    }
}
