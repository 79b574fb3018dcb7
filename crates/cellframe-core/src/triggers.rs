//! Environment trigger taxonomy and its pro/anti tag table.

use cellframe_tags::Tag;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Environment condition evaluated once per qualifying tick, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    CellChild,
    CellParent,
    NegativeResource,
    Expiration,
    HarvestWithdrawal,
    ChannelMate(usize),
    PropaguleChild,
    PropaguleParent,
    NeighborLive,
    NeighborPoorer,
    NeighborOlder,
    NeighborExpired(usize),
    Update,
    JustBorn,
    Stochastic,
}

impl Trigger {
    /// Number of trigger slots for `nlev` levels.
    #[must_use]
    pub const fn count(nlev: usize) -> usize {
        13 + 2 * nlev
    }

    /// Index of this trigger in the tag table.
    #[must_use]
    pub const fn slot(self, nlev: usize) -> usize {
        match self {
            Self::CellChild => 0,
            Self::CellParent => 1,
            Self::NegativeResource => 2,
            Self::Expiration => 3,
            Self::HarvestWithdrawal => 4,
            Self::ChannelMate(lev) => 5 + lev,
            Self::PropaguleChild => 5 + nlev,
            Self::PropaguleParent => 6 + nlev,
            Self::NeighborLive => 7 + nlev,
            Self::NeighborPoorer => 8 + nlev,
            Self::NeighborOlder => 9 + nlev,
            Self::NeighborExpired(lev) => 10 + nlev + lev,
            Self::Update => 10 + 2 * nlev,
            Self::JustBorn => 11 + 2 * nlev,
            Self::Stochastic => 12 + 2 * nlev,
        }
    }

    /// Every trigger in dispatch order.
    #[must_use]
    pub fn all(nlev: usize) -> Vec<Self> {
        let mut triggers = vec![
            Self::CellChild,
            Self::CellParent,
            Self::NegativeResource,
            Self::Expiration,
            Self::HarvestWithdrawal,
        ];
        triggers.extend((0..nlev).map(Self::ChannelMate));
        triggers.extend([
            Self::PropaguleChild,
            Self::PropaguleParent,
            Self::NeighborLive,
            Self::NeighborPoorer,
            Self::NeighborOlder,
        ]);
        triggers.extend((0..nlev).map(Self::NeighborExpired));
        triggers.extend([Self::Update, Self::JustBorn, Self::Stochastic]);
        triggers
    }
}

/// Pro tags drawn once from a dedicated seed; anti tags are their complements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerTags {
    nlev: usize,
    pro: Vec<Tag>,
    anti: Vec<Tag>,
}

impl TriggerTags {
    /// Build the table from the dish seed (drawn from `seed + 1`).
    #[must_use]
    pub fn new(seed: u64, nlev: usize) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
        let pro: Vec<Tag> = (0..Trigger::count(nlev))
            .map(|_| Tag::random(&mut rng))
            .collect();
        let anti = pro.iter().map(|tag| tag.toggled()).collect();
        Self { nlev, pro, anti }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pro.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pro.is_empty()
    }

    /// Tag fired when `trigger` holds.
    #[must_use]
    pub fn pro(&self, trigger: Trigger) -> Tag {
        self.pro[trigger.slot(self.nlev)]
    }

    /// Tag fired when a two-sided `trigger` does not hold.
    #[must_use]
    pub fn anti(&self, trigger: Trigger) -> Tag {
        self.anti[trigger.slot(self.nlev)]
    }
}
