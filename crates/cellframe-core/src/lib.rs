//! Per-cell virtual hardware for a toroidal dish of digital organisms.
//!
//! Each grid cell hosts a [`FrameCell`]: one [`FrameHardware`] per facing
//! direction, each running a tag-dispatched [`cellframe_vm::Interpreter`].
//! Shared per-cell state (stockpiles, channels, families, inboxes, sire
//! intakes) lives in index-addressed arenas inside the [`Manager`], so frames
//! reach their neighbours by grid position rather than by reference.
//!
//! Per qualifying tick the orchestrator calls, for each live frame,
//! [`FrameHardware::advance_environment`], [`FrameHardware::queue_messages`]
//! and [`FrameHardware::step_once`].

use serde::{Deserialize, Serialize};

mod channel;
mod config;
mod family;
mod frame;
mod library;
mod manager;
mod membrane;
mod message;
mod reproduction;
mod sensing;
mod sire;
mod stockpile;
pub mod topology;
mod triggers;

pub use channel::{ChannelId, ChannelRecord, MAX_AGE_INCREMENT};
pub use config::{ConfigError, FrameConfig, LevelConfig, TRIGGER_CORE_HEADROOM};
pub use family::{Apoptosis, Family};
pub use frame::{FrameCell, FrameError, FrameHardware};
pub use library::{
    BIG_RESOURCE_FRAC, FrameContext, FrameOp, SMALL_RESOURCE_FRAC, frame_inst_lib,
};
pub use manager::{FrameControls, Manager};
pub use membrane::Membrane;
pub use message::{Message, MessageKind};
pub use reproduction::try_reproduce;
pub use sensing::Sensor;
pub use sire::{Sire, SireIntake, SireRecord};
pub use stockpile::{Reserve, Stockpile};
pub use topology::{GridTopology, NUM_DIRS};
pub use triggers::{Trigger, TriggerTags};

/// High level simulation clock (ticks processed since boot).
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}
