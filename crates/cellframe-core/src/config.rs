use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cores the environment triggers may occupy in one qualifying tick; `hw_max_cores`
/// must exceed this so programs keep room for their own threads.
pub const TRIGGER_CORE_HEADROOM: usize = 12;

/// Errors that can occur when validating frame configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Per-level tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelConfig {
    /// Age beyond which a channel at this level counts as expired.
    pub expiration: u64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self { expiration: 256 }
    }
}

/// Static configuration shared by every frame in a dish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameConfig {
    /// Root seed; the trigger tag table is drawn from `seed + 1`.
    pub seed: u64,
    /// Width of the toroidal grid in cells.
    pub grid_width: u32,
    /// Height of the toroidal grid in cells.
    pub grid_height: u32,
    /// Number of organizational levels (cell lineage, propagule, ...).
    pub nlev: usize,
    /// Per-level settings; must hold exactly `nlev` entries.
    pub levels: Vec<LevelConfig>,
    /// Resource debited from the parent on every successful reproduction.
    pub rep_thresh: f64,
    /// Environment triggers fire on ticks divisible by this value.
    pub env_trig_freq: u64,
    /// Expiration at level 0 tolerated before the expiration trigger fires.
    pub exp_grace_period: u64,
    /// Probability of the stochastic trigger per qualifying tick.
    pub stochastic_trigger_freq: f64,
    /// Maximum concurrently active interpreter threads per frame.
    pub hw_max_cores: usize,
    /// Maximum call depth per interpreter thread.
    pub hw_max_call_depth: usize,
    /// Whether lineage-based triggers (child/parent/channel-mate/propagule) fire.
    pub channels_visible: bool,
    /// Minimum tag similarity for function and membrane matches.
    pub affinity_threshold: f64,
    /// Qualifying ticks a bringer membrane entry stays registered.
    pub membrane_bringer_duration: u32,
    /// Qualifying ticks a blocker membrane entry stays registered.
    pub membrane_blocker_duration: u32,
    /// Qualifying ticks a stockpile reserve adjustment stays in force.
    pub reserve_duration: u32,
    /// Qualifying ticks a program-set regulator stays in force.
    pub regulator_duration: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            grid_width: 16,
            grid_height: 16,
            nlev: 2,
            levels: vec![LevelConfig { expiration: 256 }, LevelConfig { expiration: 1_024 }],
            rep_thresh: 8.0,
            env_trig_freq: 4,
            exp_grace_period: 0,
            stochastic_trigger_freq: 0.1,
            hw_max_cores: 24,
            hw_max_call_depth: 128,
            channels_visible: true,
            affinity_threshold: 0.0,
            membrane_bringer_duration: 4,
            membrane_blocker_duration: 4,
            reserve_duration: 8,
            regulator_duration: 4,
        }
    }
}

impl FrameConfig {
    /// Configuration with `nlev` levels sharing one expiration threshold.
    #[must_use]
    pub fn with_levels(nlev: usize, expiration: u64) -> Self {
        Self {
            nlev,
            levels: vec![LevelConfig { expiration }; nlev],
            ..Self::default()
        }
    }

    /// Number of grid cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.grid_width as usize * self.grid_height as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(ConfigError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if self.nlev == 0 {
            return Err(ConfigError::InvalidConfig("nlev must be non-zero"));
        }
        if self.levels.len() != self.nlev {
            return Err(ConfigError::InvalidConfig(
                "levels must hold exactly nlev entries",
            ));
        }
        if self.env_trig_freq == 0 {
            return Err(ConfigError::InvalidConfig("env_trig_freq must be non-zero"));
        }
        if !self.rep_thresh.is_finite() || self.rep_thresh < 0.0 {
            return Err(ConfigError::InvalidConfig(
                "rep_thresh must be finite and non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.stochastic_trigger_freq) {
            return Err(ConfigError::InvalidConfig(
                "stochastic_trigger_freq must be between 0.0 and 1.0",
            ));
        }
        if self.hw_max_cores <= TRIGGER_CORE_HEADROOM {
            return Err(ConfigError::InvalidConfig(
                "hw_max_cores must exceed the trigger core headroom",
            ));
        }
        if self.hw_max_call_depth == 0 {
            return Err(ConfigError::InvalidConfig(
                "hw_max_call_depth must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.affinity_threshold) {
            return Err(ConfigError::InvalidConfig(
                "affinity_threshold must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}
