//! Virtual hardware bound to one facing of one cell.

use cellframe_tags::{AffinityRegistry, Tag};
use cellframe_vm::{HardwareLimits, Interpreter, Memory, Program};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use thiserror::Error;
use tracing::{debug, trace};

use crate::library::{FrameContext, FrameOp};
use crate::membrane::Membrane;
use crate::sensing::Sensor;
use crate::topology::{NUM_DIRS, rotate};
use crate::triggers::Trigger;
use crate::{ConfigError, FrameConfig, Manager, Tick};

/// Contract violations raised by frame hardware.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame at {pos} facing {facing} has no program loaded")]
    NoProgram { pos: usize, facing: usize },
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Interpreter, membrane and message scratch state of one frame.
///
/// Reserve, pause flags, inbox switch and inbox live in the [`Manager`] so
/// sibling and neighbour frames can reach them.
#[derive(Debug, Clone)]
pub struct FrameHardware {
    pos: usize,
    facing: usize,
    cpu: Interpreter<FrameOp>,
    membrane: Membrane,
    msg_dir: usize,
}

impl FrameHardware {
    pub fn new(
        pos: usize,
        facing: usize,
        config: &FrameConfig,
        rng: SmallRng,
    ) -> Result<Self, FrameError> {
        config.validate()?;
        let limits = HardwareLimits {
            max_cores: config.hw_max_cores,
            max_call_depth: config.hw_max_call_depth,
            affinity_threshold: config.affinity_threshold,
            regulator_duration: config.regulator_duration,
        };
        Ok(Self {
            pos,
            facing: facing % NUM_DIRS,
            cpu: Interpreter::new(rng, limits),
            membrane: Membrane::new(config.affinity_threshold),
            msg_dir: facing % NUM_DIRS,
        })
    }

    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn facing(&self) -> usize {
        self.facing
    }

    /// Direction of the most recent outbound message.
    #[must_use]
    pub const fn msg_dir(&self) -> usize {
        self.msg_dir
    }

    #[must_use]
    pub fn calc_dir(&self, relative: f64) -> usize {
        rotate(self.facing, relative)
    }

    #[must_use]
    pub fn cpu(&self) -> &Interpreter<FrameOp> {
        &self.cpu
    }

    #[must_use]
    pub fn membrane(&self) -> &Membrane {
        &self.membrane
    }

    pub fn membrane_mut(&mut self) -> &mut Membrane {
        &mut self.membrane
    }

    #[must_use]
    pub fn sensor<'a>(&self, manager: &'a Manager) -> Sensor<'a> {
        Sensor::new(manager, self.pos, self.facing)
    }

    pub fn set_program(&mut self, program: Program<FrameOp>) {
        self.cpu.set_program(program);
    }

    #[must_use]
    pub fn has_program(&self) -> bool {
        self.cpu.has_program()
    }

    /// Return to the uninitialized state: no program, no threads, empty membrane.
    pub fn reset(&mut self, manager: &mut Manager) {
        self.cpu.reset_hardware();
        self.cpu.reset_program();
        self.membrane.clear();
        self.msg_dir = self.facing;
        manager.controls_mut(self.pos, self.facing).reset();
        manager.inbox_mut(self.pos, self.facing).clear();
        debug!(pos = self.pos, facing = self.facing, "frame reset");
    }

    /// Per-tick environment pass; does nothing off the trigger period.
    ///
    /// Fires the environment triggers, then decays the reserve, the membrane
    /// and program regulators. Reproduction pauses on this facing are lifted
    /// here as well, so a `PauseRepr` holds until the next qualifying tick
    /// unless `ResumeRepr` lifts it sooner. Returns the tags fired, in
    /// dispatch order.
    pub fn advance_environment(&mut self, manager: &mut Manager, tick: Tick) -> Vec<Tag> {
        if tick.0 % manager.config().env_trig_freq != 0 {
            return Vec::new();
        }
        let fired = self.dispatch_triggers(manager, tick);
        trace!(pos = self.pos, facing = self.facing, fired = fired.len(), "env triggers");

        let controls = manager.controls_mut(self.pos, self.facing);
        controls.reserve.try_clear();
        controls.clear_pauses();
        self.membrane.decay();
        self.cpu.matcher_mut().decay_regulators();
        fired
    }

    fn dispatch_triggers(&mut self, manager: &mut Manager, tick: Tick) -> Vec<Tag> {
        let config = manager.config();
        let nlev = config.nlev;
        let visible = config.channels_visible;
        let grace = config.exp_grace_period;
        let stochastic_freq = config.stochastic_trigger_freq;
        let tags = manager.trigger_tags();
        let sensor = Sensor::new(manager, self.pos, self.facing);
        let own = manager.stockpile(self.pos);

        let mut fired = Vec::new();
        let mut fire = |tag: Tag| fired.push(tag);

        if visible && sensor.is_cell_child(0.0) {
            fire(tags.pro(Trigger::CellChild));
        }
        if visible && sensor.is_cell_parent(0.0) {
            fire(tags.pro(Trigger::CellParent));
        }
        if own.query_resource() < 0.0 {
            fire(tags.pro(Trigger::NegativeResource));
        }
        if manager.channel(self.pos).expiration(0) > grace {
            fire(tags.pro(Trigger::Expiration));
        }
        if own.any_harvest_withdrawals() {
            fire(tags.pro(Trigger::HarvestWithdrawal));
        }
        if visible {
            for lev in 0..nlev {
                fire(if sensor.is_channel_mate(lev, 0.0) {
                    tags.pro(Trigger::ChannelMate(lev))
                } else {
                    tags.anti(Trigger::ChannelMate(lev))
                });
            }
            if sensor.is_propagule_child(0.0) {
                fire(tags.pro(Trigger::PropaguleChild));
            }
            if sensor.is_propagule_parent(0.0) {
                fire(tags.pro(Trigger::PropaguleParent));
            }
        }
        let live = sensor.is_live(0.0);
        fire(if live {
            tags.pro(Trigger::NeighborLive)
        } else {
            tags.anti(Trigger::NeighborLive)
        });
        if live {
            fire(if sensor.neighbor_is_poorer(0.0) {
                tags.pro(Trigger::NeighborPoorer)
            } else {
                tags.anti(Trigger::NeighborPoorer)
            });
            fire(if sensor.neighbor_is_older(0.0) {
                tags.pro(Trigger::NeighborOlder)
            } else {
                tags.anti(Trigger::NeighborOlder)
            });
        }
        if visible {
            for lev in 0..nlev {
                if sensor.neighbor_expiration(lev, 0.0) > 0 {
                    fire(tags.pro(Trigger::NeighborExpired(lev)));
                }
            }
        }
        fire(tags.pro(Trigger::Update));
        if manager.family(self.pos).cell_age(tick) == 0 {
            fire(tags.pro(Trigger::JustBorn));
        }
        if self.cpu.rng_mut().random::<f64>() < stochastic_freq {
            fire(tags.pro(Trigger::Stochastic));
        }

        let stockpile = manager.stockpile_mut(self.pos);
        for lev in 0..nlev {
            stockpile.reset_harvest_withdrawals(lev);
        }
        for tag in &fired {
            self.cpu.trigger(*tag, Memory::new());
        }
        fired
    }

    /// Drain this frame's inbox into the interpreter through the membrane.
    ///
    /// Messages on an inactive inbox are discarded.
    pub fn queue_messages(&mut self, manager: &mut Manager) {
        let active = manager.controls(self.pos, self.facing).inbox_active;
        let inbox = manager.inbox_mut(self.pos, self.facing);
        if active {
            for message in inbox.drain(..) {
                if self.membrane.admits(message.affinity) {
                    self.cpu.queue_event(message.into_event());
                }
            }
        }
        inbox.clear();
    }

    /// Execute one interpreter step.
    pub fn step_once(&mut self, manager: &mut Manager) -> Result<(), FrameError> {
        if !self.cpu.has_program() {
            return Err(FrameError::NoProgram {
                pos: self.pos,
                facing: self.facing,
            });
        }
        let mut host = FrameContext {
            pos: self.pos,
            facing: self.facing,
            msg_dir: &mut self.msg_dir,
            membrane: &mut self.membrane,
            manager,
        };
        self.cpu.single_process(&mut host);
        Ok(())
    }

    /// Copy the running program's regulator state onto `target`.
    pub fn imprint_regulators<W>(&self, target: &mut AffinityRegistry<W>) {
        self.cpu.imprint_regulators(target);
    }
}

/// The facing set of one grid cell: one frame per direction.
#[derive(Debug, Clone)]
pub struct FrameCell {
    pos: usize,
    frames: Vec<FrameHardware>,
}

impl FrameCell {
    /// Build the facing set; each frame draws its own generator from `rng`.
    pub fn new(pos: usize, config: &FrameConfig, rng: &mut dyn RngCore) -> Result<Self, FrameError> {
        let frames = (0..NUM_DIRS)
            .map(|facing| {
                FrameHardware::new(pos, facing, config, SmallRng::seed_from_u64(rng.next_u64()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pos, frames })
    }

    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn frame(&self, facing: usize) -> &FrameHardware {
        &self.frames[facing % NUM_DIRS]
    }

    pub fn frame_mut(&mut self, facing: usize) -> &mut FrameHardware {
        &mut self.frames[facing % NUM_DIRS]
    }

    pub fn frames(&self) -> impl Iterator<Item = &FrameHardware> + '_ {
        self.frames.iter()
    }

    /// Load `program` into every frame, replacing whatever ran before.
    pub fn load_program(&mut self, manager: &mut Manager, program: &Program<FrameOp>) {
        for frame in &mut self.frames {
            frame.reset(manager);
            frame.set_program(program.clone());
        }
    }

    pub fn reset(&mut self, manager: &mut Manager) {
        for frame in &mut self.frames {
            frame.reset(manager);
        }
    }

    #[must_use]
    pub fn has_program(&self) -> bool {
        self.frames.iter().all(FrameHardware::has_program)
    }

    pub fn advance_environment(&mut self, manager: &mut Manager, tick: Tick) {
        for frame in &mut self.frames {
            frame.advance_environment(manager, tick);
        }
    }

    pub fn queue_messages(&mut self, manager: &mut Manager) {
        for frame in &mut self.frames {
            frame.queue_messages(manager);
        }
    }

    pub fn step_once(&mut self, manager: &mut Manager) -> Result<(), FrameError> {
        for frame in &mut self.frames {
            frame.step_once(manager)?;
        }
        Ok(())
    }

    /// Settle the first sire queued at this tile and load its program.
    pub fn settle(&mut self, manager: &mut Manager, tick: Tick) -> bool {
        match manager.settle_sire(self.pos, tick) {
            Some(program) => {
                self.load_program(manager, &program);
                true
            }
            None => false,
        }
    }
}
