//! Environment instruction set and the host that executes it for one frame.

use cellframe_tags::Tag;
use cellframe_vm::{ExecContext, Extension, Host, InstLib, Memory};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::trace;

use crate::Manager;
use crate::family::Apoptosis;
use crate::membrane::Membrane;
use crate::message::{Message, MessageKind};
use crate::reproduction::try_reproduce;
use crate::sensing::Sensor;
use crate::topology::{NUM_DIRS, opposite, rotate};

/// Fraction of the balance moved by `SendBigFracResource`.
pub const BIG_RESOURCE_FRAC: f64 = 0.5;
/// Fraction of the balance moved by `SendSmallFracResource`.
pub const SMALL_RESOURCE_FRAC: f64 = 0.02;

/// Instructions that reach outside the interpreter into the cell and its neighbours.
///
/// Unless noted, Arg1 holds a direction relative to the frame's facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOp {
    SendMsgInternal,
    BcstMsgInternal,
    SendMsgExternal,
    BcstMsgExternal,
    IncrStockpileReserve,
    DecrStockpileReserve,
    PauseRepr(usize),
    PauseReprAll,
    ResumeRepr(usize),
    ResumeReprAll,
    ActivateInbox,
    DeactivateInbox,
    SendBigFracResource,
    SendSmallFracResource,
    TryReproduce(usize),
    IncrCellAge(usize),
    DoApoptosisComplete,
    DoApoptosisPartial,
    PutMembraneBringer,
    PutMembraneBlocker,
    QueryOwnStockpile,
    QueryChannelGen(usize),
    QueryIsLive,
    QueryIsOccupied,
    QueryIsCellChild,
    QueryIsCellParent,
    QueryFacingChannelMate(usize),
    QueryIsPropaguleChild,
    QueryIsPropaguleParent,
    QueryFacingChannel(usize),
    QueryFacingStockpile,
}

impl Extension for FrameOp {
    fn name(&self) -> Cow<'static, str> {
        let leveled = |base: &str, lev: &usize| Cow::Owned(format!("{base}-Lev{lev}"));
        match self {
            Self::SendMsgInternal => Cow::Borrowed("SendMsgInternal"),
            Self::BcstMsgInternal => Cow::Borrowed("BcstMsgInternal"),
            Self::SendMsgExternal => Cow::Borrowed("SendMsgExternal"),
            Self::BcstMsgExternal => Cow::Borrowed("BcstMsgExternal"),
            Self::IncrStockpileReserve => Cow::Borrowed("IncrStockpileReserve"),
            Self::DecrStockpileReserve => Cow::Borrowed("DecrStockpileReserve"),
            Self::PauseRepr(lev) => leveled("PauseRepr", lev),
            Self::PauseReprAll => Cow::Borrowed("PauseRepr"),
            Self::ResumeRepr(lev) => leveled("ResumeRepr", lev),
            Self::ResumeReprAll => Cow::Borrowed("ResumeRepr"),
            Self::ActivateInbox => Cow::Borrowed("ActivateInbox"),
            Self::DeactivateInbox => Cow::Borrowed("DeactivateInbox"),
            Self::SendBigFracResource => Cow::Borrowed("SendBigFracResource"),
            Self::SendSmallFracResource => Cow::Borrowed("SendSmallFracResource"),
            Self::TryReproduce(lev) => leveled("TryReproduce", lev),
            Self::IncrCellAge(lev) => leveled("IncrCellAge", lev),
            Self::DoApoptosisComplete => Cow::Borrowed("DoApoptosisComplete"),
            Self::DoApoptosisPartial => Cow::Borrowed("DoApoptosisPartial"),
            Self::PutMembraneBringer => Cow::Borrowed("PutMembraneBringer"),
            Self::PutMembraneBlocker => Cow::Borrowed("PutMembraneBlocker"),
            Self::QueryOwnStockpile => Cow::Borrowed("QueryOwnStockpile"),
            Self::QueryChannelGen(lev) => leveled("QueryChannelGen", lev),
            Self::QueryIsLive => Cow::Borrowed("QueryIsLive"),
            Self::QueryIsOccupied => Cow::Borrowed("QueryIsOccupied"),
            Self::QueryIsCellChild => Cow::Borrowed("QueryIsCellChild"),
            Self::QueryIsCellParent => Cow::Borrowed("QueryIsCellParent"),
            Self::QueryFacingChannelMate(lev) => leveled("QueryFacingChannelMate", lev),
            Self::QueryIsPropaguleChild => Cow::Borrowed("QueryIsPropaguleChild"),
            Self::QueryIsPropaguleParent => Cow::Borrowed("QueryIsPropaguleParent"),
            Self::QueryFacingChannel(lev) => leveled("QueryFacingChannel", lev),
            Self::QueryFacingStockpile => Cow::Borrowed("QueryFacingStockpile"),
        }
    }

    fn arity(&self) -> usize {
        match self {
            Self::BcstMsgInternal
            | Self::BcstMsgExternal
            | Self::DoApoptosisComplete
            | Self::DoApoptosisPartial
            | Self::PutMembraneBringer
            | Self::PutMembraneBlocker => 0,
            Self::QueryIsLive
            | Self::QueryIsOccupied
            | Self::QueryIsCellChild
            | Self::QueryIsCellParent
            | Self::QueryFacingChannelMate(_)
            | Self::QueryIsPropaguleChild
            | Self::QueryIsPropaguleParent
            | Self::QueryFacingChannel(_)
            | Self::QueryFacingStockpile => 2,
            _ => 1,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::SendMsgInternal => "Send output memory to the sibling frame in direction Arg1.",
            Self::BcstMsgInternal => "Send output memory to every sibling frame.",
            Self::SendMsgExternal => "Send output memory to the neighbour in direction Arg1.",
            Self::BcstMsgExternal => "Send output memory to every neighbour.",
            Self::IncrStockpileReserve => "Raise the reserve of frame Arg1 by half the reproduction threshold.",
            Self::DecrStockpileReserve => "Lower the reserve of frame Arg1 by half the reproduction threshold.",
            Self::PauseRepr(_) => "Pause reproduction at this level for frame Arg1.",
            Self::PauseReprAll => "Pause reproduction at every level for frame Arg1.",
            Self::ResumeRepr(_) => "Resume reproduction at this level for frame Arg1.",
            Self::ResumeReprAll => "Resume reproduction at every level for frame Arg1.",
            Self::ActivateInbox => "Accept messages on frame Arg1.",
            Self::DeactivateInbox => "Discard messages on frame Arg1.",
            Self::SendBigFracResource => "Give half of own resource to live neighbour Arg1.",
            Self::SendSmallFracResource => "Give two percent of own resource to live neighbour Arg1.",
            Self::TryReproduce(_) => "Reproduce into neighbour Arg1 at this level or the first unexpired one above.",
            Self::IncrCellAge(_) => "Age own channel at this level by 1 + Arg1.",
            Self::DoApoptosisComplete => "Mark this cell for complete apoptosis.",
            Self::DoApoptosisPartial => "Mark this cell for partial apoptosis.",
            Self::PutMembraneBringer => "Admit messages matching the affinity for a while.",
            Self::PutMembraneBlocker => "Block messages matching the affinity for a while.",
            Self::QueryOwnStockpile => "Own resource => Local memory Arg1.",
            Self::QueryChannelGen(_) => "Own generation at this level => Local memory Arg1.",
            Self::QueryIsLive => "Is neighbour Arg1 live => Local memory Arg2.",
            Self::QueryIsOccupied => "Does neighbour Arg1 hold a channel => Local memory Arg2.",
            Self::QueryIsCellChild => "Is this cell the child of neighbour Arg1 => Local memory Arg2.",
            Self::QueryIsCellParent => "Is this cell the parent of neighbour Arg1 => Local memory Arg2.",
            Self::QueryFacingChannelMate(_) => "Does neighbour Arg1 share this level's channel => Local memory Arg2.",
            Self::QueryIsPropaguleChild => "Does this cell descend from neighbour Arg1's propagule => Local memory Arg2.",
            Self::QueryIsPropaguleParent => "Does neighbour Arg1 descend from this cell's propagule => Local memory Arg2.",
            Self::QueryFacingChannel(_) => "Channel id of neighbour Arg1 at this level => Local memory Arg2.",
            Self::QueryFacingStockpile => "Resource of neighbour Arg1 => Local memory Arg2.",
        }
    }
}

impl FrameOp {
    /// Every environment instruction for a dish with `nlev` levels.
    #[must_use]
    pub fn catalogue(nlev: usize) -> Vec<Self> {
        let mut ops = vec![
            Self::SendMsgInternal,
            Self::BcstMsgInternal,
            Self::IncrStockpileReserve,
            Self::DecrStockpileReserve,
        ];
        ops.extend((0..=nlev).map(Self::PauseRepr));
        ops.extend((0..=nlev).map(Self::ResumeRepr));
        ops.extend([
            Self::PauseReprAll,
            Self::ResumeReprAll,
            Self::ActivateInbox,
            Self::DeactivateInbox,
            Self::PutMembraneBringer,
            Self::PutMembraneBlocker,
            Self::QueryOwnStockpile,
        ]);
        ops.extend((0..nlev).map(Self::QueryChannelGen));
        ops.extend([
            Self::SendBigFracResource,
            Self::SendSmallFracResource,
            Self::SendMsgExternal,
            Self::BcstMsgExternal,
        ]);
        ops.extend((0..=nlev).map(Self::TryReproduce));
        ops.extend((0..nlev).map(Self::IncrCellAge));
        ops.extend([
            Self::DoApoptosisComplete,
            Self::DoApoptosisPartial,
            Self::QueryIsLive,
            Self::QueryIsOccupied,
            Self::QueryIsCellChild,
            Self::QueryIsCellParent,
        ]);
        ops.extend((0..nlev).map(Self::QueryFacingChannelMate));
        ops.extend([Self::QueryIsPropaguleChild, Self::QueryIsPropaguleParent]);
        ops.extend((0..nlev).map(Self::QueryFacingChannel));
        ops.push(Self::QueryFacingStockpile);
        ops
    }
}

/// Default interpreter instructions followed by the environment instructions.
#[must_use]
pub fn frame_inst_lib(nlev: usize) -> InstLib<FrameOp> {
    let mut lib = InstLib::with_defaults();
    for op in FrameOp::catalogue(nlev) {
        lib.add_ext(op);
    }
    lib
}

/// Environment surface of one frame during a single interpreter step.
pub struct FrameContext<'a> {
    pub pos: usize,
    pub facing: usize,
    pub msg_dir: &'a mut usize,
    pub membrane: &'a mut Membrane,
    pub manager: &'a mut Manager,
}

impl FrameContext<'_> {
    fn sensor(&self) -> Sensor<'_> {
        Sensor::new(&*self.manager, self.pos, self.facing)
    }

    fn send_internal(&mut self, dir: usize, affinity: Tag, payload: &Memory) {
        *self.msg_dir = dir;
        let message = Message {
            kind: MessageKind::Internal,
            affinity,
            payload: payload.clone(),
            from_pos: self.pos,
            from_facing: self.facing,
        };
        self.manager.deliver(self.pos, dir, message);
    }

    fn send_external(&mut self, dir: usize, affinity: Tag, payload: &Memory) {
        *self.msg_dir = dir;
        let neigh = self.manager.neighbor(self.pos, dir);
        if !self.manager.is_live(neigh) {
            trace!(pos = self.pos, dir, "dropping message to dead neighbour");
            return;
        }
        let message = Message {
            kind: MessageKind::External,
            affinity,
            payload: payload.clone(),
            from_pos: self.pos,
            from_facing: self.facing,
        };
        self.manager.deliver(neigh, opposite(dir), message);
    }

    fn send_resource(&mut self, relative: f64, fraction: f64) {
        let dir = rotate(self.facing, relative);
        let neigh = self.manager.neighbor(self.pos, dir);
        if !self.manager.is_live(neigh) {
            return;
        }
        let amount = self
            .manager
            .stockpile_mut(self.pos)
            .request_resource_frac(fraction);
        self.manager
            .stockpile_mut(neigh)
            .external_contribute(amount, opposite(dir));
    }

    fn adjust_reserve(&mut self, relative: f64, sign: f64) {
        let dir = rotate(self.facing, relative);
        let config = self.manager.config();
        let (delta, duration) = (sign * config.rep_thresh / 2.0, config.reserve_duration);
        self.manager
            .controls_mut(self.pos, dir)
            .reserve
            .adjust(delta, duration);
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

impl Host for FrameContext<'_> {
    type Op = FrameOp;

    fn execute(&mut self, op: &FrameOp, ctx: ExecContext<'_, FrameOp>) {
        let [a0, a1, _] = ctx.inst.args;
        let affinity = ctx.inst.affinity;
        let relative = ctx.state.local(a0);
        let dir = rotate(self.facing, relative);

        match *op {
            FrameOp::SendMsgInternal => self.send_internal(dir, affinity, &ctx.state.output),
            FrameOp::BcstMsgInternal => {
                let facing = self.facing;
                for dir in (0..NUM_DIRS).filter(|dir| *dir != facing) {
                    self.send_internal(dir, affinity, &ctx.state.output);
                }
            }
            FrameOp::SendMsgExternal => self.send_external(dir, affinity, &ctx.state.output),
            FrameOp::BcstMsgExternal => {
                for dir in 0..NUM_DIRS {
                    self.send_external(dir, affinity, &ctx.state.output);
                }
            }
            FrameOp::IncrStockpileReserve => self.adjust_reserve(relative, 1.0),
            FrameOp::DecrStockpileReserve => self.adjust_reserve(relative, -1.0),
            FrameOp::PauseRepr(lev) => self.manager.controls_mut(self.pos, dir).pause_repr(lev),
            FrameOp::PauseReprAll => self.manager.controls_mut(self.pos, dir).pause_all(),
            FrameOp::ResumeRepr(lev) => self.manager.controls_mut(self.pos, dir).resume_repr(lev),
            FrameOp::ResumeReprAll => self.manager.controls_mut(self.pos, dir).clear_pauses(),
            FrameOp::ActivateInbox => self.manager.controls_mut(self.pos, dir).inbox_active = true,
            FrameOp::DeactivateInbox => {
                self.manager.controls_mut(self.pos, dir).inbox_active = false;
            }
            FrameOp::SendBigFracResource => self.send_resource(relative, BIG_RESOURCE_FRAC),
            FrameOp::SendSmallFracResource => self.send_resource(relative, SMALL_RESOURCE_FRAC),
            FrameOp::TryReproduce(lev) => {
                try_reproduce(self.manager, self.pos, self.facing, relative, lev, ctx.program);
            }
            FrameOp::IncrCellAge(lev) => self
                .manager
                .channel_mut(self.pos)
                .incr_cell_age(lev, 1.0 + relative),
            FrameOp::DoApoptosisComplete => {
                self.manager.mark_apoptosis(self.pos, Apoptosis::Complete);
            }
            FrameOp::DoApoptosisPartial => {
                self.manager.mark_apoptosis(self.pos, Apoptosis::Partial);
            }
            FrameOp::PutMembraneBringer => {
                let duration = self.manager.config().membrane_bringer_duration;
                self.membrane.register_bringer(affinity, duration);
            }
            FrameOp::PutMembraneBlocker => {
                let duration = self.manager.config().membrane_blocker_duration;
                self.membrane.register_blocker(affinity, duration);
            }
            FrameOp::QueryOwnStockpile => {
                let amount = self.manager.stockpile(self.pos).query_resource();
                ctx.state.set_local(a0, amount);
            }
            FrameOp::QueryChannelGen(lev) => {
                let generation = self.manager.channel(self.pos).generation(lev);
                ctx.state.set_local(a0, generation as f64);
            }
            FrameOp::QueryIsLive => {
                let value = self.sensor().is_live(relative);
                ctx.state.set_local(a1, flag(value));
            }
            FrameOp::QueryIsOccupied => {
                let value = self.sensor().is_occupied(relative);
                ctx.state.set_local(a1, flag(value));
            }
            FrameOp::QueryIsCellChild => {
                let value = self.sensor().is_cell_child(relative);
                ctx.state.set_local(a1, flag(value));
            }
            FrameOp::QueryIsCellParent => {
                let value = self.sensor().is_cell_parent(relative);
                ctx.state.set_local(a1, flag(value));
            }
            FrameOp::QueryFacingChannelMate(lev) => {
                let value = self.sensor().is_channel_mate(lev, relative);
                ctx.state.set_local(a1, flag(value));
            }
            FrameOp::QueryIsPropaguleChild => {
                let value = self.sensor().is_propagule_child(relative);
                ctx.state.set_local(a1, flag(value));
            }
            FrameOp::QueryIsPropaguleParent => {
                let value = self.sensor().is_propagule_parent(relative);
                ctx.state.set_local(a1, flag(value));
            }
            FrameOp::QueryFacingChannel(lev) => match self.sensor().facing_channel(lev, relative) {
                Some(Some(id)) => ctx.state.set_local(a1, id as f64),
                Some(None) => {}
                None => ctx.state.set_local(a1, 0.0),
            },
            FrameOp::QueryFacingStockpile => {
                let amount = self.sensor().facing_stockpile(relative).unwrap_or(0.0);
                ctx.state.set_local(a1, amount);
            }
        }
    }
}
