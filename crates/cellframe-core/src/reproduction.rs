use cellframe_vm::Program;
use tracing::debug;

use crate::Manager;
use crate::library::FrameOp;
use crate::sire::{Sire, SireRecord};
use crate::topology::rotate;

/// Attempt reproduction from frame (`pos`, `facing`) toward `relative_dir`,
/// starting at `level`.
///
/// Aborts when the level is paused or the balance cannot cover the threshold
/// plus the frame reserve. An expired channel at `level` falls through to the
/// next level; level `nlev` never expires. On success the threshold is debited
/// once and a sire is queued at the target tile. Returns the level used.
pub fn try_reproduce(
    manager: &mut Manager,
    pos: usize,
    facing: usize,
    relative_dir: f64,
    level: usize,
    program: &Program<FrameOp>,
) -> Option<usize> {
    let nlev = manager.config().nlev;
    let rep_thresh = manager.config().rep_thresh;
    let mut level = level;

    loop {
        if level > nlev {
            return None;
        }
        let controls = manager.controls(pos, facing);
        if controls.is_repr_paused(level)
            || rep_thresh + controls.reserve.amount() > manager.stockpile(pos).query_resource()
        {
            return None;
        }
        if !manager.channel(pos).is_expired(level) {
            break;
        }
        level += 1;
    }

    let endowment = manager.stockpile_mut(pos).request_resource_amt(rep_thresh);
    let dir = rotate(facing, relative_dir);
    let target = manager.neighbor(pos, dir);
    let channel = manager.channel(pos);
    let prev_chan = if level < nlev {
        manager.family(pos).prev_chan()
    } else {
        channel.id(nlev - 1)
    };
    let record = SireRecord {
        source_pos: pos,
        dir,
        level,
        generations: channel.generations().to_vec(),
        ids: channel.ids().map(<[_]>::to_vec).unwrap_or_default(),
        ages: channel.ages().to_vec(),
        prev_chan,
    };
    debug!(pos, target, level, endowment, "reproduction queued");
    manager.intake_mut(target).push(Sire {
        record,
        program: program.clone(),
        endowment,
    });
    Some(level)
}
