use anyhow::Result;
use cellframe_core::{Apoptosis, FrameCell, FrameConfig, FrameOp, Manager, NUM_DIRS, Tick};
use cellframe_vm::Program;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::debug;

/// Per-tick population counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSummary {
    pub tick: Tick,
    pub live: usize,
    pub births: usize,
    pub deaths: usize,
    /// Sires sent back because their target tile was occupied.
    pub refunds: usize,
    pub resource: f64,
    pub pending: f64,
}

/// Minimal orchestrator: a grid of facing sets driven in row-major order.
pub struct Dish {
    manager: Manager,
    cells: Vec<FrameCell>,
    tick: Tick,
}

impl Dish {
    pub fn new(config: FrameConfig) -> Result<Self> {
        let manager = Manager::new(config)?;
        let mut rng = SmallRng::seed_from_u64(manager.config().seed.wrapping_add(2));
        let cells = (0..manager.len())
            .map(|pos| FrameCell::new(pos, manager.config(), &mut rng))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            manager,
            cells,
            tick: Tick::zero(),
        })
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Place a founder at `pos` with `resource` drawn from outside the dish.
    pub fn seed(&mut self, pos: usize, program: &Program<FrameOp>, resource: f64) {
        self.manager.found(pos, self.tick);
        self.manager.stockpile_mut(pos).external_growth(resource);
        self.cells[pos].load_program(&mut self.manager, program);
    }

    pub fn step(&mut self) -> Result<TickSummary> {
        let tick = self.tick;
        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };

        // occupied tiles turn their sires away; free tiles settle the first one
        for cell in &mut self.cells {
            let pos = cell.pos();
            if self.manager.is_live(pos) {
                summary.refunds += self.manager.refund_intake(pos);
            } else if cell.settle(&mut self.manager, tick) {
                summary.births += 1;
            }
        }

        for cell in &mut self.cells {
            let pos = cell.pos();
            if !self.manager.is_live(pos) {
                continue;
            }
            for facing in 0..NUM_DIRS {
                cell.frame_mut(facing)
                    .advance_environment(&mut self.manager, tick);
            }
            cell.queue_messages(&mut self.manager);
            cell.step_once(&mut self.manager)?;
        }

        for cell in &mut self.cells {
            let pos = cell.pos();
            if self.manager.apply_apoptosis(pos) != Apoptosis::None {
                cell.reset(&mut self.manager);
                summary.deaths += 1;
                debug!(pos, tick = tick.0, "occupant removed");
            }
            self.manager.channel_mut(pos).advance_ages(1);
        }

        summary.live = self.manager.live_count();
        summary.resource = self.manager.total_resource();
        summary.pending = self.manager.pending_endowment();
        self.tick = tick.next();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellframe_core::frame_inst_lib;
    use cellframe_tags::Tag;
    use cellframe_vm::Function;

    fn program(body: &[(&str, [usize; 3])]) -> Program<FrameOp> {
        let lib = frame_inst_lib(2);
        let body = body
            .iter()
            .map(|(name, args)| lib.inst(name, *args, Tag::new(0)).expect("instruction"))
            .collect();
        Program::new(vec![Function::new(Tag::new(0), body)]).expect("program")
    }

    fn config() -> FrameConfig {
        FrameConfig {
            grid_width: 6,
            grid_height: 6,
            env_trig_freq: 1,
            ..FrameConfig::default()
        }
    }

    #[test]
    fn offspring_settle_on_the_following_tick() {
        let mut dish = Dish::new(config()).expect("dish");
        dish.seed(14, &program(&[("TryReproduce-Lev0", [0, 0, 0])]), 100.0);
        let first = dish.step().expect("step");
        assert_eq!(first.births, 0);
        assert!(first.pending > 0.0);
        let second = dish.step().expect("step");
        assert!(second.births > 0);
        assert_eq!(second.live, 1 + second.births);
        assert!((second.resource + second.pending - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sires_aimed_at_occupied_tiles_are_refunded() {
        let mut dish = Dish::new(config()).expect("dish");
        let idle = program(&[("Nop", [0; 3])]);
        for pos in [8, 13, 15, 20] {
            dish.seed(pos, &idle, 0.0);
        }
        dish.seed(14, &program(&[("TryReproduce-Lev0", [0, 0, 0])]), 1000.0);

        let mut refunds = 0;
        for _ in 0..20 {
            let summary = dish.step().expect("step");
            assert_eq!(summary.births, 0);
            assert_eq!(summary.live, 5);
            assert!((summary.resource + summary.pending - 1000.0).abs() < 1e-9);
            refunds += summary.refunds;
        }
        assert!(refunds > 0);

        // nothing new is queued once the reproducer goes quiet
        dish.cells[14].load_program(&mut dish.manager, &idle);
        let summary = dish.step().expect("step");
        assert_eq!(summary.pending, 0.0);
        for pos in [8, 13, 15, 20] {
            assert!(dish.manager().intake(pos).is_empty());
        }
        assert!((dish.manager().stockpile(14).query_resource() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn apoptosis_frees_the_tile() {
        let mut dish = Dish::new(config()).expect("dish");
        dish.seed(3, &program(&[("DoApoptosisComplete", [0; 3])]), 5.0);
        let summary = dish.step().expect("step");
        assert_eq!(summary.deaths, 1);
        assert_eq!(summary.live, 0);
        assert_eq!(dish.manager().stockpile(3).query_resource(), 5.0);
        assert!(dish.manager().channel(3).ids().is_none());
    }

    #[test]
    fn ticks_advance_and_ages_grow() {
        let mut dish = Dish::new(config()).expect("dish");
        dish.seed(0, &program(&[("Nop", [0; 3])]), 1.0);
        for _ in 0..3 {
            dish.step().expect("step");
        }
        assert_eq!(dish.tick(), Tick(3));
        assert_eq!(dish.manager().channel(0).age(0), 3);
    }
}
