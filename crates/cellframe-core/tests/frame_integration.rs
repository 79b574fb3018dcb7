use cellframe_core::topology::{DOWN, LEFT, RIGHT, UP};
use cellframe_core::{
    FrameCell, FrameConfig, FrameOp, LevelConfig, Manager, Message, MessageKind, NUM_DIRS,
    Reserve, Sensor, Stockpile, Tick, Trigger, frame_inst_lib, try_reproduce,
};
use cellframe_tags::Tag;
use cellframe_vm::{Function, Memory, Program};
use rand::SeedableRng;
use rand::rngs::SmallRng;

struct Dish {
    manager: Manager,
    cells: Vec<FrameCell>,
}

impl Dish {
    fn new(config: FrameConfig) -> Self {
        let manager = Manager::new(config).expect("manager");
        let mut rng = SmallRng::seed_from_u64(manager.config().seed);
        let cells = (0..manager.len())
            .map(|pos| FrameCell::new(pos, manager.config(), &mut rng).expect("cell"))
            .collect();
        Self { manager, cells }
    }

    fn found(&mut self, pos: usize, program: &Program<FrameOp>, resource: f64) {
        self.manager.found(pos, Tick(0));
        self.manager.stockpile_mut(pos).external_growth(resource);
        self.cells[pos].load_program(&mut self.manager, program);
    }

    /// One orchestrator tick in fixed cell order; returns every fired trigger tag.
    fn tick(&mut self, tick: Tick) -> Vec<Tag> {
        let mut fired = Vec::new();
        for pos in 0..self.cells.len() {
            if !self.manager.is_live(pos) {
                self.cells[pos].settle(&mut self.manager, tick);
                continue;
            }
            self.manager.refund_intake(pos);
            let cell = &mut self.cells[pos];
            for facing in 0..NUM_DIRS {
                fired.extend(cell.frame_mut(facing).advance_environment(&mut self.manager, tick));
            }
            cell.queue_messages(&mut self.manager);
            cell.step_once(&mut self.manager).expect("step");
        }
        fired
    }

    fn ledger(&self) -> f64 {
        self.manager.total_resource() + self.manager.pending_endowment()
    }
}

fn config() -> FrameConfig {
    FrameConfig {
        seed: 42,
        grid_width: 4,
        grid_height: 4,
        env_trig_freq: 1,
        rep_thresh: 8.0,
        levels: vec![LevelConfig { expiration: 5 }, LevelConfig { expiration: 500 }],
        ..FrameConfig::default()
    }
}

fn assemble(body: &[(&str, [usize; 3])]) -> Program<FrameOp> {
    let lib = frame_inst_lib(2);
    let body = body
        .iter()
        .map(|(name, args)| lib.inst(name, *args, Tag::new(0)).expect("known instruction"))
        .collect();
    Program::new(vec![Function::new(Tag::new(0), body)]).expect("program")
}

#[test]
fn resource_is_conserved_across_transfers_and_reproduction() {
    let program = assemble(&[
        ("SetMem", [0, 0, 0]),
        ("SendBigFracResource", [0, 0, 0]),
        ("SetMem", [0, 1, 0]),
        ("SendSmallFracResource", [0, 0, 0]),
        ("SetMem", [0, 2, 0]),
        ("TryReproduce-Lev0", [0, 0, 0]),
        ("Inc", [0, 0, 0]),
        ("TryReproduce-Lev2", [0, 0, 0]),
        ("SendBigFracResource", [0, 0, 0]),
    ]);
    let mut dish = Dish::new(config());
    dish.found(0, &program, 40.0);
    dish.found(5, &program, 25.0);
    dish.found(10, &program, 13.0);

    let before = dish.ledger();
    let mut tick = Tick::zero();
    for _ in 0..60 {
        dish.tick(tick);
        let now = dish.ledger();
        assert!((now - before).abs() < 1e-9, "ledger drifted: {before} -> {now}");
        tick = tick.next();
    }
    assert!(dish.manager.live_count() > 3, "reproduction happened");
}

#[test]
fn reserve_clears_exactly_after_its_duration() {
    for (amount, duration) in [(3.0, 1), (7.5, 4), (-2.0, 3), (0.25, 9)] {
        let mut reserve = Reserve::default();
        reserve.set(amount, duration);
        for _ in 0..duration - 1 {
            reserve.try_clear();
        }
        assert_eq!(reserve.amount(), f64::max(0.0, amount));
        reserve.try_clear();
        assert_eq!(reserve.amount(), 0.0);
    }
}

#[test]
fn oversized_request_drains_to_zero() {
    let mut stockpile = Stockpile::new(2);
    stockpile.external_growth(100.0);
    assert_eq!(stockpile.request_resource_amt(150.0), 100.0);
    assert_eq!(stockpile.query_resource(), 0.0);
}

#[test]
fn membrane_parity_gates_external_messages() {
    let mut dish = Dish::new(config());
    let sender = assemble(&[("SetMem", [0, 0, 0]), ("SendMsgExternal", [0, 0, 0])]);
    let idle = assemble(&[("Nop", [0; 3])]);
    dish.found(5, &sender, 0.0);
    dish.found(6, &idle, 0.0);

    // 6 receives from 5 on its LEFT-facing frame
    let odd = Tag::new(0);
    dish.cells[6]
        .frame_mut(LEFT)
        .membrane_mut()
        .register_bringer(odd, 10);
    let frame = dish.cells[5].frame_mut(RIGHT);
    frame.advance_environment(&mut dish.manager, Tick(0));
    frame.step_once(&mut dish.manager).expect("step");
    frame.step_once(&mut dish.manager).expect("step");
    let inbound = dish.manager.inbox(6, LEFT).len();
    assert!(inbound > 0);
    assert!(
        dish.manager
            .inbox(6, LEFT)
            .iter()
            .all(|message| message.kind == MessageKind::External && message.from_pos == 5)
    );
    dish.cells[6].frame_mut(LEFT).queue_messages(&mut dish.manager);
    assert_eq!(dish.cells[6].frame(LEFT).cpu().queued_events(), inbound);

    // flip to an even multiplicity and the same traffic is refused
    dish.cells[6]
        .frame_mut(LEFT)
        .membrane_mut()
        .register_blocker(odd, 10);
    dish.manager.deliver(
        6,
        LEFT,
        Message {
            kind: MessageKind::External,
            affinity: odd,
            payload: Memory::new(),
            from_pos: 5,
            from_facing: RIGHT,
        },
    );
    dish.cells[6].frame_mut(LEFT).queue_messages(&mut dish.manager);
    assert_eq!(dish.cells[6].frame(LEFT).cpu().queued_events(), inbound);
}

#[test]
fn messages_to_dead_neighbours_are_dropped() {
    let mut dish = Dish::new(config());
    let sender = assemble(&[("BcstMsgExternal", [0; 3])]);
    dish.found(5, &sender, 0.0);
    let frame = dish.cells[5].frame_mut(UP);
    frame.advance_environment(&mut dish.manager, Tick(0));
    frame.step_once(&mut dish.manager).expect("step");
    for pos in [1, 4, 6, 9] {
        for facing in 0..NUM_DIRS {
            assert!(dish.manager.inbox(pos, facing).is_empty());
        }
    }
}

#[test]
fn expired_level_reproduces_one_level_up_with_single_debit() {
    let mut dish = Dish::new(config());
    let program = assemble(&[("Nop", [0; 3])]);
    dish.found(5, &program, 20.0);
    dish.manager.channel_mut(5).incr_cell_age(0, 9.0);

    let level = try_reproduce(&mut dish.manager, 5, RIGHT, 0.0, 0, &program);
    assert_eq!(level, Some(1));
    assert_eq!(dish.manager.stockpile(5).query_resource(), 12.0);
    assert_eq!(dish.manager.intake(6).len(), 1);
    assert_eq!(dish.manager.intake(6).peek().expect("sire").record.level, 1);

    assert!(dish.cells[6].settle(&mut dish.manager, Tick(1)));
    let parent = dish.manager.channel(5).clone();
    let child = dish.manager.channel(6);
    assert_ne!(child.id(0), parent.id(0));
    assert_eq!(child.generation(0), 0);
    assert_eq!(child.id(1), parent.id(1));
    assert_eq!(child.generation(1), parent.generation(1) + 1);
    assert_eq!(dish.manager.stockpile(6).query_resource(), 8.0);
    assert!(dish.cells[6].has_program());
}

#[test]
fn propagule_relations_are_seen_from_both_sides() {
    let mut dish = Dish::new(config());
    let program = assemble(&[("Nop", [0; 3])]);
    dish.found(5, &program, 20.0);

    assert_eq!(
        try_reproduce(&mut dish.manager, 5, RIGHT, 0.0, 2, &program),
        Some(2)
    );
    dish.cells[6].settle(&mut dish.manager, Tick(3));
    assert_eq!(
        dish.manager.family(6).prev_chan(),
        dish.manager.channel(5).id(1)
    );

    let parent_view = Sensor::new(&dish.manager, 5, RIGHT);
    let child_view = Sensor::new(&dish.manager, 6, LEFT);
    assert!(parent_view.is_propagule_parent(0.0));
    assert!(!parent_view.is_propagule_child(0.0));
    assert!(child_view.is_propagule_child(0.0));
    assert!(!child_view.is_propagule_parent(0.0));
    assert!(parent_view.is_cell_parent(0.0));
    assert!(child_view.is_cell_child(0.0));
    assert!(!parent_view.is_channel_mate(1, 0.0));

    let fired = dish.cells[6]
        .frame_mut(LEFT)
        .advance_environment(&mut dish.manager, Tick(4));
    let tags = dish.manager.trigger_tags();
    assert!(fired.contains(&tags.pro(Trigger::PropaguleChild)));
    assert!(fired.contains(&tags.pro(Trigger::CellChild)));
    assert!(!fired.contains(&tags.pro(Trigger::JustBorn)));
}

#[test]
fn trigger_firing_is_reproducible_for_a_seed() {
    let program = assemble(&[
        ("Rng", [0, 0, 0]),
        ("SendSmallFracResource", [0, 0, 0]),
        ("TryReproduce-Lev0", [0, 0, 0]),
    ]);
    let run = |seed: u64| {
        let mut dish = Dish::new(FrameConfig {
            seed,
            stochastic_trigger_freq: 0.5,
            ..config()
        });
        dish.found(0, &program, 30.0);
        dish.found(10, &program, 30.0);
        let mut tick = Tick::zero();
        let mut history = Vec::new();
        for _ in 0..20 {
            history.push(dish.tick(tick));
            tick = tick.next();
        }
        history
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn sensor_instructions_write_local_memory() {
    let mut dish = Dish::new(config());
    let program = assemble(&[
        ("SetMem", [0, 0, 0]),
        ("QueryFacingStockpile", [0, 1, 0]),
        ("QueryIsLive", [0, 2, 0]),
        ("QueryOwnStockpile", [3, 0, 0]),
        ("SetMem", [0, 1, 0]),
        ("QueryIsLive", [0, 4, 0]),
    ]);
    let idle = assemble(&[("Nop", [0; 3])]);
    dish.found(5, &program, 11.0);
    dish.found(6, &idle, 7.0);

    let frame = dish.cells[5].frame_mut(RIGHT);
    frame.advance_environment(&mut dish.manager, Tick(0));
    for _ in 0..6 {
        frame.step_once(&mut dish.manager).expect("step");
    }
    let thread = frame.cpu().threads().next().expect("thread");
    assert_eq!(thread.local(1), 7.0);
    assert_eq!(thread.local(2), 1.0);
    assert_eq!(thread.local(3), 11.0);
    // relative 1 from RIGHT is DOWN, where nothing lives
    assert_eq!(thread.local(4), 0.0);
    assert_eq!(frame.calc_dir(1.0), DOWN);
}

#[test]
fn resource_sends_skip_dead_neighbours() {
    let mut dish = Dish::new(config());
    let program = assemble(&[("SendBigFracResource", [0, 0, 0])]);
    dish.found(5, &program, 10.0);
    let frame = dish.cells[5].frame_mut(RIGHT);
    frame.advance_environment(&mut dish.manager, Tick(0));
    frame.step_once(&mut dish.manager).expect("step");
    assert_eq!(dish.manager.stockpile(5).query_resource(), 10.0);
    assert_eq!(dish.manager.stockpile(6).query_resource(), 0.0);
}
