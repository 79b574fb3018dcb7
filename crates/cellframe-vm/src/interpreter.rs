use cellframe_tags::{AffinityRegistry, Tag};
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

use crate::state::read;
use crate::{
    Block, BlockKind, CallState, ExecContext, Extension, Host, Instruction, Memory, Op, Program,
};

/// Thread call stack; an empty stack is a dead thread.
type Core = Vec<CallState>;

/// Queued stimulus: spawns a thread at the function best matching `affinity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub affinity: Tag,
    pub msg: Memory,
}

impl Event {
    #[must_use]
    pub const fn new(affinity: Tag, msg: Memory) -> Self {
        Self { affinity, msg }
    }
}

/// Resource caps consulted by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareLimits {
    /// Maximum concurrently active threads; spawns beyond this are dropped.
    pub max_cores: usize,
    /// Maximum call stack depth per thread.
    pub max_call_depth: usize,
    /// Minimum similarity for function dispatch.
    pub affinity_threshold: f64,
    /// Countdown applied when a program adjusts a regulator.
    pub regulator_duration: u32,
}

impl Default for HardwareLimits {
    fn default() -> Self {
        Self {
            max_cores: 24,
            max_call_depth: 128,
            affinity_threshold: 0.5,
            regulator_duration: 4,
        }
    }
}

/// Event-driven multi-threaded interpreter.
#[derive(Debug, Clone)]
pub struct Interpreter<X> {
    program: Program<X>,
    matcher: AffinityRegistry<usize>,
    shared: Memory,
    cores: Vec<Core>,
    pending: Vec<Core>,
    events: VecDeque<Event>,
    rng: SmallRng,
    limits: HardwareLimits,
}

impl<X: Extension> Interpreter<X> {
    #[must_use]
    pub fn new(rng: SmallRng, limits: HardwareLimits) -> Self {
        Self {
            program: Program::default(),
            matcher: AffinityRegistry::new(limits.affinity_threshold),
            shared: Memory::new(),
            cores: Vec::new(),
            pending: Vec::new(),
            events: VecDeque::new(),
            rng,
            limits,
        }
    }

    #[must_use]
    pub const fn limits(&self) -> HardwareLimits {
        self.limits
    }

    /// Load a program and index its functions by affinity.
    pub fn set_program(&mut self, program: Program<X>) {
        self.matcher.clear();
        for (idx, function) in program.functions().iter().enumerate() {
            self.matcher.insert(function.affinity, idx);
        }
        self.program = program;
    }

    #[must_use]
    pub fn program(&self) -> &Program<X> {
        &self.program
    }

    #[must_use]
    pub fn has_program(&self) -> bool {
        !self.program.is_empty()
    }

    /// Drop all threads, queued events and shared memory; regulators return to neutral.
    pub fn reset_hardware(&mut self) {
        self.cores.clear();
        self.pending.clear();
        self.events.clear();
        self.shared.clear();
        self.matcher.reset_regulators();
    }

    /// Unload the program.
    pub fn reset_program(&mut self) {
        self.program = Program::default();
        self.matcher.clear();
    }

    /// Function dispatch registry (values are function indices).
    #[must_use]
    pub fn matcher(&self) -> &AffinityRegistry<usize> {
        &self.matcher
    }

    #[must_use]
    pub fn matcher_mut(&mut self) -> &mut AffinityRegistry<usize> {
        &mut self.matcher
    }

    /// Copy the current regulation state onto another registry, keyed by tag.
    pub fn imprint_regulators<W>(&self, target: &mut AffinityRegistry<W>) {
        self.matcher.imprint_regulators(target);
    }

    #[must_use]
    pub fn shared(&self) -> &Memory {
        &self.shared
    }

    #[must_use]
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    /// Innermost call frame of every live thread.
    pub fn threads(&self) -> impl Iterator<Item = &CallState> + '_ {
        self.cores.iter().filter_map(|core| core.last())
    }

    #[must_use]
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Spawn a thread for `affinity` immediately. Returns false when nothing matched or
    /// every core is busy.
    pub fn trigger(&mut self, affinity: Tag, msg: Memory) -> bool {
        let Some(func) = self.resolve(affinity) else {
            return false;
        };
        if self.cores.len() + self.pending.len() >= self.limits.max_cores {
            trace!(%affinity, "no free core; dropping trigger");
            return false;
        }
        self.cores.push(vec![CallState::new(func, msg)]);
        true
    }

    /// Queue an event for handling at the start of the next [`Self::single_process`].
    pub fn queue_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Handle queued events, then advance every live thread by one instruction.
    pub fn single_process<H>(&mut self, host: &mut H)
    where
        H: Host<Op = X>,
    {
        while let Some(event) = self.events.pop_front() {
            self.trigger(event.affinity, event.msg);
        }

        let Self {
            program,
            matcher,
            shared,
            cores,
            pending,
            rng,
            limits,
            ..
        } = self;
        let mut machine = Machine {
            program,
            matcher,
            shared,
            pending,
            rng,
            limits: *limits,
            live_cores: cores.len(),
        };
        for core in cores.iter_mut() {
            machine.step(core, host);
        }

        cores.retain(|core| !core.is_empty());
        let room = limits.max_cores.saturating_sub(cores.len());
        cores.extend(pending.drain(..).take(room));
    }

    fn resolve(&self, affinity: Tag) -> Option<usize> {
        let uid = self.matcher.match_best(affinity)?;
        self.matcher.get(uid).copied()
    }
}

struct Machine<'a, X> {
    program: &'a Program<X>,
    matcher: &'a mut AffinityRegistry<usize>,
    shared: &'a mut Memory,
    pending: &'a mut Vec<Core>,
    rng: &'a mut SmallRng,
    limits: HardwareLimits,
    live_cores: usize,
}

impl<'a, X: Extension> Machine<'a, X> {
    fn step<H>(&mut self, core: &mut Core, host: &mut H)
    where
        H: Host<Op = X>,
    {
        let program: &'a Program<X> = self.program;
        let Some(state) = core.last_mut() else {
            return;
        };
        let Some(function) = program.function(state.func_ptr) else {
            core.clear();
            return;
        };
        let body = function.body.as_slice();
        if state.inst_ptr >= body.len() {
            if state.blocks.is_empty() {
                return_function(core);
            } else {
                close_block(state);
            }
            return;
        }
        let inst = &body[state.inst_ptr];
        state.inst_ptr += 1;
        self.execute(inst, body, core, host);
    }

    fn execute<H>(&mut self, inst: &Instruction<X>, body: &[Instruction<X>], core: &mut Core, host: &mut H)
    where
        H: Host<Op = X>,
    {
        match &inst.op {
            Op::Call => return self.call(core, inst.affinity),
            Op::Return => return return_function(core),
            Op::Terminate => return core.clear(),
            Op::Fork => return self.fork(core, inst.affinity),
            _ => {}
        }

        let Some(state) = core.last_mut() else {
            return;
        };
        let [a0, a1, a2] = inst.args;
        match &inst.op {
            Op::Inc => state.set_local(a0, state.local(a0) + 1.0),
            Op::Dec => state.set_local(a0, state.local(a0) - 1.0),
            Op::Not => state.set_local(a0, flag(state.local(a0) == 0.0)),
            Op::Add => state.set_local(a2, state.local(a0) + state.local(a1)),
            Op::Sub => state.set_local(a2, state.local(a0) - state.local(a1)),
            Op::Mult => state.set_local(a2, state.local(a0) * state.local(a1)),
            Op::Div => {
                let denom = state.local(a1);
                if denom != 0.0 {
                    state.set_local(a2, state.local(a0) / denom);
                }
            }
            Op::Mod => {
                let num = state.local(a0) as i64;
                let denom = state.local(a1) as i64;
                if let Some(value) = num.checked_rem_euclid(denom) {
                    state.set_local(a2, value as f64);
                }
            }
            Op::TestEqu => state.set_local(a2, flag(state.local(a0) == state.local(a1))),
            Op::TestNEqu => state.set_local(a2, flag(state.local(a0) != state.local(a1))),
            Op::TestLess => state.set_local(a2, flag(state.local(a0) < state.local(a1))),
            Op::If => {
                let enter = state.local(a0) != 0.0;
                open_block(state, body, BlockKind::Basic, enter);
            }
            Op::While => {
                let enter = state.local(a0) != 0.0;
                open_block(state, body, BlockKind::Loop, enter);
            }
            Op::Countdown => {
                let remaining = state.local(a0);
                let enter = remaining != 0.0;
                if enter {
                    state.set_local(a0, remaining - 1.0);
                }
                open_block(state, body, BlockKind::Loop, enter);
            }
            Op::Close => {
                if !state.blocks.is_empty() {
                    close_block(state);
                }
            }
            Op::Break => {
                if let Some(block) = state.blocks.pop() {
                    state.inst_ptr = (block.end + 1).min(body.len());
                }
            }
            Op::SetMem => state.set_local(a0, a1 as f64),
            Op::CopyMem => state.set_local(a0, state.local(a1)),
            Op::SwapMem => {
                let (first, second) = (state.local(a0), state.local(a1));
                state.set_local(a0, second);
                state.set_local(a1, first);
            }
            Op::Input => state.set_local(a1, state.input(a0)),
            Op::Output => state.set_output(a1, state.local(a0)),
            Op::Commit => {
                self.shared.insert(a1, state.local(a0));
            }
            Op::Pull => state.set_local(a1, read(self.shared, a0)),
            Op::Nop => {}
            Op::Rng => state.set_local(a0, self.rng.random::<f64>()),
            Op::AdjRegulator => {
                if let Some(uid) = self.matcher.match_best(inst.affinity) {
                    self.matcher
                        .adj_regulator(uid, state.local(a0), self.limits.regulator_duration);
                }
            }
            Op::SetRegulator => {
                if let Some(uid) = self.matcher.match_best(inst.affinity) {
                    self.matcher
                        .set_regulator(uid, state.local(a0), self.limits.regulator_duration);
                }
            }
            Op::SenseRegulator => {
                let value = self
                    .matcher
                    .match_best(inst.affinity)
                    .and_then(|uid| self.matcher.regulator(uid))
                    .map_or(0.0, |regulator| regulator.value());
                state.set_local(a0, value);
            }
            Op::Ext(ext) => host.execute(
                ext,
                ExecContext {
                    inst,
                    state,
                    shared: &mut *self.shared,
                    program: self.program,
                    rng: &mut *self.rng,
                },
            ),
            Op::Call | Op::Return | Op::Terminate | Op::Fork => {}
        }
    }

    fn resolve(&self, affinity: Tag) -> Option<usize> {
        let uid = self.matcher.match_best(affinity)?;
        self.matcher.get(uid).copied()
    }

    fn call(&mut self, core: &mut Core, affinity: Tag) {
        if core.len() >= self.limits.max_call_depth {
            return;
        }
        let Some(func) = self.resolve(affinity) else {
            return;
        };
        let Some(caller) = core.last() else {
            return;
        };
        let input = caller.local.clone();
        core.push(CallState::new(func, input));
    }

    fn fork(&mut self, core: &mut Core, affinity: Tag) {
        if self.live_cores + self.pending.len() >= self.limits.max_cores {
            return;
        }
        let Some(func) = self.resolve(affinity) else {
            return;
        };
        let Some(parent) = core.last() else {
            return;
        };
        self.pending
            .push(vec![CallState::new(func, parent.local.clone())]);
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Index of the `Close` matching a block opened just before `start`, or the body length.
fn find_end_of_block<X>(body: &[Instruction<X>], start: usize) -> usize {
    let mut depth = 0usize;
    for (idx, inst) in body.iter().enumerate().skip(start) {
        if inst.op.opens_block() {
            depth += 1;
        } else if matches!(inst.op, Op::Close) {
            if depth == 0 {
                return idx;
            }
            depth -= 1;
        }
    }
    body.len()
}

fn open_block<X>(state: &mut CallState, body: &[Instruction<X>], kind: BlockKind, enter: bool) {
    let begin = state.inst_ptr.saturating_sub(1);
    let end = find_end_of_block(body, state.inst_ptr);
    if enter {
        state.blocks.push(Block { begin, end, kind });
    } else {
        state.inst_ptr = (end + 1).min(body.len());
    }
}

fn close_block(state: &mut CallState) {
    if let Some(block) = state.blocks.pop() {
        if block.kind == BlockKind::Loop {
            state.inst_ptr = block.begin;
        }
    }
}

fn return_function(core: &mut Core) {
    let Some(finished) = core.pop() else {
        return;
    };
    if let Some(caller) = core.last_mut() {
        for (addr, value) in finished.output {
            caller.set_local(addr, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Function;
    use rand::SeedableRng;
    use std::borrow::Cow;

    #[derive(Debug, Clone, PartialEq)]
    enum TapOp {
        Record,
    }

    impl Extension for TapOp {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed("Record")
        }

        fn arity(&self) -> usize {
            1
        }

        fn description(&self) -> &'static str {
            "Record local memory Arg1 on the host."
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        seen: Vec<f64>,
    }

    impl Host for Recorder {
        type Op = TapOp;

        fn execute(&mut self, op: &TapOp, ctx: ExecContext<'_, TapOp>) {
            match op {
                TapOp::Record => self.seen.push(ctx.state.local(ctx.inst.args[0])),
            }
        }
    }

    fn inst(op: Op<TapOp>, args: [usize; 3]) -> Instruction<TapOp> {
        Instruction::new(op, args, Tag::new(0))
    }

    fn tagged(op: Op<TapOp>, affinity: Tag) -> Instruction<TapOp> {
        Instruction::new(op, [0; 3], affinity)
    }

    fn record(addr: usize) -> Instruction<TapOp> {
        inst(Op::Ext(TapOp::Record), [addr, 0, 0])
    }

    fn interpreter(functions: Vec<Function<TapOp>>, limits: HardwareLimits) -> Interpreter<TapOp> {
        let mut cpu = Interpreter::new(SmallRng::seed_from_u64(0xC0FFEE), limits);
        cpu.set_program(Program::new(functions).expect("program"));
        cpu
    }

    fn loose_limits() -> HardwareLimits {
        HardwareLimits {
            affinity_threshold: 0.0,
            ..HardwareLimits::default()
        }
    }

    fn run(cpu: &mut Interpreter<TapOp>, host: &mut Recorder, steps: usize) {
        for _ in 0..steps {
            cpu.single_process(host);
        }
    }

    #[test]
    fn trigger_without_program_spawns_nothing() {
        let mut cpu: Interpreter<TapOp> =
            Interpreter::new(SmallRng::seed_from_u64(1), HardwareLimits::default());
        assert!(!cpu.has_program());
        assert!(!cpu.trigger(Tag::new(5), Memory::new()));
        assert_eq!(cpu.core_count(), 0);
    }

    #[test]
    fn trigger_dispatches_to_best_matching_function() {
        let mut cpu = interpreter(
            vec![
                Function::new(Tag::new(0b0000), vec![inst(Op::SetMem, [0, 1, 0]), record(0)]),
                Function::new(Tag::new(0b1111), vec![inst(Op::SetMem, [0, 2, 0]), record(0)]),
            ],
            loose_limits(),
        );
        let mut host = Recorder::default();
        assert!(cpu.trigger(Tag::new(0b1110), Memory::new()));
        run(&mut cpu, &mut host, 2);
        assert_eq!(host.seen, vec![2.0]);
        assert_eq!(cpu.core_count(), 1);
        run(&mut cpu, &mut host, 1);
        assert_eq!(cpu.core_count(), 0, "thread returns past the end of its function");
    }

    #[test]
    fn while_loop_runs_until_zero() {
        let mut cpu = interpreter(
            vec![Function::new(
                Tag::new(0),
                vec![
                    inst(Op::SetMem, [0, 3, 0]),
                    inst(Op::While, [0, 0, 0]),
                    record(0),
                    inst(Op::Dec, [0, 0, 0]),
                    inst(Op::Close, [0; 3]),
                    record(0),
                ],
            )],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(Tag::new(0), Memory::new());
        run(&mut cpu, &mut host, 40);
        assert_eq!(host.seen, vec![3.0, 2.0, 1.0, 0.0]);
        assert_eq!(cpu.core_count(), 0);
    }

    #[test]
    fn countdown_and_break_leave_the_block() {
        let mut cpu = interpreter(
            vec![Function::new(
                Tag::new(0),
                vec![
                    inst(Op::SetMem, [0, 5, 0]),
                    inst(Op::Countdown, [0, 0, 0]),
                    record(0),
                    inst(Op::Break, [0; 3]),
                    inst(Op::Close, [0; 3]),
                    inst(Op::SetMem, [1, 9, 0]),
                    record(1),
                ],
            )],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(Tag::new(0), Memory::new());
        run(&mut cpu, &mut host, 20);
        assert_eq!(host.seen, vec![4.0, 9.0]);
    }

    #[test]
    fn false_if_skips_its_block() {
        let mut cpu = interpreter(
            vec![Function::new(
                Tag::new(0),
                vec![
                    inst(Op::If, [0, 0, 0]),
                    record(0),
                    inst(Op::Close, [0; 3]),
                    inst(Op::SetMem, [1, 5, 0]),
                    record(1),
                ],
            )],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(Tag::new(0), Memory::new());
        run(&mut cpu, &mut host, 10);
        assert_eq!(host.seen, vec![5.0]);
    }

    #[test]
    fn call_returns_outputs_into_caller_locals() {
        let main = Tag::new(0);
        let helper = main.toggled();
        let mut cpu = interpreter(
            vec![
                Function::new(
                    main,
                    vec![
                        inst(Op::SetMem, [0, 4, 0]),
                        tagged(Op::Call, helper),
                        record(1),
                    ],
                ),
                Function::new(
                    helper,
                    vec![
                        inst(Op::Input, [0, 0, 0]),
                        inst(Op::Mult, [0, 0, 2]),
                        inst(Op::Output, [2, 1, 0]),
                        inst(Op::Return, [0; 3]),
                    ],
                ),
            ],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(main, Memory::new());
        run(&mut cpu, &mut host, 10);
        assert_eq!(host.seen, vec![16.0]);
    }

    #[test]
    fn fork_never_exceeds_max_cores() {
        let tag = Tag::new(0);
        let limits = HardwareLimits {
            max_cores: 2,
            ..loose_limits()
        };
        let mut cpu = interpreter(
            vec![Function::new(
                tag,
                vec![
                    tagged(Op::Fork, tag),
                    tagged(Op::Fork, tag),
                    tagged(Op::Fork, tag),
                    inst(Op::Nop, [0; 3]),
                    inst(Op::Nop, [0; 3]),
                ],
            )],
            limits,
        );
        let mut host = Recorder::default();
        assert!(cpu.trigger(tag, Memory::new()));
        run(&mut cpu, &mut host, 1);
        assert_eq!(cpu.core_count(), 2);
        assert!(!cpu.trigger(tag, Memory::new()));
        run(&mut cpu, &mut host, 3);
        assert!(cpu.core_count() <= 2);
    }

    #[test]
    fn queued_events_spawn_on_next_process() {
        let mut cpu = interpreter(
            vec![Function::new(
                Tag::new(0),
                vec![inst(Op::Input, [0, 1, 0]), record(1)],
            )],
            loose_limits(),
        );
        let mut host = Recorder::default();
        let msg = Memory::from([(0, 9.0)]);
        cpu.queue_event(Event::new(Tag::new(0), msg));
        assert_eq!(cpu.core_count(), 0);
        assert_eq!(cpu.queued_events(), 1);
        run(&mut cpu, &mut host, 2);
        assert_eq!(host.seen, vec![9.0]);
        assert_eq!(cpu.queued_events(), 0);
    }

    #[test]
    fn regulator_instructions_shift_dispatch() {
        let controller = Tag::new(0b0001);
        let fallback = Tag::new(0b0011);
        let mut cpu = interpreter(
            vec![
                Function::new(
                    controller,
                    vec![
                        inst(Op::SetMem, [0, 1, 0]),
                        tagged(Op::AdjRegulator, controller),
                        record(0),
                    ],
                ),
                Function::new(fallback, vec![inst(Op::SetMem, [0, 7, 0]), record(0)]),
            ],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(Tag::new(0), Memory::new());
        run(&mut cpu, &mut host, 4);
        assert_eq!(host.seen, vec![1.0]);

        let uid = cpu.matcher().find_tag(controller).expect("controller");
        assert_eq!(cpu.matcher().regulator(uid).expect("regulator").value(), 1.0);

        cpu.trigger(Tag::new(0), Memory::new());
        run(&mut cpu, &mut host, 3);
        assert_eq!(host.seen, vec![1.0, 7.0]);
    }

    #[test]
    fn terminate_kills_the_thread() {
        let mut cpu = interpreter(
            vec![Function::new(
                Tag::new(0),
                vec![inst(Op::Terminate, [0; 3]), record(0)],
            )],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(Tag::new(0), Memory::new());
        run(&mut cpu, &mut host, 3);
        assert!(host.seen.is_empty());
        assert_eq!(cpu.core_count(), 0);
    }

    #[test]
    fn division_and_modulo_by_zero_are_ignored() {
        let mut cpu = interpreter(
            vec![Function::new(
                Tag::new(0),
                vec![
                    inst(Op::SetMem, [0, 5, 0]),
                    inst(Op::Div, [0, 1, 2]),
                    inst(Op::Mod, [0, 1, 3]),
                    record(2),
                    record(3),
                ],
            )],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(Tag::new(0), Memory::new());
        run(&mut cpu, &mut host, 6);
        assert_eq!(host.seen, vec![0.0, 0.0]);
    }

    #[test]
    fn shared_memory_is_visible_across_threads() {
        let writer = Tag::new(0);
        let reader = writer.toggled();
        let mut cpu = interpreter(
            vec![
                Function::new(
                    writer,
                    vec![inst(Op::SetMem, [0, 6, 0]), inst(Op::Commit, [0, 3, 0])],
                ),
                Function::new(reader, vec![inst(Op::Pull, [3, 1, 0]), record(1)]),
            ],
            loose_limits(),
        );
        let mut host = Recorder::default();
        cpu.trigger(writer, Memory::new());
        run(&mut cpu, &mut host, 3);
        assert_eq!(cpu.shared().get(&3), Some(&6.0));
        cpu.trigger(reader, Memory::new());
        run(&mut cpu, &mut host, 2);
        assert_eq!(host.seen, vec![6.0]);
    }

    #[test]
    fn reset_clears_threads_and_program() {
        let mut cpu = interpreter(
            vec![Function::new(Tag::new(0), vec![inst(Op::Nop, [0; 3])])],
            loose_limits(),
        );
        cpu.trigger(Tag::new(0), Memory::new());
        cpu.queue_event(Event::new(Tag::new(0), Memory::new()));
        cpu.reset_hardware();
        cpu.reset_program();
        assert_eq!(cpu.core_count(), 0);
        assert_eq!(cpu.queued_events(), 0);
        assert!(!cpu.has_program());
        assert!(cpu.matcher().is_empty());
    }

    #[test]
    fn rng_draws_are_reproducible() {
        let build = || {
            interpreter(
                vec![Function::new(
                    Tag::new(0),
                    vec![inst(Op::Rng, [0, 0, 0]), record(0)],
                )],
                loose_limits(),
            )
        };
        let mut first = build();
        let mut second = build();
        let mut host_a = Recorder::default();
        let mut host_b = Recorder::default();
        first.trigger(Tag::new(0), Memory::new());
        second.trigger(Tag::new(0), Memory::new());
        run(&mut first, &mut host_a, 2);
        run(&mut second, &mut host_b, 2);
        assert_eq!(host_a.seen, host_b.seen);
        assert!((0.0..1.0).contains(&host_a.seen[0]));
    }
}
