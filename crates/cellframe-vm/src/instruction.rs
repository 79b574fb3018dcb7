use cellframe_tags::Tag;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

use crate::{Extension, ProgramError};

/// Operation executed by one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op<X> {
    Inc,
    Dec,
    Not,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    TestEqu,
    TestNEqu,
    TestLess,
    If,
    While,
    Countdown,
    Close,
    Break,
    Call,
    Return,
    SetMem,
    CopyMem,
    SwapMem,
    Input,
    Output,
    Commit,
    Pull,
    Fork,
    Terminate,
    Nop,
    Rng,
    AdjRegulator,
    SetRegulator,
    SenseRegulator,
    Ext(X),
}

const DEFAULT_OPS: &[(&str, usize, &str)] = &[
    ("Inc", 1, "Increment value in local memory Arg1"),
    ("Dec", 1, "Decrement value in local memory Arg1"),
    ("Not", 1, "Logically toggle value in local memory Arg1"),
    ("Add", 3, "Local memory: Arg3 = Arg1 + Arg2"),
    ("Sub", 3, "Local memory: Arg3 = Arg1 - Arg2"),
    ("Mult", 3, "Local memory: Arg3 = Arg1 * Arg2"),
    ("Div", 3, "Local memory: Arg3 = Arg1 / Arg2"),
    ("Mod", 3, "Local memory: Arg3 = Arg1 % Arg2"),
    ("TestEqu", 3, "Local memory: Arg3 = (Arg1 == Arg2)"),
    ("TestNEqu", 3, "Local memory: Arg3 = (Arg1 != Arg2)"),
    ("TestLess", 3, "Local memory: Arg3 = (Arg1 < Arg2)"),
    ("If", 1, "Local memory: If Arg1 != 0, proceed; else, skip block."),
    ("While", 1, "Local memory: If Arg1 != 0, loop; else, skip block."),
    ("Countdown", 1, "Local memory: Countdown Arg1 to zero."),
    ("Close", 0, "Close current block if there is a block to close."),
    ("Break", 0, "Break out of current block."),
    ("Call", 0, "Call function that best matches call affinity."),
    ("Return", 0, "Return from current function if possible."),
    ("SetMem", 2, "Local memory: Arg1 = numerical value of Arg2"),
    ("CopyMem", 2, "Local memory: Arg1 = Arg2"),
    ("SwapMem", 2, "Local memory: Swap values of Arg1 and Arg2."),
    ("Input", 2, "Input memory Arg1 => Local memory Arg2."),
    ("Output", 2, "Local memory Arg1 => Output memory Arg2."),
    ("Commit", 2, "Local memory Arg1 => Shared memory Arg2."),
    ("Pull", 2, "Shared memory Arg1 => Local memory Arg2."),
    ("Fork", 0, "Fork a new thread running the function that best matches the affinity."),
    ("Terminate", 0, "Terminate current thread."),
    ("Nop", 0, "No operation."),
    ("Rng", 1, "Draw from onboard random number generator."),
    ("AdjRegulator", 1, "Add local memory Arg1 to the regulator of the best-matching function."),
    ("SetRegulator", 1, "Set the regulator of the best-matching function to local memory Arg1."),
    ("SenseRegulator", 1, "Read the regulator of the best-matching function into local memory Arg1."),
];

impl<X: Extension> Op<X> {
    /// Every built-in operation in library order.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::Inc,
            Self::Dec,
            Self::Not,
            Self::Add,
            Self::Sub,
            Self::Mult,
            Self::Div,
            Self::Mod,
            Self::TestEqu,
            Self::TestNEqu,
            Self::TestLess,
            Self::If,
            Self::While,
            Self::Countdown,
            Self::Close,
            Self::Break,
            Self::Call,
            Self::Return,
            Self::SetMem,
            Self::CopyMem,
            Self::SwapMem,
            Self::Input,
            Self::Output,
            Self::Commit,
            Self::Pull,
            Self::Fork,
            Self::Terminate,
            Self::Nop,
            Self::Rng,
            Self::AdjRegulator,
            Self::SetRegulator,
            Self::SenseRegulator,
        ]
    }

    fn default_index(&self) -> Option<usize> {
        let idx = match self {
            Self::Inc => 0,
            Self::Dec => 1,
            Self::Not => 2,
            Self::Add => 3,
            Self::Sub => 4,
            Self::Mult => 5,
            Self::Div => 6,
            Self::Mod => 7,
            Self::TestEqu => 8,
            Self::TestNEqu => 9,
            Self::TestLess => 10,
            Self::If => 11,
            Self::While => 12,
            Self::Countdown => 13,
            Self::Close => 14,
            Self::Break => 15,
            Self::Call => 16,
            Self::Return => 17,
            Self::SetMem => 18,
            Self::CopyMem => 19,
            Self::SwapMem => 20,
            Self::Input => 21,
            Self::Output => 22,
            Self::Commit => 23,
            Self::Pull => 24,
            Self::Fork => 25,
            Self::Terminate => 26,
            Self::Nop => 27,
            Self::Rng => 28,
            Self::AdjRegulator => 29,
            Self::SetRegulator => 30,
            Self::SenseRegulator => 31,
            Self::Ext(_) => return None,
        };
        Some(idx)
    }

    #[must_use]
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::Ext(ext) => ext.name(),
            other => other
                .default_index()
                .map_or(Cow::Borrowed("?"), |idx| Cow::Borrowed(DEFAULT_OPS[idx].0)),
        }
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Ext(ext) => ext.arity(),
            other => other.default_index().map_or(0, |idx| DEFAULT_OPS[idx].1),
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ext(ext) => ext.description(),
            other => other.default_index().map_or("", |idx| DEFAULT_OPS[idx].2),
        }
    }
}

impl<X> Op<X> {
    /// Whether this operation opens a block that a later `Close` terminates.
    #[must_use]
    pub const fn opens_block(&self) -> bool {
        matches!(self, Self::If | Self::While | Self::Countdown)
    }
}

/// Single program instruction: an operation, up to three memory arguments and an affinity tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction<X> {
    pub op: Op<X>,
    pub args: [usize; 3],
    pub affinity: Tag,
}

impl<X> Instruction<X> {
    #[must_use]
    pub const fn new(op: Op<X>, args: [usize; 3], affinity: Tag) -> Self {
        Self { op, args, affinity }
    }

    /// Instruction with zeroed arguments and affinity.
    #[must_use]
    pub const fn bare(op: Op<X>) -> Self {
        Self::new(op, [0; 3], Tag::new(0))
    }
}

/// Library entry describing one available instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct InstDescriptor<X> {
    pub name: Cow<'static, str>,
    pub op: Op<X>,
    pub arity: usize,
    pub description: &'static str,
}

/// Name-indexed catalogue of the instructions a program may use.
#[derive(Debug, Clone)]
pub struct InstLib<X> {
    entries: Vec<InstDescriptor<X>>,
    by_name: HashMap<Cow<'static, str>, usize>,
}

impl<X: Extension> Default for InstLib<X> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<X: Extension> InstLib<X> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Library pre-populated with the built-in operations.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut lib = Self::empty();
        for op in Op::defaults() {
            lib.add(op);
        }
        lib
    }

    /// Register an operation; a later registration under the same name shadows the earlier one.
    pub fn add(&mut self, op: Op<X>) -> usize {
        let name = op.name();
        let idx = self.entries.len();
        self.entries.push(InstDescriptor {
            name: name.clone(),
            arity: op.arity(),
            description: op.description(),
            op,
        });
        self.by_name.insert(name, idx);
        idx
    }

    pub fn add_ext(&mut self, ext: X) -> usize {
        self.add(Op::Ext(ext))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstDescriptor<X>> + '_ {
        self.entries.iter()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&InstDescriptor<X>> {
        self.entries.get(idx)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&InstDescriptor<X>> {
        self.by_name.get(name).and_then(|idx| self.entries.get(*idx))
    }

    /// Build an instruction by mnemonic.
    pub fn inst(
        &self,
        name: &str,
        args: [usize; 3],
        affinity: Tag,
    ) -> Result<Instruction<X>, ProgramError> {
        let descriptor = self
            .lookup(name)
            .ok_or_else(|| ProgramError::UnknownInstruction(name.to_string()))?;
        Ok(Instruction::new(descriptor.op.clone(), args, affinity))
    }
}
