//! Event-driven, tag-dispatched program interpreter.
//!
//! Programs are lists of tagged functions. Events (environment triggers or
//! inbound messages) carry an affinity tag; the interpreter spawns a thread
//! running whichever function best matches that tag. Each call to
//! [`Interpreter::single_process`] advances every live thread by exactly one
//! instruction. Instructions outside the default set are forwarded to a
//! [`Host`], which is how the enclosing hardware exposes its environment.

use std::borrow::Cow;
use std::fmt;

use rand::rngs::SmallRng;
use thiserror::Error;

mod instruction;
mod interpreter;
mod program;
mod state;

pub use instruction::{InstDescriptor, InstLib, Instruction, Op};
pub use interpreter::{Event, HardwareLimits, Interpreter};
pub use program::{Function, Program};
pub use state::{Block, BlockKind, CallState, Memory};

/// Errors raised while assembling programs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("program must contain at least one function")]
    Empty,
    #[error("unknown instruction `{0}`")]
    UnknownInstruction(String),
}

/// Instruction set extension supplied by a host.
pub trait Extension: Clone + fmt::Debug + PartialEq {
    /// Mnemonic used by instruction libraries.
    fn name(&self) -> Cow<'static, str>;

    /// Number of arguments consumed.
    fn arity(&self) -> usize;

    /// Human-readable summary.
    fn description(&self) -> &'static str;
}

/// Borrowed view of the executing thread handed to a host instruction.
pub struct ExecContext<'a, X> {
    pub inst: &'a Instruction<X>,
    pub state: &'a mut CallState,
    pub shared: &'a mut Memory,
    pub program: &'a Program<X>,
    pub rng: &'a mut SmallRng,
}

/// Environment surface executing extension instructions on behalf of the interpreter.
pub trait Host {
    type Op: Extension;

    fn execute(&mut self, op: &Self::Op, ctx: ExecContext<'_, Self::Op>);
}
