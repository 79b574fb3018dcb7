use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse numeric memory addressed by instruction arguments; unset cells read as zero.
pub type Memory = BTreeMap<usize, f64>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BlockKind {
    Basic,
    Loop,
}

/// Open control-flow block inside a function body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub begin: usize,
    pub end: usize,
    pub kind: BlockKind,
}

/// One frame of a thread's call stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallState {
    pub local: Memory,
    pub input: Memory,
    pub output: Memory,
    pub(crate) func_ptr: usize,
    pub(crate) inst_ptr: usize,
    pub(crate) blocks: Vec<Block>,
}

impl CallState {
    #[must_use]
    pub fn new(func_ptr: usize, input: Memory) -> Self {
        Self {
            input,
            func_ptr,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn func_ptr(&self) -> usize {
        self.func_ptr
    }

    #[must_use]
    pub const fn inst_ptr(&self) -> usize {
        self.inst_ptr
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[must_use]
    pub fn local(&self, addr: usize) -> f64 {
        read(&self.local, addr)
    }

    pub fn set_local(&mut self, addr: usize, value: f64) {
        self.local.insert(addr, value);
    }

    #[must_use]
    pub fn input(&self, addr: usize) -> f64 {
        read(&self.input, addr)
    }

    #[must_use]
    pub fn output(&self, addr: usize) -> f64 {
        read(&self.output, addr)
    }

    pub fn set_output(&mut self, addr: usize, value: f64) {
        self.output.insert(addr, value);
    }
}

pub(crate) fn read(memory: &Memory, addr: usize) -> f64 {
    memory.get(&addr).copied().unwrap_or_default()
}
