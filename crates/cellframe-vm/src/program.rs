use cellframe_tags::Tag;
use serde::{Deserialize, Serialize};

use crate::{Instruction, ProgramError};

/// Tagged function body; threads are dispatched to it by affinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function<X> {
    pub affinity: Tag,
    pub body: Vec<Instruction<X>>,
}

impl<X> Function<X> {
    #[must_use]
    pub const fn new(affinity: Tag, body: Vec<Instruction<X>>) -> Self {
        Self { affinity, body }
    }
}

/// Opaque executable artifact loaded into an interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program<X> {
    functions: Vec<Function<X>>,
}

impl<X> Default for Program<X> {
    fn default() -> Self {
        Self {
            functions: Vec::new(),
        }
    }
}

impl<X> Program<X> {
    /// Construct a program; at least one function is required.
    pub fn new(functions: Vec<Function<X>>) -> Result<Self, ProgramError> {
        if functions.is_empty() {
            return Err(ProgramError::Empty);
        }
        Ok(Self { functions })
    }

    #[must_use]
    pub fn functions(&self) -> &[Function<X>] {
        &self.functions
    }

    #[must_use]
    pub fn function(&self, idx: usize) -> Option<&Function<X>> {
        self.functions.get(idx)
    }

    /// Number of functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Total instruction count across all functions.
    #[must_use]
    pub fn inst_count(&self) -> usize {
        self.functions.iter().map(|function| function.body.len()).sum()
    }
}
