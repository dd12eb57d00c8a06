//! Method bodies: an ordered instruction sequence plus its local and exception tables

use std::collections::HashMap;
use std::ops::Index;

use super::{Instruction, LabelId};

/// What a handler catches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Catch handler, entered with the exception object on the stack
    Catch,
    /// Finally handler, entered with an empty stack
    Finally,
}

impl RegionKind {
    /// Stack depth on entry to the handler
    pub fn entry_depth(self) -> usize {
        match self {
            Self::Catch => 1,
            Self::Finally => 0,
        }
    }
}

/// Exception-handling region. Ranges are half open instruction positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRegion {
    /// Handler kind
    pub kind: RegionKind,
    /// First protected instruction
    pub try_start: usize,
    /// One past the last protected instruction
    pub try_end: usize,
    /// First handler instruction
    pub handler_start: usize,
    /// One past the last handler instruction
    pub handler_end: usize,
}

/// A method body in the host's compiled form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstructionStream {
    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
    /// Number of local variable slots
    pub local_count: u16,
    /// Exception regions
    pub regions: Vec<ExceptionRegion>,
    /// Whether `ret` returns a value
    pub returns_value: bool,
}

impl InstructionStream {
    /// Creates a body without locals, regions or return value
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Default::default()
        }
    }

    /// Sets the local slot count
    pub fn with_locals(mut self, local_count: u16) -> Self {
        self.local_count = local_count;
        self
    }

    /// Adds an exception region
    pub fn with_region(mut self, region: ExceptionRegion) -> Self {
        self.regions.push(region);
        self
    }

    /// Marks the method as returning a value
    pub fn returning_value(mut self) -> Self {
        self.returns_value = true;
        self
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the body has no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `position`
    pub fn get(&self, position: usize) -> Option<&Instruction> {
        self.instructions.get(position)
    }

    /// Iterates over the instructions
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Position of the instruction carrying `label`
    pub fn label_position(&self, label: LabelId) -> Option<usize> {
        self.instructions
            .iter()
            .position(|instr| instr.labels.contains(&label))
    }

    /// Maps every label to the position that carries it. Later duplicates win; the verifier rejects
    /// duplicates.
    pub fn label_table(&self) -> HashMap<LabelId, usize> {
        self.instructions
            .iter()
            .enumerate()
            .flat_map(|(position, instr)| instr.labels.iter().map(move |label| (*label, position)))
            .collect()
    }
}

impl Index<usize> for InstructionStream {
    type Output = Instruction;

    fn index(&self, position: usize) -> &Self::Output {
        &self.instructions[position]
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::instr::{Instruction, InstructionStream, LabelId, OpCode};

    #[test]
    /// Labels resolve to the position of the instruction carrying them
    fn test_label_position() {
        let stream = InstructionStream::new(vec![
            Instruction::branch(OpCode::Br, LabelId(4)),
            Instruction::new(OpCode::Nop),
            Instruction::new(OpCode::Ret).labelled(LabelId(4)),
        ]);

        assert_eq!(stream.label_position(LabelId(4)), Some(2));
        assert_eq!(stream.label_position(LabelId(0)), None);
        assert_eq!(stream.label_table().len(), 1);
    }
}
