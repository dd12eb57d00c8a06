//! # Matcher
//!
//! This module locates anchors: positions in an [`InstructionStream`] where a declarative
//! [`AnchorPattern`] holds.
//!
//! A pattern is a list of predicates, each pinned to a fixed offset from the candidate position.
//! Offsets may be negative, so a pattern can anchor on a call and still require the loads that
//! precede it. A pattern may also carry confirmation windows: a predicate that has to hold for at
//! least one instruction in a fixed offset range.
//!
//! Every predicate is evaluated independently at its offset, so a scan is linear in the stream
//! length per pattern and never backtracks.

use std::ops::RangeInclusive;

use crate::instr::InstructionStream;

mod predicate;

pub use predicate::{OpClass, OperandCheck, Predicate};

/// One term of a pattern
#[derive(Debug, Clone)]
enum Term {
    /// Predicate must hold at exactly this offset
    At(isize, Predicate),
    /// Predicate must hold for at least one offset in the window
    Within(RangeInclusive<isize>, Predicate),
}

/// Declarative description of an anchor
#[derive(Debug, Clone)]
pub struct AnchorPattern {
    /// Terms, all of which must hold
    terms: Vec<Term>,
}

impl AnchorPattern {
    /// Pattern anchored on `predicate` at offset 0
    pub fn new(predicate: Predicate) -> Self {
        Self {
            terms: vec![Term::At(0, predicate)],
        }
    }

    /// Adds `predicate` right after the furthest fixed term
    pub fn then(self, predicate: Predicate) -> Self {
        let next = self
            .terms
            .iter()
            .filter_map(|term| match term {
                Term::At(offset, _) => Some(*offset),
                Term::Within(..) => None,
            })
            .max()
            .map_or(0, |offset| offset + 1);
        self.at(next, predicate)
    }

    /// Adds `predicate` at a fixed `offset` from the anchor. Negative offsets look behind.
    pub fn at(mut self, offset: isize, predicate: Predicate) -> Self {
        self.terms.push(Term::At(offset, predicate));
        self
    }

    /// Adds a confirmation: `predicate` must hold somewhere within `window`
    pub fn confirm_within(mut self, window: RangeInclusive<isize>, predicate: Predicate) -> Self {
        self.terms.push(Term::Within(window, predicate));
        self
    }

    /// Whether every term holds for an anchor at `position`
    pub fn matches_at(&self, stream: &InstructionStream, position: usize) -> bool {
        let holds = |offset: isize, predicate: &Predicate| {
            position
                .checked_add_signed(offset)
                .and_then(|at| stream.get(at))
                .is_some_and(|instr| predicate.matches(instr))
        };
        self.terms.iter().all(|term| match term {
            Term::At(offset, predicate) => holds(*offset, predicate),
            Term::Within(window, predicate) => {
                window.clone().any(|offset| holds(offset, predicate))
            }
        })
    }
}

impl From<Predicate> for AnchorPattern {
    fn from(predicate: Predicate) -> Self {
        Self::new(predicate)
    }
}

/// First position where `pattern` holds, scanning left to right
pub fn find_first(stream: &InstructionStream, pattern: &AnchorPattern) -> Option<usize> {
    (0..stream.len())
        .find(|&position| pattern.matches_at(stream, position))
}

/// Every position where `pattern` holds, in ascending order
pub fn find_all(stream: &InstructionStream, pattern: &AnchorPattern) -> Vec<usize> {
    (0..stream.len())
        .filter(|&position| pattern.matches_at(stream, position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{Instruction, MethodRef, OpCode, Operand};

    /// `ldarg.0; ldc.r4 1; ldc.r4 2; call Euler; stloc.0; ldc.r4 1; pop; ret`
    fn body() -> InstructionStream {
        InstructionStream::new(vec![
            Instruction::ldarg(0),
            Instruction::ldc_r4(1.0),
            Instruction::ldc_r4(2.0),
            Instruction::call(euler()),
            Instruction::stloc(0),
            Instruction::ldc_r4(1.0),
            Instruction::new(OpCode::Pop),
            Instruction::new(OpCode::Ret),
        ])
        .with_locals(1)
    }

    fn euler() -> MethodRef {
        MethodRef::static_method("Quaternion", "Euler", 3, true)
    }

    #[test]
    /// Single predicate patterns find first and all occurrences
    fn test_find_single() {
        let stream = body();
        let pattern = AnchorPattern::new(Predicate::ldc_r4(1.0));
        assert_eq!(find_first(&stream, &pattern), Some(1));
        assert_eq!(find_all(&stream, &pattern), vec![1, 5]);
    }

    #[test]
    /// `then` pins the next predicate to the following instruction
    fn test_sequence() {
        let stream = body();
        let pattern = AnchorPattern::new(Predicate::calls(euler()))
            .then(Predicate::class(OpClass::StoreLocal));
        assert_eq!(find_all(&stream, &pattern), vec![3]);

        let pattern = AnchorPattern::new(Predicate::calls(euler()))
            .then(Predicate::op(OpCode::Pop));
        assert_eq!(find_first(&stream, &pattern), None);
    }

    #[test]
    /// Negative offsets look behind the anchor and never wrap around the start
    fn test_look_behind() {
        let stream = body();
        let pattern = AnchorPattern::new(Predicate::calls(euler()))
            .at(-3, Predicate::class(OpClass::LoadArg));
        assert_eq!(find_first(&stream, &pattern), Some(3));

        // position 1 would need offset -3, which is out of bounds
        let pattern = AnchorPattern::new(Predicate::ldc_r4(1.0))
            .at(-3, Predicate::any());
        assert_eq!(find_all(&stream, &pattern), vec![5]);
    }

    #[test]
    /// Confirmation windows accept a match anywhere inside the window
    fn test_confirm_within() {
        let stream = body();
        let pattern = AnchorPattern::new(Predicate::ldc_r4(1.0))
            .confirm_within(
                1..=3,
                Predicate::op(OpCode::Stloc).with_operand(Operand::Local(0)),
            );
        assert_eq!(find_all(&stream, &pattern), vec![1]);

        let pattern = AnchorPattern::new(Predicate::ldc_r4(1.0))
            .confirm_within(1..=5, Predicate::op(OpCode::Ret));
        assert_eq!(find_all(&stream, &pattern), vec![5]);
    }

    #[test]
    /// An empty body never matches
    fn test_empty_stream() {
        let pattern = AnchorPattern::new(Predicate::any());
        assert_eq!(find_first(&InstructionStream::default(), &pattern), None);
        assert!(find_all(&InstructionStream::default(), &pattern).is_empty());
    }
}
