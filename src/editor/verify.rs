//! Structural verifier for method bodies
//!
//! Runs the same checks a verifier for a stack-based bytecode format would: operands have the right
//! shape, every branch lands on a label that exists exactly once, locals and exception regions are
//! in range, and the statically computed stack depth never goes negative and agrees wherever
//! control-flow paths join.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use thiserror::Error;

use crate::instr::{FlowControl, InstructionStream, LabelId, Operand, OperandKind};

/// Structural invariant violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Operand missing or of the wrong kind for the opcode
    #[error("`{opcode}` at {position} has a malformed operand")]
    MalformedOperand {
        /// Instruction position
        position: usize,
        /// Opcode mnemonic
        opcode: &'static str,
    },
    /// Label attached to more than one instruction
    #[error("label {label} is attached to more than one instruction")]
    DuplicateLabel {
        /// Offending label
        label: LabelId,
    },
    /// Branch to a label no instruction carries
    #[error("branch at {position} targets missing label {label}")]
    DanglingBranch {
        /// Branch position
        position: usize,
        /// Missing label
        label: LabelId,
    },
    /// Local slot beyond the declared local count
    #[error("local slot {slot} at {position} exceeds the {count} declared locals")]
    LocalOutOfRange {
        /// Instruction position
        position: usize,
        /// Referenced slot
        slot: u16,
        /// Declared local count
        count: u16,
    },
    /// Exception region boundary outside the body
    #[error("exception region {index} does not fit a body of {len} instructions")]
    RegionOutOfBounds {
        /// Region index
        index: usize,
        /// Body length
        len: usize,
    },
    /// Exception region whose protected or handler range is empty
    #[error("exception region {index} has an empty range")]
    EmptyRegion {
        /// Region index
        index: usize,
    },
    /// Instruction pops more than the stack holds
    #[error("stack underflow at {position}: depth {depth}, needs {needed}")]
    StackUnderflow {
        /// Instruction position
        position: usize,
        /// Depth on entry
        depth: usize,
        /// Values popped
        needed: usize,
    },
    /// Two control-flow paths reach one instruction with different depths
    #[error("stack depth mismatch at {position}: {expected} on one path, {found} on another")]
    StackMismatch {
        /// Join position
        position: usize,
        /// Depth recorded first
        expected: usize,
        /// Conflicting depth
        found: usize,
    },
    /// Last instruction falls through past the end of the body
    #[error("control falls off the end of the body after {position}")]
    FallsOffEnd {
        /// Position of the last instruction
        position: usize,
    },
    /// `ret` reached with the wrong stack depth
    #[error("`ret` at {position} with stack depth {depth}")]
    ReturnDepth {
        /// Position of the `ret`
        position: usize,
        /// Depth on entry
        depth: usize,
    },
}

/// Checks every structural invariant of `stream`
pub fn verify(stream: &InstructionStream) -> Result<(), VerifyError> {
    check_operands(stream)?;
    let labels = label_table(stream)?;
    check_branches(stream, &labels)?;
    check_regions(stream)?;
    check_stack(stream, &labels)
}

/// Operands match their opcode and locals are in range
fn check_operands(stream: &InstructionStream) -> Result<(), VerifyError> {
    for (position, instr) in stream.iter().enumerate() {
        let operand = instr.operand.as_ref();
        let kind = operand.map_or(OperandKind::None, Operand::kind);
        if kind != instr.opcode.operand_kind() {
            return Err(VerifyError::MalformedOperand {
                position,
                opcode: instr.opcode.mnemonic(),
            });
        }
        if let Some(Operand::Local(slot)) = instr.operand {
            if slot >= stream.local_count {
                return Err(VerifyError::LocalOutOfRange {
                    position,
                    slot,
                    count: stream.local_count,
                });
            }
        }
    }
    Ok(())
}

/// Maps labels to positions, rejecting duplicates
fn label_table(stream: &InstructionStream) -> Result<HashMap<LabelId, usize>, VerifyError> {
    let mut labels = HashMap::new();
    for (position, instr) in stream.iter().enumerate() {
        for label in &instr.labels {
            match labels.entry(*label) {
                Entry::Occupied(_) => return Err(VerifyError::DuplicateLabel { label: *label }),
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
            }
        }
    }
    Ok(labels)
}

/// Every branch target resolves
fn check_branches(
    stream: &InstructionStream,
    labels: &HashMap<LabelId, usize>,
) -> Result<(), VerifyError> {
    for (position, instr) in stream.iter().enumerate() {
        if let Some(label) = instr.target() {
            if !labels.contains_key(&label) {
                return Err(VerifyError::DanglingBranch { position, label });
            }
        }
    }
    Ok(())
}

/// Region boundaries are valid, non-empty instruction ranges
fn check_regions(stream: &InstructionStream) -> Result<(), VerifyError> {
    let len = stream.len();
    for (index, region) in stream.regions.iter().enumerate() {
        if region.try_end > len || region.handler_end > len {
            return Err(VerifyError::RegionOutOfBounds { index, len });
        }
        if region.try_start >= region.try_end || region.handler_start >= region.handler_end {
            return Err(VerifyError::EmptyRegion { index });
        }
    }
    Ok(())
}

/// Abstract interpretation of the stack depth over every reachable path
fn check_stack(
    stream: &InstructionStream,
    labels: &HashMap<LabelId, usize>,
) -> Result<(), VerifyError> {
    let len = stream.len();
    let mut depths: Vec<Option<usize>> = vec![None; len];
    let mut pending: Vec<(usize, usize)> = Vec::new();
    if len > 0 {
        pending.push((0, 0));
    }
    pending.extend(
        stream
            .regions
            .iter()
            .map(|region| (region.handler_start, region.kind.entry_depth())),
    );

    while let Some((position, depth)) = pending.pop() {
        match depths[position] {
            Some(expected) if expected != depth => {
                return Err(VerifyError::StackMismatch {
                    position,
                    expected,
                    found: depth,
                });
            }
            Some(_) => continue,
            None => depths[position] = Some(depth),
        }

        let instr = &stream[position];
        let needed = instr.pop_count();
        if depth < needed {
            return Err(VerifyError::StackUnderflow {
                position,
                depth,
                needed,
            });
        }
        let after = depth - needed + instr.push_count();
        // labels were resolved by `check_branches`
        let target = instr.target().and_then(|label| labels.get(&label).copied());
        let fall_through = |pending: &mut Vec<(usize, usize)>| {
            if position + 1 >= len {
                return Err(VerifyError::FallsOffEnd { position });
            }
            pending.push((position + 1, after));
            Ok(())
        };

        match instr.opcode.flow_control() {
            FlowControl::Next => fall_through(&mut pending)?,
            FlowControl::Branch => pending.extend(target.map(|t| (t, after))),
            FlowControl::ConditionalBranch => {
                pending.extend(target.map(|t| (t, after)));
                fall_through(&mut pending)?;
            }
            FlowControl::Leave => pending.extend(target.map(|t| (t, 0))),
            FlowControl::Return => {
                let expected = usize::from(stream.returns_value);
                if depth != expected {
                    return Err(VerifyError::ReturnDepth { position, depth });
                }
            }
            FlowControl::Throw | FlowControl::EndFinally => {}
        }
    }
    Ok(())
}
