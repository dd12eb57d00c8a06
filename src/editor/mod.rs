//! # Editor
//!
//! This module applies edit lists to method bodies.
//!
//! Edit positions always refer to the *input* stream, the one the anchors were found in. While
//! editing, every original instruction keeps a stable node identity and every inserted instruction
//! gets a fresh one; labels travel with the instruction that carries them and exception-region
//! boundaries point at identities, not indices. Indices are only recomputed once, after the last
//! edit, so any number of edits relative to one anchor compose.
//!
//! The input is never mutated. [`apply`] verifies the input, builds a new body and verifies it
//! again before handing it back; a body that fails [`verify`] never leaves this module.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::instr::{ExceptionRegion, Instruction, InstructionStream, RegionKind};

mod verify;

pub use verify::{verify, VerifyError};

/// One edit against the input stream
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    /// Insert instructions after the instruction at this position. Repeated inserts at one
    /// position keep their order.
    InsertAfter(usize, Vec<Instruction>),
    /// Replace the instruction at this position. The replaced instruction's labels move to the
    /// replacement.
    ReplaceAt(usize, Instruction),
    /// Remove `count` instructions starting at this position. Their labels move to the next
    /// surviving instruction.
    RemoveRange(usize, usize),
}

impl EditOp {
    /// Input position this edit is anchored to
    pub fn position(&self) -> usize {
        match self {
            Self::InsertAfter(position, _)
            | Self::ReplaceAt(position, _)
            | Self::RemoveRange(position, _) => *position,
        }
    }
}

/// Errors while applying an edit list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Edit addresses an instruction the input does not have
    #[error("edit at {position} is outside a body of {len} instructions")]
    OutOfBounds {
        /// Requested position
        position: usize,
        /// Input length
        len: usize,
    },
    /// Edit addresses an instruction an earlier edit already replaced or removed
    #[error("instruction {position} is claimed by more than one edit")]
    Conflict {
        /// Contested input position
        position: usize,
    },
    /// Input failed verification before any edit was applied
    #[error("input body is invalid: {0}")]
    InvalidInput(VerifyError),
    /// Edited body failed verification
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Stable identity of an instruction during an edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

/// Region boundary, bound to an identity rather than an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    /// Position of this node
    Node(NodeId),
    /// One past the last instruction
    End,
}

/// Working copy of an instruction
#[derive(Debug)]
struct Node {
    /// Identity
    id: NodeId,
    /// Instruction, labels included
    instr: Instruction,
}

/// Exception region with boundaries bound to identities
#[derive(Debug)]
struct StableRegion {
    /// Handler kind
    kind: RegionKind,
    /// `[try_start, try_end, handler_start, handler_end]`
    bounds: [Boundary; 4],
}

/// Edit session. Owns the working copy exclusively until [`EditSession::finish`].
struct EditSession {
    /// Working buffer
    nodes: Vec<Node>,
    /// Regions of the body being edited
    regions: Vec<StableRegion>,
    /// Input positions already removed
    removed: HashSet<usize>,
    /// Input positions already replaced
    replaced: HashSet<usize>,
    /// Last node inserted after each input position
    tails: HashMap<usize, NodeId>,
    /// Next fresh identity
    next_id: usize,
}

impl EditSession {
    /// Starts a session on a copy of `stream`
    fn new(stream: &InstructionStream) -> Self {
        let len = stream.len();
        let bind = |position: usize| {
            if position < len {
                Boundary::Node(NodeId(position))
            } else {
                Boundary::End
            }
        };
        Self {
            nodes: stream
                .iter()
                .cloned()
                .enumerate()
                .map(|(position, instr)| Node {
                    id: NodeId(position),
                    instr,
                })
                .collect(),
            regions: stream
                .regions
                .iter()
                .map(|region| StableRegion {
                    kind: region.kind,
                    bounds: [
                        bind(region.try_start),
                        bind(region.try_end),
                        bind(region.handler_start),
                        bind(region.handler_end),
                    ],
                })
                .collect(),
            removed: HashSet::new(),
            replaced: HashSet::new(),
            tails: HashMap::new(),
            next_id: len,
        }
    }

    /// Current index of a node
    fn index_of(&self, id: NodeId) -> Result<usize, EditError> {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or(EditError::Conflict { position: id.0 })
    }

    /// Applies one edit to the working buffer
    fn edit(&mut self, op: EditOp) -> Result<(), EditError> {
        match op {
            EditOp::InsertAfter(position, instrs) => {
                if self.removed.contains(&position) {
                    return Err(EditError::Conflict { position });
                }
                let tail = self.tails.get(&position);
                let anchor = tail.copied().unwrap_or(NodeId(position));
                let mut index = self.index_of(anchor)?;
                for instr in instrs {
                    let id = NodeId(self.next_id);
                    self.next_id += 1;
                    index += 1;
                    self.nodes.insert(index, Node { id, instr });
                    self.tails.insert(position, id);
                }
            }
            EditOp::ReplaceAt(position, mut instr) => {
                if self.removed.contains(&position) || !self.replaced.insert(position) {
                    return Err(EditError::Conflict { position });
                }
                let index = self.index_of(NodeId(position))?;
                let node = &mut self.nodes[index];
                instr.labels.append(&mut node.instr.labels);
                node.instr = instr;
            }
            EditOp::RemoveRange(start, count) => {
                for position in start..start + count {
                    if self.replaced.contains(&position) || !self.removed.insert(position) {
                        return Err(EditError::Conflict { position });
                    }
                    self.remove(NodeId(position))?;
                }
            }
        }
        Ok(())
    }

    /// Removes a node, handing its labels and region boundaries to its successor
    fn remove(&mut self, id: NodeId) -> Result<(), EditError> {
        let index = self.index_of(id)?;
        let mut node = self.nodes.remove(index);
        let successor = match self.nodes.get_mut(index) {
            Some(next) => {
                next.instr.labels.append(&mut node.instr.labels);
                Boundary::Node(next.id)
            }
            None => Boundary::End,
        };
        for region in &mut self.regions {
            for bound in &mut region.bounds {
                if *bound == Boundary::Node(id) {
                    *bound = successor;
                }
            }
        }
        Ok(())
    }

    /// Resolves identities back to indices and builds the new body
    fn finish(self, template: &InstructionStream) -> InstructionStream {
        let len = self.nodes.len();
        let positions: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id, position))
            .collect();
        let resolve = |bound: Boundary| match bound {
            Boundary::Node(id) => positions.get(&id).copied().unwrap_or(len),
            Boundary::End => len,
        };
        let regions = self
            .regions
            .iter()
            .map(|region| ExceptionRegion {
                kind: region.kind,
                try_start: resolve(region.bounds[0]),
                try_end: resolve(region.bounds[1]),
                handler_start: resolve(region.bounds[2]),
                handler_end: resolve(region.bounds[3]),
            })
            .collect();
        InstructionStream {
            instructions: self.nodes.into_iter().map(|node| node.instr).collect(),
            local_count: template.local_count,
            regions,
            returns_value: template.returns_value,
        }
    }
}

/// Checks that `op` only addresses instructions of a body with `len` instructions
fn check_bounds(op: &EditOp, len: usize) -> Result<(), EditError> {
    let end = match op {
        EditOp::InsertAfter(position, _) | EditOp::ReplaceAt(position, _) => {
            position.checked_add(1)
        }
        EditOp::RemoveRange(position, count) => position.checked_add(*count),
    };
    match end {
        Some(end) if end <= len => Ok(()),
        _ => Err(EditError::OutOfBounds {
            position: op.position(),
            len,
        }),
    }
}

/// Applies `ops` to a copy of `stream` in ascending position order and verifies the result.
///
/// Edits at the same position keep the order they were given in.
pub fn apply(stream: &InstructionStream, ops: &[EditOp]) -> Result<InstructionStream, EditError> {
    verify(stream).map_err(EditError::InvalidInput)?;
    for op in ops {
        check_bounds(op, stream.len())?;
    }

    let mut ordered = ops.to_vec();
    ordered.sort_by_key(EditOp::position);

    let mut session = EditSession::new(stream);
    for op in ordered {
        session.edit(op)?;
    }
    let edited = session.finish(stream);
    verify(&edited)?;
    Ok(edited)
}
