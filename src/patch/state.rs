//! # Patch State
//!
//! The per-descriptor state machine of one request cycle:
//!
//! ```text
//! Idle ─┬─> Disabled
//!       └─> Matching ─┬─> Matched ──> Editing ─┬─> Verified
//!                     │                        └─> Fallback
//!                     └─> Unmatched ─────────────> Fallback
//! ```
//!
//! `Disabled`, `Verified` and `Fallback` are terminal. Only `Verified` hands edits to the host.

use tracing::trace;

use super::{Matches, PatchDescriptor, PatchError, PatchKind};
use crate::config::LiveConfig;
use crate::diagnostics::{DiagnosticEntry, DiagnosticKind};
use crate::editor;
use crate::instr::InstructionStream;

/// State of a descriptor during one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    /// Rewrite requested, nothing evaluated yet
    Idle,
    /// Disabled by configuration, or configuration unavailable
    Disabled,
    /// Locating anchors
    Matching,
    /// At least one anchor matched
    Matched,
    /// No anchor matched
    Unmatched,
    /// Applying edits
    Editing,
    /// Edits applied and verified
    Verified,
    /// Input returned unchanged after a failure
    Fallback,
}

impl PatchState {
    /// Whether the run is over
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disabled | Self::Verified | Self::Fallback)
    }
}

/// Outcome of one descriptor run
#[derive(Debug, Clone, PartialEq)]
pub struct PatchResult {
    /// Body to hand on: the edited one when verified, the input otherwise
    pub stream: InstructionStream,
    /// Match count per anchor
    pub counts: Vec<usize>,
    /// Total matches over all anchors
    pub matches_found: usize,
    /// Terminal state
    pub state: PatchState,
    /// Whether the descriptor's edits are in `stream`
    pub succeeded: bool,
    /// What went wrong, if anything. A count mismatch can accompany success.
    pub error: Option<PatchError>,
}

impl PatchResult {
    /// Result that hands `stream` on untouched
    fn unchanged(stream: &InstructionStream, state: PatchState) -> Self {
        Self {
            stream: stream.clone(),
            counts: Vec::new(),
            matches_found: 0,
            state,
            succeeded: false,
            error: None,
        }
    }

    /// Diagnostic classification of this result
    pub fn kind(&self) -> DiagnosticKind {
        match (&self.state, &self.error) {
            (PatchState::Disabled, _) => DiagnosticKind::Disabled,
            (_, Some(PatchError::AnchorNotFound)) => DiagnosticKind::AnchorNotFound,
            (_, Some(PatchError::StructuralInvariantViolation(_))) => {
                DiagnosticKind::StructuralInvariantViolation
            }
            (_, Some(PatchError::MatchCountMismatch { .. })) => DiagnosticKind::MatchCountMismatch,
            _ => DiagnosticKind::Applied,
        }
    }

    /// Diagnostic entry describing this result for `descriptor`
    pub fn diagnostic(&self, descriptor: &PatchDescriptor) -> DiagnosticEntry {
        DiagnosticEntry {
            descriptor: descriptor.name,
            target: descriptor.target.to_string(),
            kind: self.kind(),
            expected: descriptor.expected(),
            actual: self.counts.clone(),
            proceeded: self.succeeded,
            detail: self.error.as_ref().map(ToString::to_string),
        }
    }
}

impl PatchDescriptor {
    /// Runs this descriptor against `stream` once.
    ///
    /// Never fails: every error ends in a terminal state with the input handed back, except a count
    /// mismatch, which keeps the edits. Hook descriptors never edit bodies and end in `Disabled`
    /// here.
    pub fn run(&self, config: &LiveConfig, stream: &InstructionStream) -> PatchResult {
        let (anchors, build) = match &self.kind {
            PatchKind::Transpile { anchors, build } => (anchors, *build),
            PatchKind::Hook(_) => return PatchResult::unchanged(stream, PatchState::Disabled),
        };

        let mut result = PatchResult::unchanged(stream, PatchState::Idle);
        let mut matches = Matches::default();
        let mut edited = None;
        let config = config.snapshot();

        while !result.state.is_terminal() {
            let next = match result.state {
                PatchState::Idle => match &config {
                    Err(err) => {
                        result.error = Some(PatchError::from(*err));
                        PatchState::Disabled
                    }
                    Ok(config) if !(self.enabled)(config) => PatchState::Disabled,
                    Ok(_) => PatchState::Matching,
                },
                PatchState::Matching => {
                    matches = Matches::locate(anchors, stream);
                    result.counts = matches.counts();
                    result.matches_found = matches.total();
                    if matches.is_empty() {
                        PatchState::Unmatched
                    } else {
                        PatchState::Matched
                    }
                }
                PatchState::Unmatched => {
                    result.error = Some(PatchError::AnchorNotFound);
                    PatchState::Fallback
                }
                PatchState::Matched => PatchState::Editing,
                PatchState::Editing => {
                    // only reachable with a configuration
                    let ops = match &config {
                        Ok(config) => build(config, &matches, stream),
                        Err(_) => Vec::new(),
                    };
                    match editor::apply(stream, &ops) {
                        Ok(stream) => {
                            edited = Some(stream);
                            PatchState::Verified
                        }
                        Err(err) => {
                            result.error = Some(PatchError::from(err));
                            PatchState::Fallback
                        }
                    }
                }
                PatchState::Disabled | PatchState::Verified | PatchState::Fallback => result.state,
            };
            trace!(descriptor = self.name, from = ?result.state, to = ?next, "patch state");
            result.state = next;
        }

        if let Some(stream) = edited {
            result.stream = stream;
            result.succeeded = true;
            let expected = self.expected();
            if result.counts != expected {
                result.error = Some(PatchError::MatchCountMismatch {
                    expected,
                    actual: result.counts.clone(),
                });
            }
        }
        result
    }
}
