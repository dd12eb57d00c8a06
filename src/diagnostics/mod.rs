//! # Diagnostics
//!
//! This module covers the outbound record of what each descriptor did in a cycle.
//!
//! Every descriptor run produces exactly one [`DiagnosticEntry`]. Emitting an entry writes one
//! structured `tracing` event at a level matching its severity; the registry also keeps the latest
//! entry of every descriptor in a [`Journal`].

use std::fmt::{self, Display};
use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::{debug, error, warn};

/// What happened to one descriptor in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Edits applied, every anchor matched as often as expected
    Applied,
    /// Skipped: the descriptor is disabled or the configuration is unavailable
    Disabled,
    /// No anchor matched anywhere; the input was returned
    AnchorNotFound,
    /// Some anchor matched a different number of times than expected; the edits were applied
    /// anyway
    MatchCountMismatch,
    /// Edits would have broken the body; the input was returned
    StructuralInvariantViolation,
}

impl DiagnosticKind {
    /// Whether the host should treat this as an error
    pub fn is_error(self) -> bool {
        matches!(self, Self::AnchorNotFound | Self::StructuralInvariantViolation)
    }
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Applied => "applied",
            Self::Disabled => "disabled",
            Self::AnchorNotFound => "anchor not found",
            Self::MatchCountMismatch => "match count mismatch",
            Self::StructuralInvariantViolation => "structural invariant violation",
        })
    }
}

/// One structured diagnostic record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    /// Descriptor name
    pub descriptor: &'static str,
    /// Target method, rendered
    pub target: String,
    /// Outcome
    pub kind: DiagnosticKind,
    /// Expected match count per anchor
    pub expected: Vec<usize>,
    /// Actual match count per anchor
    pub actual: Vec<usize>,
    /// Whether the descriptor's edits made it into the returned body
    pub proceeded: bool,
    /// Error message, when there was one
    pub detail: Option<String>,
}

impl DiagnosticEntry {
    /// Writes this entry as a single log event
    pub fn emit(&self) {
        let detail = self.detail.as_deref().unwrap_or_default();
        match self.kind {
            DiagnosticKind::Applied => debug!(
                descriptor = self.descriptor,
                target = %self.target,
                actual = ?self.actual,
                "patch applied"
            ),
            DiagnosticKind::Disabled => debug!(
                descriptor = self.descriptor,
                target = %self.target,
                detail,
                "patch disabled"
            ),
            DiagnosticKind::MatchCountMismatch => warn!(
                descriptor = self.descriptor,
                target = %self.target,
                expected = ?self.expected,
                actual = ?self.actual,
                proceeded = self.proceeded,
                "patch matched an unexpected number of times"
            ),
            DiagnosticKind::AnchorNotFound | DiagnosticKind::StructuralInvariantViolation => {
                error!(
                    descriptor = self.descriptor,
                    target = %self.target,
                    expected = ?self.expected,
                    actual = ?self.actual,
                    proceeded = self.proceeded,
                    detail,
                    "failed to apply patch: {}",
                    self.kind
                )
            }
        }
    }
}

/// Latest entry of every descriptor that ran
///
/// A descriptor running again replaces its previous entry, so the journal never holds more entries
/// than there are descriptors.
#[derive(Debug, Default)]
pub struct Journal {
    /// Entries by descriptor name, in order of first recording
    entries: Mutex<IndexMap<&'static str, DiagnosticEntry>>,
}

impl Journal {
    /// Creates an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `entry` and keeps it in place of the descriptor's previous entry
    pub fn record(&self, entry: DiagnosticEntry) {
        entry.emit();
        self.lock().insert(entry.descriptor, entry);
    }

    /// Forgets every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Copy of the entries recorded so far
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.lock().values().cloned().collect()
    }

    /// Locks the entries, recovering from a poisoned lock
    fn lock(&self) -> MutexGuard<'_, IndexMap<&'static str, DiagnosticEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
