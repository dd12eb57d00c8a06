//! # Patch
//!
//! This module covers patch descriptors and the registry that applies them.
//!
//! A [`PatchDescriptor`] binds a target method to an enable condition and one of two patch kinds:
//!
//! - **transpile**: anchors are located in the target's body, a build function turns them into
//!   edits, and the [editor](crate::editor) applies them
//! - **hook**: before/after callbacks are installed around calls to the target
//!
//! Descriptors are constructed once and never mutated. Each run is independent: the same input and
//! configuration always produce the same output.

use thiserror::Error;

use crate::config::{ConfigError, Configuration};
use crate::editor::{EditError, EditOp};
use crate::hook::{CallArgs, CallFlow, Value};
use crate::instr::{InstructionStream, MethodRef};
use crate::matcher::{self, AnchorPattern};

pub mod gate;
pub mod registry;
pub mod state;

pub use gate::GatedHook;
pub use registry::PatchRegistry;
pub use state::{PatchResult, PatchState};

/// Errors a descriptor run can end in
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// No anchor matched anywhere in the body
    #[error("no anchor matched")]
    AnchorNotFound,
    /// Some anchor matched a different number of times than expected
    #[error("expected {expected:?} matches, found {actual:?}")]
    MatchCountMismatch {
        /// Expected count per anchor
        expected: Vec<usize>,
        /// Actual count per anchor
        actual: Vec<usize>,
    },
    /// The edits would have produced an invalid body
    #[error("structural invariant violation: {0}")]
    StructuralInvariantViolation(#[from] EditError),
    /// The live configuration could not be read
    #[error(transparent)]
    ConfigurationUnavailable(#[from] ConfigError),
}

/// Turns located anchors into edits
pub type BuildFn = fn(&Configuration, &Matches, &InstructionStream) -> Vec<EditOp>;
/// Before-hook of a hook descriptor
pub type BeforeFn = fn(&Configuration, &mut CallArgs) -> CallFlow;
/// After-hook of a hook descriptor
pub type AfterFn = fn(&Configuration, &CallArgs, &mut Value);
/// Enable condition, evaluated against the live configuration on every run
pub type EnabledFn = fn(&Configuration) -> bool;

/// How many positions an anchor collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// Only the first match
    First,
    /// Every match
    All,
}

/// One anchor of a transpile descriptor
#[derive(Debug, Clone)]
pub struct Anchor {
    /// What to look for
    pub pattern: AnchorPattern,
    /// How many positions to collect
    pub scan: Scan,
    /// How many matches a healthy body has
    pub expected: usize,
}

impl Anchor {
    /// Anchor on the first match of `pattern`, expected exactly once
    pub fn first(pattern: impl Into<AnchorPattern>) -> Self {
        Self {
            pattern: pattern.into(),
            scan: Scan::First,
            expected: 1,
        }
    }

    /// Anchor on every match of `pattern`, expected `expected` times
    pub fn all(pattern: impl Into<AnchorPattern>, expected: usize) -> Self {
        Self {
            pattern: pattern.into(),
            scan: Scan::All,
            expected,
        }
    }

    /// Positions where this anchor holds in `stream`
    pub fn locate(&self, stream: &InstructionStream) -> Vec<usize> {
        match self.scan {
            Scan::First => Vec::from_iter(matcher::find_first(stream, &self.pattern)),
            Scan::All => matcher::find_all(stream, &self.pattern),
        }
    }
}

/// Positions found for each anchor of a descriptor, in anchor order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Matches {
    /// Positions per anchor, ascending
    positions: Vec<Vec<usize>>,
}

impl Matches {
    /// Locates every anchor in `stream`
    pub fn locate(anchors: &[Anchor], stream: &InstructionStream) -> Self {
        Self {
            positions: anchors.iter().map(|anchor| anchor.locate(stream)).collect(),
        }
    }

    /// Positions of anchor `index`; empty if it matched nothing
    pub fn anchor(&self, index: usize) -> &[usize] {
        self.positions
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First position of anchor `index`
    pub fn first(&self, index: usize) -> Option<usize> {
        self.anchor(index).first().copied()
    }

    /// Match count per anchor
    pub fn counts(&self) -> Vec<usize> {
        self.positions.iter().map(Vec::len).collect()
    }

    /// Total number of matches
    pub fn total(&self) -> usize {
        self.positions.iter().map(Vec::len).sum()
    }

    /// Whether no anchor matched at all
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Callbacks of a hook descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct HookPatch {
    /// Runs before the original call
    pub before: Option<BeforeFn>,
    /// Runs after the original call
    pub after: Option<AfterFn>,
}

/// What a descriptor does to its target
#[derive(Debug, Clone)]
pub enum PatchKind {
    /// Edit the target's body
    Transpile {
        /// Anchors to locate
        anchors: Vec<Anchor>,
        /// Edit list builder
        build: BuildFn,
    },
    /// Wrap calls to the target
    Hook(HookPatch),
}

/// Declarative binding of a target method, an enable condition and a transform
#[derive(Debug, Clone)]
pub struct PatchDescriptor {
    /// Unique name, used in diagnostics
    pub name: &'static str,
    /// Method this descriptor patches
    pub target: MethodRef,
    /// Enable condition
    pub enabled: EnabledFn,
    /// Transform
    pub kind: PatchKind,
}

impl PatchDescriptor {
    /// Creates a transpile descriptor
    pub fn transpile(
        name: &'static str,
        target: MethodRef,
        enabled: EnabledFn,
        anchors: Vec<Anchor>,
        build: BuildFn,
    ) -> Self {
        Self {
            name,
            target,
            enabled,
            kind: PatchKind::Transpile { anchors, build },
        }
    }

    /// Creates a hook descriptor
    pub fn hook(
        name: &'static str,
        target: MethodRef,
        enabled: EnabledFn,
        hook: HookPatch,
    ) -> Self {
        Self {
            name,
            target,
            enabled,
            kind: PatchKind::Hook(hook),
        }
    }

    /// Whether this descriptor edits bodies
    pub fn is_transpile(&self) -> bool {
        matches!(self.kind, PatchKind::Transpile { .. })
    }

    /// Expected match count per anchor; empty for hook descriptors
    pub fn expected(&self) -> Vec<usize> {
        match &self.kind {
            PatchKind::Transpile { anchors, .. } => {
                anchors.iter().map(|anchor| anchor.expected).collect()
            }
            PatchKind::Hook(_) => Vec::new(),
        }
    }
}

/// The host boundary: produce the body to use for `target`
pub trait Rewrite {
    /// Rewrites `original`, the current body of `target`. Never fails: on any error the original
    /// comes back.
    fn rewrite(&self, target: &MethodRef, original: &InstructionStream) -> InstructionStream;
}
