//! # Patch Registry
//!
//! The registry groups descriptors by target method and is what the host talks to: it implements
//! [`Rewrite`] for transpile descriptors and installs hook descriptors into a [`Hook`]
//! implementation.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::{GatedHook, PatchDescriptor, PatchResult, Rewrite};
use crate::config::LiveConfig;
use crate::diagnostics::{DiagnosticEntry, Journal};
use crate::hook::Hook;
use crate::instr::{InstructionStream, MethodRef};

/// Descriptors grouped by target, plus the diagnostics of the current cycle
#[derive(Debug)]
pub struct PatchRegistry {
    /// Descriptors per target, in registration order
    by_target: IndexMap<MethodRef, Vec<Arc<PatchDescriptor>>>,
    /// Configuration descriptors read
    config: LiveConfig,
    /// Diagnostics of the current cycle
    journal: Journal,
}

impl PatchRegistry {
    /// Creates an empty registry reading `config`
    pub fn new(config: LiveConfig) -> Self {
        Self {
            by_target: IndexMap::new(),
            config,
            journal: Journal::new(),
        }
    }

    /// Creates a registry holding every built-in descriptor
    pub fn builtin(config: LiveConfig) -> Self {
        let mut registry = Self::new(config);
        for descriptor in crate::patches::builtin() {
            registry.register(descriptor.clone());
        }
        registry
    }

    /// Adds a descriptor. Descriptors on one target apply in registration order.
    pub fn register(&mut self, descriptor: impl Into<Arc<PatchDescriptor>>) {
        let descriptor = descriptor.into();
        self.by_target
            .entry(descriptor.target.clone())
            .or_default()
            .push(descriptor);
    }

    /// Every descriptor, grouped by target
    pub fn descriptors(&self) -> impl Iterator<Item = &PatchDescriptor> {
        self.by_target.values().flatten().map(Arc::as_ref)
    }

    /// Descriptors on `target`
    pub fn descriptors_for(&self, target: &MethodRef) -> impl Iterator<Item = &PatchDescriptor> {
        self.by_target
            .get(target)
            .into_iter()
            .flatten()
            .map(Arc::as_ref)
    }

    /// Forgets every diagnostic recorded so far
    ///
    /// Not needed between cycles: each run replaces its descriptors' previous entries.
    pub fn begin_cycle(&self) {
        self.journal.clear();
    }

    /// Latest diagnostic of every descriptor that ran
    pub fn journal(&self) -> Vec<DiagnosticEntry> {
        self.journal.entries()
    }

    /// Runs every transpile descriptor on `target`, each against the previous one's output.
    ///
    /// Records one diagnostic per descriptor, replacing the one from its previous run. The last
    /// result's stream is the rewritten body.
    pub fn run(&self, target: &MethodRef, original: &InstructionStream) -> Vec<PatchResult> {
        let mut results: Vec<PatchResult> = Vec::new();
        for descriptor in self.descriptors_for(target).filter(|d| d.is_transpile()) {
            let input = results.last().map_or(original, |result| &result.stream);
            let result = descriptor.run(&self.config, input);
            self.journal.record(result.diagnostic(descriptor));
            results.push(result);
        }
        results
    }

    /// Installs every hook descriptor into `hooker`.
    ///
    /// Hooks stay installed as long as the returned guards live; dropping them unpatches everything
    /// this registry installed. On error, hooks installed so far are removed again.
    pub fn install_hooks<'h, H: Hook>(&self, hooker: &'h H) -> Result<Vec<H::Guard<'h>>, H::Error> {
        let mut guards = Vec::new();
        for descriptor in self.descriptors() {
            if let Some(hook) = GatedHook::new(descriptor, self.config.clone()) {
                guards.push(hooker.hook(descriptor.target.clone(), Arc::new(hook))?);
                debug!(descriptor = descriptor.name, target = %descriptor.target, "hook installed");
            }
        }
        Ok(guards)
    }
}

impl Rewrite for PatchRegistry {
    fn rewrite(&self, target: &MethodRef, original: &InstructionStream) -> InstructionStream {
        self.run(target, original)
            .pop()
            .map_or_else(|| original.clone(), |result| result.stream)
    }
}
