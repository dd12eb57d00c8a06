//! # Gated Hooks
//!
//! Adapts a hook descriptor to a [`CallHook`]. The descriptor's enable condition is checked on
//! every call against the live configuration, so a configuration swap takes effect without
//! reinstalling anything.

use std::sync::Arc;

use tracing::trace;

use super::{HookPatch, PatchDescriptor, PatchKind};
use crate::config::{Configuration, LiveConfig};
use crate::hook::{CallArgs, CallFlow, CallHook, Value};

/// A hook descriptor bound to the live configuration
#[derive(Debug, Clone)]
pub struct GatedHook {
    /// Descriptor name
    name: &'static str,
    /// Enable condition
    enabled: fn(&Configuration) -> bool,
    /// Callbacks
    hook: HookPatch,
    /// Configuration the condition reads
    config: LiveConfig,
}

impl GatedHook {
    /// Binds `descriptor` to `config`. `None` for transpile descriptors.
    pub fn new(descriptor: &PatchDescriptor, config: LiveConfig) -> Option<Self> {
        match descriptor.kind {
            PatchKind::Hook(hook) => Some(Self {
                name: descriptor.name,
                enabled: descriptor.enabled,
                hook,
                config,
            }),
            PatchKind::Transpile { .. } => None,
        }
    }

    /// Current configuration, if available and the descriptor is enabled
    fn active(&self) -> Option<Arc<Configuration>> {
        let config = self
            .config
            .snapshot()
            .ok()
            .filter(|config| (self.enabled)(config));
        if config.is_none() {
            trace!(descriptor = self.name, "hook inactive");
        }
        config
    }
}

impl CallHook for GatedHook {
    fn before_call(&self, args: &mut CallArgs) -> CallFlow {
        match (self.hook.before, self.active()) {
            (Some(before), Some(config)) => before(&config, args),
            _ => CallFlow::Continue,
        }
    }

    fn after_call(&self, args: &CallArgs, result: &mut Value) {
        if let (Some(after), Some(config)) = (self.hook.after, self.active()) {
            after(&config, args, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::MethodRef;

    fn server_enabled(config: &Configuration) -> bool {
        config.server.enabled
    }

    fn force_true(_: &Configuration, _: &CallArgs, result: &mut Value) {
        *result = Value::Bool(true);
    }

    fn descriptor() -> PatchDescriptor {
        PatchDescriptor::hook(
            "test.flag",
            MethodRef::static_method("Test", "Flag", 0, true),
            server_enabled,
            HookPatch {
                before: None,
                after: Some(force_true),
            },
        )
    }

    #[test]
    /// The enable condition is read on every call
    fn test_gate_follows_config() {
        let config = LiveConfig::new(Configuration::default());
        let hook = GatedHook::new(&descriptor(), config.clone()).unwrap();

        let mut result = Value::Bool(false);
        hook.after_call(&CallArgs::default(), &mut result);
        assert_eq!(result, Value::Bool(false));

        let mut enabled = Configuration::default();
        enabled.server.enabled = true;
        config.replace(enabled);
        hook.after_call(&CallArgs::default(), &mut result);
        assert_eq!(result, Value::Bool(true));

        config.clear();
        let mut result = Value::Bool(false);
        hook.after_call(&CallArgs::default(), &mut result);
        assert_eq!(result, Value::Bool(false));
        let flow = hook.before_call(&mut CallArgs::default());
        assert_eq!(flow, CallFlow::Continue);
    }
}
