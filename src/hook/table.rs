//! # Hook Table
//!
//! Per-method lists of installed hooks, and the dispatcher the host calls around an intercepted
//! call

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::trace;

use super::{CallArgs, CallFlow, CallHook, Hook, HookError, HookGuard, Value};
use crate::instr::MethodRef;

/// Hooks grouped by target method, in installation order
type Hooks = IndexMap<MethodRef, Vec<Arc<dyn CallHook>>>;

/// Whether two hooks are the same installation. Compares data pointers only.
fn same_hook(a: &Arc<dyn CallHook>, b: &Arc<dyn CallHook>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Table of installed hooks
#[derive(Default)]
pub struct HookTable {
    /// Installed hooks
    hooks: Mutex<Hooks>,
}

impl std::fmt::Debug for HookTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks = self.lock();
        f.debug_map()
            .entries(hooks.iter().map(|(method, list)| (method, list.len())))
            .finish()
    }
}

impl HookTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hooks installed on `method`
    pub fn hook_count(&self, method: &MethodRef) -> usize {
        self.lock().get(method).map_or(0, Vec::len)
    }

    /// Whether any hook is installed on `method`
    pub fn is_hooked(&self, method: &MethodRef) -> bool {
        self.hook_count(method) > 0
    }

    /// Runs an intercepted call to `method`.
    ///
    /// Every before-hook runs in installation order; the first one to skip decides the result and
    /// the original is not called. Then every after-hook runs in installation order on the result.
    /// No lock is held while hooks or the original run, so hooks may install or remove hooks
    /// themselves.
    pub fn dispatch<F>(&self, method: &MethodRef, args: &mut CallArgs, original: F) -> Value
    where
        F: FnOnce(&mut CallArgs) -> Value,
    {
        let hooks = self.lock().get(method).cloned().unwrap_or_default();

        let mut skipped = None;
        for hook in &hooks {
            if let CallFlow::Skip(value) = hook.before_call(args) {
                skipped.get_or_insert(value);
            }
        }

        let mut result = match skipped {
            Some(value) => {
                trace!(method = %method, "original call skipped");
                value
            }
            None => original(args),
        };
        for hook in &hooks {
            hook.after_call(args, &mut result);
        }
        result
    }

    /// Locks the table, recovering from a poisoned lock
    fn lock(&self) -> MutexGuard<'_, Hooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes one installation of `hook` from `method`
    fn remove(&self, method: &MethodRef, hook: &Arc<dyn CallHook>) {
        let mut hooks = self.lock();
        if let Some(list) = hooks.get_mut(method) {
            list.retain(|installed| !same_hook(installed, hook));
            if list.is_empty() {
                hooks.shift_remove(method);
            }
        }
    }
}

impl Hook for HookTable {
    type Error = HookError;
    type Guard<'a> = HookHandle<'a>
    where
        Self: 'a;

    fn hook(
        &self,
        target: MethodRef,
        hook: Arc<dyn CallHook>,
    ) -> Result<Self::Guard<'_>, Self::Error> {
        let mut hooks = self.lock();
        let list = hooks.entry(target.clone()).or_default();
        if list.iter().any(|installed| same_hook(installed, &hook)) {
            return Err(HookError::AlreadyInstalled {
                method: target.to_string(),
            });
        }
        list.push(hook.clone());
        trace!(method = %target, "hook installed");

        Ok(HookHandle {
            table: self,
            method: target,
            hook,
        })
    }
}

/// Guard for a hook installed in a [`HookTable`]. Dropping it removes the hook.
pub struct HookHandle<'a> {
    /// Table the hook lives in
    table: &'a HookTable,
    /// Hooked method
    method: MethodRef,
    /// The installed hook
    hook: Arc<dyn CallHook>,
}

impl std::fmt::Debug for HookHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHandle")
            .field("method", &self.method)
            .finish()
    }
}

impl Drop for HookHandle<'_> {
    fn drop(&mut self) {
        self.table.remove(&self.method, &self.hook);
        trace!(method = %self.method, "hook removed");
    }
}

impl HookGuard for HookHandle<'_> {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::hook::ObjectHandle;

    fn target() -> MethodRef {
        MethodRef::instance_method("FejdStartup", "GetPublicPasswordError", 1, true)
    }

    /// Counts calls and optionally skips or overrides
    #[derive(Default)]
    struct Probe {
        /// Before-hook calls
        before: AtomicUsize,
        /// After-hook calls
        after: AtomicUsize,
        /// Skip the original with this result
        skip: Option<&'static str>,
    }

    impl CallHook for Probe {
        fn before_call(&self, args: &mut CallArgs) -> CallFlow {
            self.before.fetch_add(1, Ordering::SeqCst);
            args.set(0, Value::from("patched"));
            match self.skip {
                Some(result) => CallFlow::Skip(Value::from(result)),
                None => CallFlow::Continue,
            }
        }

        fn after_call(&self, _args: &CallArgs, result: &mut Value) {
            self.after.fetch_add(1, Ordering::SeqCst);
            if let Value::Str(text) = result {
                text.push('!');
            }
        }
    }

    #[test]
    /// Hooks see the arguments before the original and the result after it
    fn test_dispatch() {
        let table = HookTable::new();
        let probe = Arc::new(Probe::default());
        let _guard = table.hook(target(), probe.clone()).unwrap();

        let this = Value::Object(ObjectHandle(1));
        let mut args = CallArgs::with_this(this, vec![Value::from("x")]);
        let result = table.dispatch(&target(), &mut args, |args| {
            args.get(0).cloned().unwrap_or_default()
        });

        assert_eq!(result, Value::from("patched!"));
        assert_eq!(probe.before.load(Ordering::SeqCst), 1);
        assert_eq!(probe.after.load(Ordering::SeqCst), 1);
    }

    #[test]
    /// Skipping replaces the original's result, after-hooks still run
    fn test_skip() {
        let table = HookTable::new();
        let skipper = Arc::new(Probe {
            skip: Some(""),
            ..Default::default()
        });
        let _guard = table.hook(target(), skipper).unwrap();

        let mut called = false;
        let mut args = CallArgs::new(vec![Value::Unit]);
        let result = table.dispatch(&target(), &mut args, |_| {
            called = true;
            Value::from("original")
        });
        assert!(!called);
        assert_eq!(result, Value::from("!"));
    }

    #[test]
    /// Dropping or unhooking the guard removes exactly that hook
    fn test_guard_removes() {
        let table = HookTable::new();
        let first = Arc::new(Probe::default());
        let second = Arc::new(Probe::default());

        let first_guard = table.hook(target(), first.clone()).unwrap();
        let second_guard = table.hook(target(), second.clone()).unwrap();
        assert_eq!(table.hook_count(&target()), 2);

        drop(first_guard);
        assert_eq!(table.hook_count(&target()), 1);
        let mut args = CallArgs::new(vec![Value::Unit]);
        table.dispatch(&target(), &mut args, |_| Value::Unit);
        assert_eq!(first.before.load(Ordering::SeqCst), 0);
        assert_eq!(second.before.load(Ordering::SeqCst), 1);

        second_guard.unhook();
        assert!(!table.is_hooked(&target()));
    }

    #[test]
    /// The same hook cannot be installed twice on one method
    fn test_duplicate_install() {
        let table = HookTable::new();
        let probe: Arc<dyn CallHook> = Arc::new(Probe::default());
        let _guard = table.hook(target(), probe.clone()).unwrap();
        assert!(matches!(
            table.hook(target(), probe),
            Err(HookError::AlreadyInstalled { .. })
        ));
    }

    #[test]
    /// Calls to unhooked methods go straight to the original
    fn test_unhooked() {
        let table = HookTable::new();
        let result = table.dispatch(&target(), &mut CallArgs::default(), |_| Value::Int(3));
        assert_eq!(result, Value::Int(3));
    }
}
