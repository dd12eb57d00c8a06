//! # Hook
//!
//! This module covers hooks, which wrap a call with before/after callbacks without touching its
//! body.
//!
//! A [`CallHook`] is the callback pair. Installing one through a [`Hook`] implementation returns a
//! [`HookGuard`]; the hook stays installed for as long as the guard lives.

use std::sync::Arc;

use thiserror::Error;

use crate::instr::MethodRef;

pub mod table;
pub mod value;

pub use table::{HookHandle, HookTable};
pub use value::{CallArgs, CallFlow, ObjectHandle, Value};

/// Errors while installing hooks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// This exact hook is already installed on the method
    #[error("hook is already installed on {method}")]
    AlreadyInstalled {
        /// Target method, rendered
        method: String,
    },
}

/// Before/after callbacks around a call.
///
/// Both run synchronously on the caller's thread, around the original call.
pub trait CallHook: Send + Sync {
    /// Runs before the original. May overwrite arguments or skip the original with
    /// [`CallFlow::Skip`].
    fn before_call(&self, _args: &mut CallArgs) -> CallFlow {
        CallFlow::Continue
    }

    /// Runs after the original, or after a skip. May overwrite the result.
    fn after_call(&self, _args: &CallArgs, _result: &mut Value) {}
}

/// Trait for things hooks can be installed into
pub trait Hook {
    /// Errors that could happen while installing a hook
    type Error;
    /// Hook guard to allow hooks to be automatically removed when the guard goes out of scope
    type Guard<'a>: HookGuard + 'a
    where
        Self: 'a;

    /// Installs `hook` around every call to `target`
    fn hook(
        &self,
        target: MethodRef,
        hook: Arc<dyn CallHook>,
    ) -> Result<Self::Guard<'_>, Self::Error>;
}

/// Guard for a currently installed hook
///
/// Implementations must fully remove the hook whether dropped or unhooked via `unhook`
pub trait HookGuard: Sized {
    /// Manually unhooks the hook rather than letting the guard go out of scope
    fn unhook(self) {
        // most guards will implement all functionality in [`Drop::drop`]
    }
}
