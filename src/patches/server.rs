//! # Server
//!
//! Dedicated server patches: public servers without a password

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::hook::{CallArgs, CallFlow, Value};
use crate::instr::MethodRef;
use crate::patch::{HookPatch, PatchDescriptor};

lazy_static! {
    /// `FejdStartup.IsPublicPasswordValid(string, World)`
    pub static ref IS_PUBLIC_PASSWORD_VALID: MethodRef =
        MethodRef::instance_method("FejdStartup", "IsPublicPasswordValid", 2, true);
    /// `FejdStartup.GetPublicPasswordError(string, World)`
    pub static ref GET_PUBLIC_PASSWORD_ERROR: MethodRef =
        MethodRef::instance_method("FejdStartup", "GetPublicPasswordError", 2, true);
}

/// Password requirement lifted
fn password_disabled(config: &Configuration) -> bool {
    config.server.enabled && config.server.disable_server_password
}

/// Every password is valid
fn accept_password(_: &Configuration, _: &CallArgs, result: &mut Value) {
    *result = Value::Bool(true);
}

/// No password error, without asking the host
fn clear_password_error(_: &Configuration, _: &mut CallArgs) -> CallFlow {
    CallFlow::Skip(Value::Str(String::new()))
}

/// Server descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    vec![
        PatchDescriptor::hook(
            "server.public_password_valid",
            IS_PUBLIC_PASSWORD_VALID.clone(),
            password_disabled,
            HookPatch {
                before: None,
                after: Some(accept_password),
            },
        ),
        PatchDescriptor::hook(
            "server.public_password_error",
            GET_PUBLIC_PASSWORD_ERROR.clone(),
            password_disabled,
            HookPatch {
                before: Some(clear_password_error),
                after: None,
            },
        ),
    ]
}
