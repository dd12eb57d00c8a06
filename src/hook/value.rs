//! # Call Values
//!
//! Values crossing the hook boundary: call arguments, results and the before-hook verdict

use std::fmt::{self, Display};

/// Opaque handle to a host object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

/// A value as seen by hooks
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value, the result of a `void` call
    #[default]
    Unit,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f32),
    /// String
    Str(String),
    /// Host object
    Object(ObjectHandle),
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Object(handle) => write!(f, "#{}", handle.0),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Arguments of an intercepted call. Hooks may overwrite them before the original runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallArgs {
    /// Receiver, for instance methods
    pub this: Option<Value>,
    /// Positional arguments
    pub args: Vec<Value>,
}

impl CallArgs {
    /// Arguments of a static call
    pub fn new(args: Vec<Value>) -> Self {
        Self { this: None, args }
    }

    /// Arguments of an instance call on `this`
    pub fn with_this(this: Value, args: Vec<Value>) -> Self {
        Self {
            this: Some(this),
            args,
        }
    }

    /// Argument at `index`
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Overwrites the argument at `index`. Returns the previous value, `None` if there is no such
    /// argument.
    pub fn set(&mut self, index: usize, value: Value) -> Option<Value> {
        self.args
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value))
    }
}

/// Verdict of a before-hook
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallFlow {
    /// Run the original call
    #[default]
    Continue,
    /// Skip the original call and use this result instead
    Skip(Value),
}
