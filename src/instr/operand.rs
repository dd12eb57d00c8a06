//! Operands and the method/field references they carry

use std::fmt::{self, Display};

use super::LabelId;

/// Tolerance used when comparing float constants
pub const FLOAT_TOLERANCE: f32 = 0.000_01;

/// Compares two float constants within [`FLOAT_TOLERANCE`]
pub fn float_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < FLOAT_TOLERANCE
}

/// Reference to a method of the host, used both as a call operand and as a patch target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Declaring type name
    pub declaring_type: String,
    /// Method name
    pub name: String,
    /// Declared parameter count, not counting `this`
    pub params: u8,
    /// Whether the method takes a `this` argument
    pub has_this: bool,
    /// Whether the method returns a value
    pub returns: bool,
}

impl MethodRef {
    /// Reference to an instance method
    pub fn instance_method(declaring_type: &str, name: &str, params: u8, returns: bool) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params,
            has_this: true,
            returns,
        }
    }

    /// Reference to a static method
    pub fn static_method(declaring_type: &str, name: &str, params: u8, returns: bool) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params,
            has_this: false,
            returns,
        }
    }

    /// Number of stack values a call consumes, `this` included
    pub fn arity(&self) -> usize {
        usize::from(self.params) + usize::from(self.has_this)
    }
}

impl Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}/{}", self.declaring_type, self.name, self.params)
    }
}

/// Reference to a field of the host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Declaring type name
    pub declaring_type: String,
    /// Field name
    pub name: String,
}

impl FieldRef {
    /// Creates a field reference
    pub fn new(declaring_type: &str, name: &str) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Discriminant of [`Operand`], used to check that an opcode got the operand it expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand
    None,
    /// [`Operand::Int`]
    Int,
    /// [`Operand::Float`]
    Float,
    /// [`Operand::Str`]
    Str,
    /// [`Operand::Method`]
    Method,
    /// [`Operand::Field`]
    Field,
    /// [`Operand::Local`]
    Local,
    /// [`Operand::Arg`]
    Arg,
    /// [`Operand::Label`]
    Label,
}

/// Instruction operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer constant
    Int(i32),
    /// Float constant
    Float(f32),
    /// String constant
    Str(String),
    /// Method reference
    Method(MethodRef),
    /// Field reference
    Field(FieldRef),
    /// Local variable slot
    Local(u16),
    /// Argument index
    Arg(u16),
    /// Branch target
    Label(LabelId),
}

impl Operand {
    /// Discriminant of this operand
    pub fn kind(&self) -> OperandKind {
        match self {
            Self::Int(_) => OperandKind::Int,
            Self::Float(_) => OperandKind::Float,
            Self::Str(_) => OperandKind::Str,
            Self::Method(_) => OperandKind::Method,
            Self::Field(_) => OperandKind::Field,
            Self::Local(_) => OperandKind::Local,
            Self::Arg(_) => OperandKind::Arg,
            Self::Label(_) => OperandKind::Label,
        }
    }

    /// Equality that treats float constants within [`FLOAT_TOLERANCE`] as equal
    pub fn approx_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => float_eq(*a, *b),
            (a, b) => a == b,
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Method(m) => write!(f, "{m}"),
            Self::Field(field) => write!(f, "{field}"),
            Self::Local(slot) => write!(f, "V_{slot}"),
            Self::Arg(index) => write!(f, "A_{index}"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}
