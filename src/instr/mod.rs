//! # Instr
//!
//! This module covers the instruction model: opcodes, operands, the instructions built from them
//! and the method bodies ([`InstructionStream`]) they live in.
//!
//! Instructions are plain values. The only behavior they carry is equality and the static stack
//! effect that the verifier in [`crate::editor`] uses to prove a rewritten body is still balanced.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

pub mod operand;
pub mod stream;

pub use operand::{FieldRef, MethodRef, Operand, OperandKind};
pub use stream::{ExceptionRegion, InstructionStream, RegionKind};

/// Identifier of a branch target. Labels are attached to the instruction they mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub u32);

impl Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// How control leaves an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// Falls through to the next instruction
    Next,
    /// Always jumps to its label operand
    Branch,
    /// Jumps to its label operand or falls through
    ConditionalBranch,
    /// Leaves a protected region, emptying the evaluation stack
    Leave,
    /// Returns from the method
    Return,
    /// Throws the value on top of the stack
    Throw,
    /// Ends a finally handler
    EndFinally,
}

/// Closed set of opcodes understood by the engine.
///
/// Variants that take an operand document the [`OperandKind`] they expect; the verifier rejects
/// any other operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// No operation
    Nop,
    /// Load argument ([`OperandKind::Arg`])
    Ldarg,
    /// Load local ([`OperandKind::Local`])
    Ldloc,
    /// Store local ([`OperandKind::Local`])
    Stloc,
    /// Load a null reference
    Ldnull,
    /// Load an integer constant ([`OperandKind::Int`])
    LdcI4,
    /// Load a float constant ([`OperandKind::Float`])
    LdcR4,
    /// Load a string constant ([`OperandKind::Str`])
    Ldstr,
    /// Load an instance field ([`OperandKind::Field`])
    Ldfld,
    /// Store an instance field ([`OperandKind::Field`])
    Stfld,
    /// Load a static field ([`OperandKind::Field`])
    Ldsfld,
    /// Store a static field ([`OperandKind::Field`])
    Stsfld,
    /// Call a method ([`OperandKind::Method`])
    Call,
    /// Call a virtual method ([`OperandKind::Method`])
    Callvirt,
    /// Construct an object ([`OperandKind::Method`])
    Newobj,
    /// Duplicate the top of the stack
    Dup,
    /// Discard the top of the stack
    Pop,
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Negation
    Neg,
    /// Convert the top of the stack to a float
    ConvR4,
    /// Compare equal
    Ceq,
    /// Compare greater than
    Cgt,
    /// Compare less than
    Clt,
    /// Unconditional branch ([`OperandKind::Label`])
    Br,
    /// Branch if true ([`OperandKind::Label`])
    Brtrue,
    /// Branch if false ([`OperandKind::Label`])
    Brfalse,
    /// Branch if equal ([`OperandKind::Label`])
    Beq,
    /// Branch if not equal ([`OperandKind::Label`])
    Bne,
    /// Branch if greater than ([`OperandKind::Label`])
    Bgt,
    /// Branch if less than ([`OperandKind::Label`])
    Blt,
    /// Leave a protected region ([`OperandKind::Label`])
    Leave,
    /// Return from the method
    Ret,
    /// Throw an exception
    Throw,
    /// End a finally handler
    Endfinally,
}

impl OpCode {
    /// Number of values popped, or `None` when the count comes from the method operand.
    ///
    /// `ret` reports zero here; whether it consumes a value depends on the method body
    /// (see [`InstructionStream::returns_value`]).
    pub fn pop_count(self) -> Option<usize> {
        use OpCode::*;
        Some(match self {
            Nop | Ldarg | Ldloc | Ldnull | LdcI4 | LdcR4 | Ldstr | Ldsfld => 0,
            Br | Leave | Ret | Endfinally => 0,
            Stloc | Ldfld | Stsfld | Dup | Pop | Neg | ConvR4 => 1,
            Brtrue | Brfalse | Throw => 1,
            Stfld | Add | Sub | Mul | Div | Ceq | Cgt | Clt => 2,
            Beq | Bne | Bgt | Blt => 2,
            Call | Callvirt | Newobj => return None,
        })
    }

    /// Number of values pushed, or `None` when the count comes from the method operand.
    pub fn push_count(self) -> Option<usize> {
        use OpCode::*;
        Some(match self {
            Nop | Stloc | Stfld | Stsfld | Pop => 0,
            Br | Brtrue | Brfalse | Beq | Bne | Bgt | Blt | Leave => 0,
            Ret | Throw | Endfinally => 0,
            Ldarg | Ldloc | Ldnull | LdcI4 | LdcR4 | Ldstr | Ldfld | Ldsfld => 1,
            Add | Sub | Mul | Div | Neg | ConvR4 | Ceq | Cgt | Clt => 1,
            Newobj => 1,
            Dup => 2,
            Call | Callvirt => return None,
        })
    }

    /// Operand kind this opcode requires
    pub fn operand_kind(self) -> OperandKind {
        use OpCode::*;
        match self {
            Ldarg => OperandKind::Arg,
            Ldloc | Stloc => OperandKind::Local,
            LdcI4 => OperandKind::Int,
            LdcR4 => OperandKind::Float,
            Ldstr => OperandKind::Str,
            Ldfld | Stfld | Ldsfld | Stsfld => OperandKind::Field,
            Call | Callvirt | Newobj => OperandKind::Method,
            Br | Brtrue | Brfalse | Beq | Bne | Bgt | Blt | Leave => OperandKind::Label,
            _ => OperandKind::None,
        }
    }

    /// How control leaves an instruction with this opcode
    pub fn flow_control(self) -> FlowControl {
        use OpCode::*;
        match self {
            Br => FlowControl::Branch,
            Brtrue | Brfalse | Beq | Bne | Bgt | Blt => FlowControl::ConditionalBranch,
            Leave => FlowControl::Leave,
            Ret => FlowControl::Return,
            Throw => FlowControl::Throw,
            Endfinally => FlowControl::EndFinally,
            _ => FlowControl::Next,
        }
    }

    /// Lower-case mnemonic
    pub fn mnemonic(self) -> &'static str {
        use OpCode::*;
        match self {
            Nop => "nop",
            Ldarg => "ldarg",
            Ldloc => "ldloc",
            Stloc => "stloc",
            Ldnull => "ldnull",
            LdcI4 => "ldc.i4",
            LdcR4 => "ldc.r4",
            Ldstr => "ldstr",
            Ldfld => "ldfld",
            Stfld => "stfld",
            Ldsfld => "ldsfld",
            Stsfld => "stsfld",
            Call => "call",
            Callvirt => "callvirt",
            Newobj => "newobj",
            Dup => "dup",
            Pop => "pop",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Neg => "neg",
            ConvR4 => "conv.r4",
            Ceq => "ceq",
            Cgt => "cgt",
            Clt => "clt",
            Br => "br",
            Brtrue => "brtrue",
            Brfalse => "brfalse",
            Beq => "beq",
            Bne => "bne",
            Bgt => "bgt",
            Blt => "blt",
            Leave => "leave",
            Ret => "ret",
            Throw => "throw",
            Endfinally => "endfinally",
        }
    }
}

/// One instruction of a method body
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Opcode
    pub opcode: OpCode,
    /// Operand, if the opcode takes one
    pub operand: Option<Operand>,
    /// Labels marking this instruction as a branch target
    pub labels: BTreeSet<LabelId>,
}

impl Instruction {
    /// Creates an instruction without an operand
    pub fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
            labels: BTreeSet::new(),
        }
    }

    /// Creates an instruction with an operand
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
            labels: BTreeSet::new(),
        }
    }

    /// `ldarg n`
    pub fn ldarg(index: u16) -> Self {
        Self::with_operand(OpCode::Ldarg, Operand::Arg(index))
    }

    /// `ldloc n`
    pub fn ldloc(slot: u16) -> Self {
        Self::with_operand(OpCode::Ldloc, Operand::Local(slot))
    }

    /// `stloc n`
    pub fn stloc(slot: u16) -> Self {
        Self::with_operand(OpCode::Stloc, Operand::Local(slot))
    }

    /// `ldc.i4 value`
    pub fn ldc_i4(value: i32) -> Self {
        Self::with_operand(OpCode::LdcI4, Operand::Int(value))
    }

    /// `ldc.r4 value`
    pub fn ldc_r4(value: f32) -> Self {
        Self::with_operand(OpCode::LdcR4, Operand::Float(value))
    }

    /// `ldstr value`
    pub fn ldstr(value: impl Into<String>) -> Self {
        Self::with_operand(OpCode::Ldstr, Operand::Str(value.into()))
    }

    /// `ldfld field`
    pub fn ldfld(field: FieldRef) -> Self {
        Self::with_operand(OpCode::Ldfld, Operand::Field(field))
    }

    /// `ldsfld field`
    pub fn ldsfld(field: FieldRef) -> Self {
        Self::with_operand(OpCode::Ldsfld, Operand::Field(field))
    }

    /// `call method`
    pub fn call(method: MethodRef) -> Self {
        Self::with_operand(OpCode::Call, Operand::Method(method))
    }

    /// `callvirt method`
    pub fn callvirt(method: MethodRef) -> Self {
        Self::with_operand(OpCode::Callvirt, Operand::Method(method))
    }

    /// Branch-family instruction targeting `label`
    pub fn branch(opcode: OpCode, label: LabelId) -> Self {
        Self::with_operand(opcode, Operand::Label(label))
    }

    /// Attaches a label to this instruction
    pub fn labelled(mut self, label: LabelId) -> Self {
        self.labels.insert(label);
        self
    }

    /// Values popped by this instruction, resolving call signatures from the operand
    pub fn pop_count(&self) -> usize {
        self.opcode.pop_count().unwrap_or_else(|| match &self.operand {
            Some(Operand::Method(method)) => match self.opcode {
                OpCode::Newobj => usize::from(method.params),
                _ => method.arity(),
            },
            _ => 0,
        })
    }

    /// Values pushed by this instruction, resolving call signatures from the operand
    pub fn push_count(&self) -> usize {
        self.opcode.push_count().unwrap_or_else(|| match &self.operand {
            Some(Operand::Method(method)) => usize::from(method.returns),
            _ => 0,
        })
    }

    /// Branch target, if this instruction carries a label operand
    pub fn target(&self) -> Option<LabelId> {
        match self.operand {
            Some(Operand::Label(label)) => Some(label),
            _ => None,
        }
    }

    /// Whether this is a call (of either flavor) to `method`
    pub fn calls(&self, method: &MethodRef) -> bool {
        matches!(self.opcode, OpCode::Call | OpCode::Callvirt)
            && matches!(&self.operand, Some(Operand::Method(m)) if m == method)
    }

    /// Whether this loads `field`
    pub fn loads_field(&self, field: &FieldRef) -> bool {
        matches!(self.opcode, OpCode::Ldfld | OpCode::Ldsfld)
            && matches!(&self.operand, Some(Operand::Field(f)) if f == field)
    }

    /// Whether this loads a float constant close to `value`
    pub fn loads_float(&self, value: f32) -> bool {
        self.opcode == OpCode::LdcR4
            && matches!(self.operand, Some(Operand::Float(f)) if operand::float_eq(f, value))
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "{label}: ")?;
        }
        f.write_str(self.opcode.mnemonic())?;
        if let Some(operand) = &self.operand {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Fixed stack effects come straight from the opcode table
    fn test_fixed_stack_effect() {
        let dup = Instruction::new(OpCode::Dup);
        assert_eq!((dup.pop_count(), dup.push_count()), (1, 2));

        let blt = Instruction::branch(OpCode::Blt, LabelId(0));
        assert_eq!((blt.pop_count(), blt.push_count()), (2, 0));

        let ldc = Instruction::ldc_r4(0.15);
        assert_eq!((ldc.pop_count(), ldc.push_count()), (0, 1));
    }

    #[test]
    /// Calls take their stack effect from the method signature
    fn test_call_stack_effect() {
        let set = MethodRef::instance_method("ZDO", "Set", 3, false);
        let call = Instruction::callvirt(set.clone());
        assert_eq!((call.pop_count(), call.push_count()), (4, 0));

        let ctor = Instruction::with_operand(OpCode::Newobj, Operand::Method(set));
        assert_eq!((ctor.pop_count(), ctor.push_count()), (3, 1));

        let euler = MethodRef::static_method("Quaternion", "Euler", 3, true);
        let call = Instruction::call(euler);
        assert_eq!((call.pop_count(), call.push_count()), (3, 1));
    }

    #[test]
    /// Operand queries match on both opcode and operand
    fn test_operand_queries() {
        let euler = MethodRef::static_method("Quaternion", "Euler", 3, true);
        let other = MethodRef::static_method("Quaternion", "Identity", 0, true);
        assert!(Instruction::call(euler.clone()).calls(&euler));
        assert!(Instruction::callvirt(euler.clone()).calls(&euler));
        assert!(!Instruction::call(other).calls(&euler));

        assert!(Instruction::ldc_r4(0.150_000_1).loads_float(0.15));
        assert!(!Instruction::ldc_r4(0.16).loads_float(0.15));
        assert!(!Instruction::ldc_i4(0).loads_float(0.0));
    }

    #[test]
    /// Display renders labels, mnemonic and operand
    fn test_display() {
        let instr = Instruction::branch(OpCode::Brfalse, LabelId(3))
            .labelled(LabelId(1));
        assert_eq!(instr.to_string(), "L1: brfalse L3");
        assert_eq!(Instruction::ldloc(2).to_string(), "ldloc V_2");
    }
}
