//! Instruction predicates: the building blocks of an [`AnchorPattern`](super::AnchorPattern)

use crate::instr::{FieldRef, Instruction, MethodRef, OpCode, Operand};

/// Coarse opcode families, for predicates that don't care about the exact opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Any instruction
    Any,
    /// `ldnull`, `ldc.*`, `ldstr`
    LoadConstant,
    /// `ldloc`
    LoadLocal,
    /// `stloc`
    StoreLocal,
    /// `ldarg`
    LoadArg,
    /// `call`, `callvirt`
    Call,
    /// Any branch, conditional or not
    Branch,
    /// `ldfld`, `ldsfld`
    FieldLoad,
    /// `stfld`, `stsfld`
    FieldStore,
}

impl OpClass {
    /// Whether `opcode` belongs to this class
    pub fn contains(self, opcode: OpCode) -> bool {
        use OpCode::*;
        match self {
            Self::Any => true,
            Self::LoadConstant => matches!(opcode, Ldnull | LdcI4 | LdcR4 | Ldstr),
            Self::LoadLocal => opcode == Ldloc,
            Self::StoreLocal => opcode == Stloc,
            Self::LoadArg => opcode == Ldarg,
            Self::Call => matches!(opcode, Call | Callvirt),
            Self::Branch => matches!(opcode, Br | Brtrue | Brfalse | Beq | Bne | Bgt | Blt),
            Self::FieldLoad => matches!(opcode, Ldfld | Ldsfld),
            Self::FieldStore => matches!(opcode, Stfld | Stsfld),
        }
    }
}

/// Which opcodes a predicate accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpMatch {
    /// One exact opcode
    Exact(OpCode),
    /// Any opcode of a class
    Class(OpClass),
}

/// Check applied to the operand once the opcode matched
#[derive(Debug, Clone)]
pub enum OperandCheck {
    /// Operand is not inspected
    Any,
    /// Operand equals this one, floats within tolerance
    Equals(Operand),
    /// Operand is a call to this method
    Calls(MethodRef),
    /// Instruction loads this field
    Field(FieldRef),
    /// Free-form check on the whole instruction
    Custom(fn(&Instruction) -> bool),
}

/// Predicate over a single instruction
#[derive(Debug, Clone)]
pub struct Predicate {
    /// Opcode test
    op: OpMatch,
    /// Operand test
    operand: OperandCheck,
}

impl Predicate {
    /// Matches one exact opcode, any operand
    pub fn op(opcode: OpCode) -> Self {
        Self {
            op: OpMatch::Exact(opcode),
            operand: OperandCheck::Any,
        }
    }

    /// Matches any opcode of `class`, any operand
    pub fn class(class: OpClass) -> Self {
        Self {
            op: OpMatch::Class(class),
            operand: OperandCheck::Any,
        }
    }

    /// Matches every instruction
    pub fn any() -> Self {
        Self::class(OpClass::Any)
    }

    /// Matches instructions for which `check` holds
    pub fn custom(check: fn(&Instruction) -> bool) -> Self {
        Self::any().with_check(OperandCheck::Custom(check))
    }

    /// Matches `call`/`callvirt` of `method`
    pub fn calls(method: MethodRef) -> Self {
        Self::class(OpClass::Call)
            .with_check(OperandCheck::Calls(method))
    }

    /// Matches `ldfld`/`ldsfld` of `field`
    pub fn loads_field(field: FieldRef) -> Self {
        Self::class(OpClass::FieldLoad)
            .with_check(OperandCheck::Field(field))
    }

    /// Matches `ldc.r4` of a value close to `value`
    pub fn ldc_r4(value: f32) -> Self {
        Self::op(OpCode::LdcR4).with_operand(Operand::Float(value))
    }

    /// Restricts the operand to one equal to `operand`
    pub fn with_operand(self, operand: Operand) -> Self {
        self.with_check(OperandCheck::Equals(operand))
    }

    /// Replaces the operand check
    pub fn with_check(mut self, check: OperandCheck) -> Self {
        self.operand = check;
        self
    }

    /// Evaluates the predicate against `instr`
    pub fn matches(&self, instr: &Instruction) -> bool {
        let op_ok = match self.op {
            OpMatch::Exact(opcode) => instr.opcode == opcode,
            OpMatch::Class(class) => class.contains(instr.opcode),
        };
        op_ok
            && match &self.operand {
                OperandCheck::Any => true,
                OperandCheck::Equals(expected) => instr
                    .operand
                    .as_ref()
                    .is_some_and(|operand| operand.approx_eq(expected)),
                OperandCheck::Calls(method) => instr.calls(method),
                OperandCheck::Field(field) => instr.loads_field(field),
                OperandCheck::Custom(check) => check(instr),
            }
    }
}
