//! # Pickable
//!
//! Pickable yield: the amount a pickable drops goes through a yield calculation before it is used

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::instr::{FieldRef, Instruction, InstructionStream, MethodRef, OpCode, Operand};
use crate::matcher::Predicate;
use crate::patch::{Anchor, Matches, PatchDescriptor};

/// Local slot holding the drop amount
const AMOUNT_SLOT: u16 = 1;

lazy_static! {
    /// `Pickable.RPC_Pick(long, int)`
    pub static ref RPC_PICK: MethodRef =
        MethodRef::instance_method("Pickable", "RPC_Pick", 2, false);
    /// `Pickable.m_itemPrefab`
    pub static ref ITEM_PREFAB: FieldRef = FieldRef::new("Pickable", "m_itemPrefab");
    /// Provider: `CalculateYield(GameObject item, int originalAmount)`
    pub static ref CALCULATE_YIELD: MethodRef =
        MethodRef::static_method("PickableYieldState", "CalculateYield", 2, true);
}

/// `amount = CalculateYield(this.m_itemPrefab, amount)` right after the amount is first stored
fn recalculate_yield(_: &Configuration, matches: &Matches, _: &InstructionStream) -> Vec<EditOp> {
    matches
        .first(0)
        .map(|position| {
            EditOp::InsertAfter(
                position,
                vec![
                    Instruction::ldarg(0),
                    Instruction::ldfld(ITEM_PREFAB.clone()),
                    Instruction::ldloc(AMOUNT_SLOT),
                    Instruction::call(CALCULATE_YIELD.clone()),
                    Instruction::stloc(AMOUNT_SLOT),
                ],
            )
        })
        .into_iter()
        .collect()
}

/// Pickable descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    vec![PatchDescriptor::transpile(
        "pickable.yield",
        RPC_PICK.clone(),
        |config| config.pickable.enabled,
        vec![Anchor::first(
            Predicate::op(OpCode::Stloc).with_operand(Operand::Local(AMOUNT_SLOT)),
        )],
        recalculate_yield,
    )]
}
