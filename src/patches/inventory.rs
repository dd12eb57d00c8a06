//! # Inventory
//!
//! Auto-stacking into containers without moving equipped items

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::instr::{Instruction, InstructionStream, MethodRef};
use crate::matcher::Predicate;
use crate::patch::{Anchor, Matches, PatchDescriptor};

lazy_static! {
    /// `Container.StackAll()`
    pub static ref STACK_ALL: MethodRef =
        MethodRef::instance_method("Container", "StackAll", 0, false);
    /// `Inventory.ContainsItemByName(string)`
    pub static ref INVENTORY_CONTAINS_ITEM_BY_NAME: MethodRef =
        MethodRef::instance_method("Inventory", "ContainsItemByName", 1, true);
    /// Provider: `ContainsItemByName(Inventory, string)`, ignoring equipped items
    pub static ref CONTAINS_UNEQUIPPED_ITEM_BY_NAME: MethodRef =
        MethodRef::static_method("AutoStack", "ContainsItemByName", 2, true);
}

/// Equipment is left out of auto-stacking
fn ignore_equipment_enabled(config: &Configuration) -> bool {
    config.auto_stack.enabled && config.auto_stack.auto_stack_all_ignore_equipment
}

/// Swaps the name lookup for the equipment-aware one
fn retarget_contains(_: &Configuration, matches: &Matches, _: &InstructionStream) -> Vec<EditOp> {
    let call = Instruction::call(CONTAINS_UNEQUIPPED_ITEM_BY_NAME.clone());
    matches
        .first(0)
        .map(|position| EditOp::ReplaceAt(position, call))
        .into_iter()
        .collect()
}

/// Inventory descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    vec![PatchDescriptor::transpile(
        "auto_stack.ignore_equipment",
        STACK_ALL.clone(),
        ignore_equipment_enabled,
        vec![Anchor::first(Predicate::calls(INVENTORY_CONTAINS_ITEM_BY_NAME.clone()))],
        retarget_contains,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiveConfig;
    use crate::instr::{FieldRef, LabelId, OpCode};
    use crate::patch::PatchState;

    #[test]
    /// The lookup inside the stacking loop is retargeted, the loop is untouched
    fn test_ignore_equipment() {
        let body = InstructionStream::new(vec![
            Instruction::ldarg(0).labelled(LabelId(0)),
            Instruction::ldfld(FieldRef::new("Container", "m_inventory")),
            Instruction::ldstr("Wood"),
            Instruction::callvirt(INVENTORY_CONTAINS_ITEM_BY_NAME.clone()),
            Instruction::branch(OpCode::Brtrue, LabelId(0)),
            Instruction::new(OpCode::Ret),
        ]);

        let mut config = Configuration::default();
        config.auto_stack.enabled = true;
        config.auto_stack.auto_stack_all_ignore_equipment = true;

        let result = descriptors()[0].run(&LiveConfig::new(config), &body);
        assert_eq!(result.state, PatchState::Verified);
        assert!(result.stream[3].calls(&CONTAINS_UNEQUIPPED_ITEM_BY_NAME));
        assert_eq!(result.stream[4], body[4]);
        assert_eq!(result.stream.label_position(LabelId(0)), Some(0));
    }
}
