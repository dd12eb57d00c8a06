//! # Placement
//!
//! Free placement rotation: the ghost's rotation comes from a provider, not fixed rotation steps

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::instr::{Instruction, InstructionStream, MethodRef};
use crate::matcher::{AnchorPattern, Predicate};
use crate::patch::{Anchor, Matches, PatchDescriptor};

/// Instructions building the three `Euler` arguments
const EULER_ARGS_LEN: usize = 8;

lazy_static! {
    /// `Player.UpdatePlacementGhost(bool)`
    pub static ref UPDATE_PLACEMENT_GHOST: MethodRef =
        MethodRef::instance_method("Player", "UpdatePlacementGhost", 1, false);
    /// `Quaternion.Euler(float, float, float)`
    pub static ref QUATERNION_EULER: MethodRef =
        MethodRef::static_method("Quaternion", "Euler", 3, true);
    /// Provider: `GetRotation(Player)`
    pub static ref GET_ROTATION: MethodRef =
        MethodRef::static_method("FreePlacementRotation", "GetRotation", 1, true);
}

/// `Quaternion.Euler(..)` becomes `GetRotation(this)`
fn rotation_from_provider(
    _: &Configuration,
    matches: &Matches,
    _: &InstructionStream,
) -> Vec<EditOp> {
    match matches.first(0) {
        Some(position) => vec![
            EditOp::RemoveRange(position - EULER_ARGS_LEN, EULER_ARGS_LEN - 1),
            EditOp::ReplaceAt(position - 1, Instruction::ldarg(0)),
            EditOp::ReplaceAt(position, Instruction::call(GET_ROTATION.clone())),
        ],
        None => Vec::new(),
    }
}

/// Placement descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    let euler = AnchorPattern::new(Predicate::calls(QUATERNION_EULER.clone()))
        .at(-(EULER_ARGS_LEN as isize), Predicate::any());
    vec![PatchDescriptor::transpile(
        "free_placement_rotation",
        UPDATE_PLACEMENT_GHOST.clone(),
        |config| config.free_placement_rotation.enabled,
        vec![Anchor::first(euler)],
        rotation_from_provider,
    )]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::LiveConfig;
    use crate::instr::{FieldRef, OpCode};
    use crate::patch::PatchState;

    /// Ghost rotation from `Quaternion.Euler(0, m_placeRotationDegrees * m_placeRotation, 0)`
    fn update_placement_ghost() -> InstructionStream {
        InstructionStream::new(vec![
            Instruction::ldc_r4(0.0),
            Instruction::ldarg(0),
            Instruction::ldfld(FieldRef::new("Player", "m_placeRotationDegrees")),
            Instruction::ldarg(0),
            Instruction::ldfld(FieldRef::new("Player", "m_placeRotation")),
            Instruction::new(OpCode::ConvR4),
            Instruction::new(OpCode::Mul),
            Instruction::ldc_r4(0.0),
            Instruction::call(QUATERNION_EULER.clone()),
            Instruction::stloc(0),
            Instruction::new(OpCode::Ret),
        ])
        .with_locals(1)
    }

    #[test]
    /// The argument sequence collapses to `this` and the provider call
    fn test_free_rotation() {
        let mut config = Configuration::default();
        config.free_placement_rotation.enabled = true;

        let live = LiveConfig::new(config);
        let result = descriptors()[0].run(&live, &update_placement_ghost());
        assert_eq!(result.state, PatchState::Verified);
        assert_eq!(
            result.stream.instructions,
            vec![
                Instruction::ldarg(0),
                Instruction::call(GET_ROTATION.clone()),
                Instruction::stloc(0),
                Instruction::new(OpCode::Ret),
            ]
        );
    }
}
