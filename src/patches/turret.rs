//! # Turret
//!
//! Unlimited turret ammo: the statement writing the decremented ammo count back is removed

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::instr::{InstructionStream, MethodRef};
use crate::matcher::{AnchorPattern, Predicate};
use crate::patch::{Anchor, Matches, PatchDescriptor};

/// Instructions of `m_nview.GetZDO().Set(s_ammo, ammo - 1, false)`, the call included
const AMMO_UPDATE_LEN: usize = 9;

lazy_static! {
    /// `Turret.ShootProjectile()`
    pub static ref SHOOT_PROJECTILE: MethodRef =
        MethodRef::instance_method("Turret", "ShootProjectile", 0, false);
    /// `ZDO.Set(int, int, bool)`
    pub static ref ZDO_SET: MethodRef = MethodRef::instance_method("ZDO", "Set", 3, false);
}

/// Turrets never use up ammo
fn unlimited_ammo_enabled(config: &Configuration) -> bool {
    config.turret.enabled && config.turret.unlimited_ammo
}

/// Drops the whole statement ending at the anchored call
fn remove_ammo_update(_: &Configuration, matches: &Matches, _: &InstructionStream) -> Vec<EditOp> {
    matches
        .first(0)
        .map(|position| EditOp::RemoveRange(position + 1 - AMMO_UPDATE_LEN, AMMO_UPDATE_LEN))
        .into_iter()
        .collect()
}

/// Turret descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    // the look-behind term keeps the statement start inside the body
    let pattern = AnchorPattern::new(Predicate::calls(ZDO_SET.clone()))
        .at(1 - AMMO_UPDATE_LEN as isize, Predicate::any());
    vec![PatchDescriptor::transpile(
        "turret.unlimited_ammo",
        SHOOT_PROJECTILE.clone(),
        unlimited_ammo_enabled,
        vec![Anchor::first(pattern)],
        remove_ammo_update,
    )]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::LiveConfig;
    use crate::instr::{FieldRef, Instruction, OpCode};
    use crate::patch::PatchState;

    /// `ShootProjectile` firing, then writing back the ammo count
    fn shoot_projectile() -> InstructionStream {
        InstructionStream::new(vec![
            Instruction::ldarg(0),
            Instruction::call(MethodRef::instance_method("Turret", "Fire", 0, false)),
            Instruction::ldarg(0),
            Instruction::ldfld(FieldRef::new("Turret", "m_nview")),
            Instruction::callvirt(MethodRef::instance_method("ZNetView", "GetZDO", 0, true)),
            Instruction::ldsfld(FieldRef::new("ZDOVars", "s_ammo")),
            Instruction::ldloc(0),
            Instruction::ldc_i4(1),
            Instruction::new(OpCode::Sub),
            Instruction::ldc_i4(0),
            Instruction::callvirt(ZDO_SET.clone()),
            Instruction::new(OpCode::Ret),
        ])
        .with_locals(1)
    }

    #[test]
    /// The ammo write-back disappears, everything before it stays
    fn test_unlimited_ammo() {
        let mut config = Configuration::default();
        config.turret.enabled = true;
        config.turret.unlimited_ammo = true;

        let body = shoot_projectile();
        let result = descriptors()[0].run(&LiveConfig::new(config), &body);
        assert_eq!(result.state, PatchState::Verified);
        assert_eq!(
            result.stream.instructions,
            vec![body[0].clone(), body[1].clone(), body[11].clone()]
        );
    }

    #[test]
    /// Ammo is only unlimited when asked for
    fn test_needs_flag() {
        let mut config = Configuration::default();
        config.turret.enabled = true;
        let live = LiveConfig::new(config);
        let result = descriptors()[0].run(&live, &shoot_projectile());
        assert_eq!(result.state, PatchState::Disabled);
        assert_eq!(result.stream, shoot_projectile());
    }
}
