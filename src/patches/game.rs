//! # Game
//!
//! Player difficulty scaling: the range players are counted in, and the resulting count

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::hook::{CallArgs, Value};
use crate::instr::{FieldRef, Instruction, InstructionStream, MethodRef};
use crate::matcher::{AnchorPattern, OpClass, Predicate};
use crate::patch::{Anchor, HookPatch, Matches, PatchDescriptor};

/// Upper bound applied to the configured range
const MAX_DIFFICULTY_SCALE_RANGE: f32 = 2.0;

lazy_static! {
    /// `Game.GetPlayerDifficulty(Vector3)`
    pub static ref GET_PLAYER_DIFFICULTY: MethodRef =
        MethodRef::instance_method("Game", "GetPlayerDifficulty", 1, true);
    /// `Game.m_difficultyScaleRange`
    pub static ref DIFFICULTY_SCALE_RANGE: FieldRef =
        FieldRef::new("Game", "m_difficultyScaleRange");
}

/// Game section toggle
fn game_enabled(config: &Configuration) -> bool {
    config.game.enabled
}

/// `this.m_difficultyScaleRange` becomes a constant
fn constant_range(config: &Configuration, matches: &Matches, _: &InstructionStream) -> Vec<EditOp> {
    let range = config.game.difficulty_scale_range.min(MAX_DIFFICULTY_SCALE_RANGE);
    match matches.first(0) {
        Some(position) => vec![
            EditOp::RemoveRange(position - 1, 1),
            EditOp::ReplaceAt(position, Instruction::ldc_r4(range)),
        ],
        None => Vec::new(),
    }
}

/// Fixed or padded player count
fn adjust_player_count(config: &Configuration, _: &CallArgs, result: &mut Value) {
    if let Value::Int(count) = result {
        if config.game.set_fixed_player_count_to > 0 {
            *count = i64::from(config.game.set_fixed_player_count_to);
        }
        *count += i64::from(config.game.extra_player_count_nearby);
    }
}

/// Game descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    let field_load = AnchorPattern::new(Predicate::loads_field(DIFFICULTY_SCALE_RANGE.clone()))
        .at(-1, Predicate::class(OpClass::LoadArg));
    vec![
        PatchDescriptor::transpile(
            "game.difficulty_scale_range",
            GET_PLAYER_DIFFICULTY.clone(),
            game_enabled,
            vec![Anchor::first(field_load)],
            constant_range,
        ),
        PatchDescriptor::hook(
            "game.player_difficulty",
            GET_PLAYER_DIFFICULTY.clone(),
            game_enabled,
            HookPatch {
                before: None,
                after: Some(adjust_player_count),
            },
        ),
    ]
}
