//! # Building
//!
//! Comfort radius: the first float constant of the nearby piece search is the radius

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::instr::{Instruction, InstructionStream, MethodRef, OpCode};
use crate::matcher::Predicate;
use crate::patch::{Anchor, Matches, PatchDescriptor};

/// Radius the host uses unpatched
const DEFAULT_COMFORT_RADIUS: f32 = 10.0;

lazy_static! {
    /// `SE_Rested.GetNearbyComfortPieces(Vector3)`
    pub static ref GET_NEARBY_COMFORT_PIECES: MethodRef =
        MethodRef::static_method("SE_Rested", "GetNearbyComfortPieces", 1, true);
}

/// Only worth patching when the radius differs from the host's
fn comfort_radius_enabled(config: &Configuration) -> bool {
    config.building.enabled && config.building.piece_comfort_radius != DEFAULT_COMFORT_RADIUS
}

/// Swaps in the configured radius, kept within `1..=300`
fn comfort_radius(config: &Configuration, matches: &Matches, _: &InstructionStream) -> Vec<EditOp> {
    let radius = config.building.piece_comfort_radius.clamp(1.0, 300.0);
    matches
        .first(0)
        .map(|position| EditOp::ReplaceAt(position, Instruction::ldc_r4(radius)))
        .into_iter()
        .collect()
}

/// Building descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    vec![PatchDescriptor::transpile(
        "building.comfort_radius",
        GET_NEARBY_COMFORT_PIECES.clone(),
        comfort_radius_enabled,
        vec![Anchor::first(Predicate::op(OpCode::LdcR4))],
        comfort_radius,
    )]
}
