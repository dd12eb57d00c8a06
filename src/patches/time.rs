//! # Time
//!
//! Day/night cycle patches.
//!
//! The host maps the time of day onto a fraction where night is everything within 0.15 of midnight,
//! then rescales day and night onto fixed halves. Replacing the constants `0.15`, `0.85` and `0.70`
//! with `h`, `1 - h` and `1 - 2h` changes the share of night, where `h` is half the night fraction.

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::hook::{CallArgs, Value};
use crate::instr::{Instruction, InstructionStream, MethodRef};
use crate::matcher::Predicate;
use crate::patch::{Anchor, HookPatch, Matches, PatchDescriptor};

lazy_static! {
    /// `EnvMan.RescaleDayFraction(float)`
    pub static ref RESCALE_DAY_FRACTION: MethodRef =
        MethodRef::instance_method("EnvMan", "RescaleDayFraction", 1, true);
    /// `EnvMan.GetMorningStartSec(int)`
    pub static ref GET_MORNING_START_SEC: MethodRef =
        MethodRef::instance_method("EnvMan", "GetMorningStartSec", 1, true);
    /// `EnvMan.SkipToMorning()`
    pub static ref SKIP_TO_MORNING: MethodRef =
        MethodRef::instance_method("EnvMan", "SkipToMorning", 0, false);
}

/// Constants the host's day fraction math is built on
pub const ORIGINALS: [f32; 3] = [0.15, 0.85, 0.7];

/// Replacements for [`ORIGINALS`] given the share of night in percent
pub fn replacements(night_percent: f32) -> [f32; 3] {
    let half_night = (night_percent / 200.0).clamp(0.0, 1.0);
    [half_night, 1.0 - half_night, 1.0 - 2.0 * half_night]
}

/// One anchor per original constant
fn constant_anchors(expected: [usize; 3]) -> Vec<Anchor> {
    ORIGINALS
        .iter()
        .zip(expected)
        .map(|(&value, count)| Anchor::all(Predicate::ldc_r4(value), count))
        .collect()
}

/// Rescaling is pointless while the part of day is pinned
fn rescale_enabled(config: &Configuration) -> bool {
    config.time.enabled && !config.time.force_part_of_day
}

/// Replaces every matched constant with its rescaled value
fn rescale(config: &Configuration, matches: &Matches, _: &InstructionStream) -> Vec<EditOp> {
    let values = replacements(config.time.night_percent);
    values
        .iter()
        .enumerate()
        .flat_map(|(anchor, &value)| {
            matches
                .anchor(anchor)
                .iter()
                .map(move |&position| EditOp::ReplaceAt(position, Instruction::ldc_r4(value)))
        })
        .collect()
}

/// Pinning the part of day
fn force_enabled(config: &Configuration) -> bool {
    config.time.enabled && config.time.force_part_of_day
}

/// Returns the pinned day fraction instead of the computed one
fn force_part_of_day(config: &Configuration, _: &CallArgs, result: &mut Value) {
    *result = Value::Float(config.time.force_part_of_day_time.clamp(0.0, 1.0));
}

/// Time descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    vec![
        PatchDescriptor::transpile(
            "time.rescale_day_fraction",
            RESCALE_DAY_FRACTION.clone(),
            rescale_enabled,
            constant_anchors([4, 2, 1]),
            rescale,
        ),
        PatchDescriptor::transpile(
            "time.morning_start",
            GET_MORNING_START_SEC.clone(),
            rescale_enabled,
            constant_anchors([1, 0, 0]),
            rescale,
        ),
        PatchDescriptor::transpile(
            "time.skip_to_morning",
            SKIP_TO_MORNING.clone(),
            rescale_enabled,
            constant_anchors([1, 0, 0]),
            rescale,
        ),
        PatchDescriptor::hook(
            "time.force_part_of_day",
            RESCALE_DAY_FRACTION.clone(),
            force_enabled,
            HookPatch {
                before: None,
                after: Some(force_part_of_day),
            },
        ),
    ]
}
