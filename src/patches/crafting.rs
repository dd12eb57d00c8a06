//! # Crafting
//!
//! Crafting and cooking from nearby containers.
//!
//! Both patches route an inventory lookup through a provider that also searches nearby containers.
//! The providers themselves live on the host side; these descriptors only splice the calls in.

use lazy_static::lazy_static;

use crate::config::Configuration;
use crate::editor::EditOp;
use crate::instr::{Instruction, InstructionStream, MethodRef, OpCode};
use crate::matcher::Predicate;
use crate::patch::{Anchor, Matches, PatchDescriptor};

/// Local slot `FindCookableItem` keeps its result in
const COOKABLE_SLOT: u16 = 3;

lazy_static! {
    /// `CookingStation.FindCookableItem()`
    pub static ref FIND_COOKABLE_ITEM: MethodRef =
        MethodRef::instance_method("CookingStation", "FindCookableItem", 0, true);
    /// Provider: `PullCookableItemFromNearbyChests(ItemData fallback, CookingStation station)`
    pub static ref PULL_COOKABLE_ITEM: MethodRef =
        MethodRef::static_method("CraftFromChest", "PullCookableItemFromNearbyChests", 2, true);
    /// `Recipe.GetAmount(int, out int, out ItemData, int)`
    pub static ref RECIPE_GET_AMOUNT: MethodRef =
        MethodRef::instance_method("Recipe", "GetAmount", 4, true);
    /// `Player.GetFirstRequiredItem(Inventory, Recipe, int, out int, out int)`
    pub static ref PLAYER_GET_FIRST_REQUIRED_ITEM: MethodRef =
        MethodRef::instance_method("Player", "GetFirstRequiredItem", 5, true);
    /// Provider: `GetFirstRequiredItem(Player, Inventory, Recipe, int, out int, out int)`
    pub static ref GET_FIRST_REQUIRED_ITEM: MethodRef =
        MethodRef::static_method("CraftFromChest", "GetFirstRequiredItem", 6, true);
}

/// Cooking stations pull from containers
fn cooking_enabled(config: &Configuration) -> bool {
    config.craft_from_chest.enabled && !config.craft_from_chest.disable_cooking_station
}

/// Hands the `null` fallback to the provider along with the station, and uses what it returns
fn pull_cookable(_: &Configuration, matches: &Matches, _: &InstructionStream) -> Vec<EditOp> {
    matches
        .first(0)
        .map(|position| {
            EditOp::InsertAfter(
                position,
                vec![
                    Instruction::ldarg(0),
                    Instruction::call(PULL_COOKABLE_ITEM.clone()),
                    Instruction::stloc(COOKABLE_SLOT),
                    Instruction::ldloc(COOKABLE_SLOT),
                ],
            )
        })
        .into_iter()
        .collect()
}

/// Recipes count container contents
fn recipe_enabled(config: &Configuration) -> bool {
    config.craft_from_chest.enabled
}

/// Swaps the inventory lookup for the container-aware one. Same arity, so the stack is untouched.
fn retarget_required_item(
    _: &Configuration,
    matches: &Matches,
    _: &InstructionStream,
) -> Vec<EditOp> {
    let call = Instruction::call(GET_FIRST_REQUIRED_ITEM.clone());
    matches
        .first(0)
        .map(|position| EditOp::ReplaceAt(position, call))
        .into_iter()
        .collect()
}

/// Crafting descriptors
pub(crate) fn descriptors() -> Vec<PatchDescriptor> {
    vec![
        PatchDescriptor::transpile(
            "craft_from_chest.cooking_station",
            FIND_COOKABLE_ITEM.clone(),
            cooking_enabled,
            vec![Anchor::first(Predicate::op(OpCode::Ldnull))],
            pull_cookable,
        ),
        PatchDescriptor::transpile(
            "craft_from_chest.recipe_amount",
            RECIPE_GET_AMOUNT.clone(),
            recipe_enabled,
            vec![Anchor::first(Predicate::calls(PLAYER_GET_FIRST_REQUIRED_ITEM.clone()))],
            retarget_required_item,
        ),
    ]
}
