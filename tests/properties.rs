#![allow(clippy::unwrap_used)]

//! Properties every rewrite has to hold for arbitrary bodies

use proptest::prelude::*;

use libtranspile::config::{Configuration, LiveConfig};
use libtranspile::diagnostics::DiagnosticKind;
use libtranspile::editor::{self, EditOp};
use libtranspile::instr::{Instruction, InstructionStream, OpCode};
use libtranspile::patch::{PatchRegistry, Rewrite};
use libtranspile::patches::time;

/// What happens to one instruction of a `nop` body
#[derive(Debug, Clone)]
enum Action {
    Keep,
    Remove,
    Insert(i32),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::Keep),
        Just(Action::Remove),
        any::<i32>().prop_map(Action::Insert),
    ]
}

fn edit_strategy(len: usize) -> impl Strategy<Value = EditOp> {
    prop_oneof![
        (0..len, 0..3usize).prop_map(|(position, count)| {
            EditOp::InsertAfter(position, vec![Instruction::new(OpCode::Nop); count])
        }),
        (0..len).prop_map(|position| EditOp::ReplaceAt(position, Instruction::new(OpCode::Nop))),
        (0..len, 0..4usize).prop_map(|(position, count)| EditOp::RemoveRange(position, count)),
    ]
}

/// `this` plus a run of `ldc.r4 x; add`, returning the sum
fn float_body(values: &[f32]) -> InstructionStream {
    let mut instructions = vec![Instruction::ldarg(1)];
    for value in values {
        instructions.push(Instruction::ldc_r4(*value));
        instructions.push(Instruction::new(OpCode::Add));
    }
    instructions.push(Instruction::new(OpCode::Ret));
    InstructionStream::new(instructions).returning_value()
}

/// `count` instructions of `nop` followed by `ret`
fn nop_body(count: usize) -> InstructionStream {
    let mut instructions = vec![Instruction::new(OpCode::Nop); count];
    instructions.push(Instruction::new(OpCode::Ret));
    InstructionStream::new(instructions)
}

fn time_registry() -> PatchRegistry {
    let mut config = Configuration::default();
    config.time.enabled = true;
    config.time.night_percent = 40.0;
    PatchRegistry::builtin(LiveConfig::new(config))
}

fn constant_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![
        Just(time::ORIGINALS[0]),
        Just(time::ORIGINALS[1]),
        Just(time::ORIGINALS[2]),
        1.0f32..100.0,
    ]
}

proptest! {
    /// Property: a body without any anchor comes back exactly as it went in
    #[test]
    fn fallback_is_exact(values in prop::collection::vec(1.0f32..100.0, 0..24)) {
        let registry = time_registry();
        let body = float_body(&values);

        registry.begin_cycle();
        prop_assert_eq!(registry.rewrite(&time::RESCALE_DAY_FRACTION, &body), body);

        let journal = registry.journal();
        prop_assert_eq!(journal.len(), 1);
        prop_assert_eq!(journal[0].kind, DiagnosticKind::AnchorNotFound);
    }

    /// Property: rewriting the same body twice gives the same result
    #[test]
    fn rewrite_is_deterministic(values in prop::collection::vec(constant_strategy(), 0..24)) {
        let registry = time_registry();
        let body = float_body(&values);

        let first = registry.rewrite(&time::RESCALE_DAY_FRACTION, &body);
        let second = registry.rewrite(&time::RESCALE_DAY_FRACTION, &body);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), body.len());
        prop_assert_eq!(editor::verify(&first), Ok(()));
    }

    /// Property: an accepted edit list always yields a valid body and leaves the input alone
    #[test]
    fn accepted_edits_verify(
        (len, ops) in (1..16usize).prop_flat_map(|len| {
            (Just(len), prop::collection::vec(edit_strategy(len + 1), 0..8))
        })
    ) {
        let body = nop_body(len);
        let before = body.clone();

        if let Ok(edited) = editor::apply(&body, &ops) {
            prop_assert_eq!(editor::verify(&edited), Ok(()));
        }
        prop_assert_eq!(body, before);
    }

    /// Property: disjoint keeps, removes and inserts always apply and produce the expected length
    #[test]
    fn disjoint_edits_apply(actions in prop::collection::vec(action_strategy(), 0..32)) {
        let body = nop_body(actions.len());

        let mut expected = body.len();
        let ops: Vec<EditOp> = actions
            .iter()
            .enumerate()
            .filter_map(|(position, action)| match action {
                Action::Keep => None,
                Action::Remove => {
                    expected -= 1;
                    Some(EditOp::RemoveRange(position, 1))
                }
                Action::Insert(value) => {
                    expected += 2;
                    Some(EditOp::InsertAfter(
                        position,
                        vec![Instruction::ldc_i4(*value), Instruction::new(OpCode::Pop)],
                    ))
                }
            })
            .collect();

        let edited = editor::apply(&body, &ops).unwrap();
        prop_assert_eq!(edited.len(), expected);
        let ret = Instruction::new(OpCode::Ret);
        prop_assert_eq!(edited.instructions.last(), Some(&ret));
    }
}
