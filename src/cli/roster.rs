//! The built-in demonstration roster.
//!
//! Four racers with distinct skills, used by the `run` and `simulate`
//! commands. All skills go through the ordinary roster-construction
//! surface, so this module doubles as a usage example for the library.

use std::sync::Arc;

use rand::Rng;

use derby::{Condition, Effect, Engine, MoveGen, Phase, SetupError, Skill};

/// Default track length for the demo roster.
#[allow(dead_code)]
pub(crate) const DEFAULT_TRACK_LENGTH: u32 = 23;

/// Build an engine with the four demo racers.
pub(crate) fn demo_engine(track_length: u32) -> Result<Engine, SetupError> {
    let mut engine = Engine::new(track_length)?;

    // Phoebe: a coin flip for one extra cell before every move.
    let phoebe = engine.add_racer("Phoebe");
    engine.attach_skill(
        phoebe,
        Skill::new(
            Phase::MoveBefore,
            Condition::Chance(0.5),
            Effect::ExtraSteps(1),
        )
        .with_name("Phoebe's skill")
        .with_description("50% chance to move 1 extra cell"),
    )?;

    // Zani: swingy step counts, and being stacked can pay off a round
    // later.
    let zani = engine.add_racer("Zani");
    engine.set_move_gen(zani, MoveGen::Choice(vec![1, 3]))?;
    engine.attach_skill(
        zani,
        Skill::new(
            Phase::MoveBefore,
            Condition::Predicate(Arc::new(move |state, rng| {
                state.is_stacked(zani) && rng.r#gen::<f64>() < 0.4
            })),
            Effect::Mutate(Arc::new(move |state, _| {
                state.attach_delayed_bonus(zani, 2, 1).ok();
            })),
        )
        .with_name("Zani's skill")
        .with_description("While stacked, 40% chance to move 2 extra cells next round"),
    )?;

    // Brant: rewarded for moving first.
    let brant = engine.add_racer("Brant");
    engine.attach_skill(
        brant,
        Skill::new(
            Phase::MoveBefore,
            Condition::Predicate(Arc::new(|state, _| {
                state.move_order().first().copied() == state.current()
            })),
            Effect::ExtraSteps(2),
        )
        .with_name("Brant's skill")
        .with_description("If first in the move order, moves 2 extra cells"),
    )?;

    // Roccia: rewarded for moving last.
    let roccia = engine.add_racer("Roccia");
    engine.attach_skill(
        roccia,
        Skill::new(
            Phase::MoveBefore,
            Condition::Predicate(Arc::new(|state, _| {
                state.move_order().last().copied() == state.current()
            })),
            Effect::ExtraSteps(2),
        )
        .with_name("Roccia's skill")
        .with_description("If last in the move order, moves 2 extra cells"),
    )?;

    Ok(engine)
}
