//! Race model layer.
//!
//! Implements the turn-based race on top of the error types:
//! - Phases and phase sets for skill eligibility
//! - Skills with closed condition/effect variants
//! - Racers with move generators and stack links
//! - The per-trial state: roster, turn bookkeeping, stacking, ranking
//! - The skill activation protocol and temporary-skill patterns
//! - Invariant sanity checks

mod invariants;
mod phase;
mod racer;
mod resolve;
mod skill;
mod state;

pub use invariants::{InvariantViolation, check_invariants};
pub use phase::{Phase, PhaseSet};
pub use racer::{MoveFn, MoveGen, Racer, RacerId};
pub use skill::{Condition, ConditionFn, Effect, EffectFn, Skill, SkillId};
pub use state::RaceState;
