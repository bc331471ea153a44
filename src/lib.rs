// Allow unwrap and long literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Derby: a Monte Carlo simulator for turn-based stacking races.
//!
//! A fixed roster of racers advances along a linear track in rounds, each
//! round moving in a randomized order by a random or skill-modified step
//! count. Racers sharing a cell stack vertically and move together. Many
//! independent trials estimate, per racer, the probability of finishing at
//! each rank.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Monte Carlo runner (rayon)      │
//! ├─────────────────────────────────────┤
//! │      Engine phase state machine     │
//! ├─────────────────────────────────────┤
//! │  Race model (racers, skills, stacks)│
//! └─────────────────────────────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod race;
pub mod stats;

pub use error::{SetupError, SimError, SimResult};

// Re-export key types at crate root for convenience
pub use engine::{Engine, SANITY_MAX_ROUNDS, StepOutcome, TrialResult};
pub use race::{
    Condition, Effect, MoveGen, Phase, PhaseSet, RaceState, Racer, RacerId, Skill, SkillId,
};
pub use stats::{RacerPercentages, RankHistogram, format_percentage};
