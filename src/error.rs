//! Error types for the race simulator.

use std::fmt;

use crate::race::{Phase, RacerId, SkillId};

/// Configuration defects detected while building a roster.
///
/// These are reported before any trial runs; a roster that constructs
/// cleanly can only fail later through [`SimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    /// The track length was zero.
    ZeroTrackLength,
    /// A racer handle did not name a racer in the roster.
    UnknownRacer(RacerId),
    /// A skill's explicit target did not name a racer in the roster.
    UnknownTarget(RacerId),
    /// A move generator was given an empty choice list.
    EmptyMoveSet(RacerId),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::ZeroTrackLength => write!(f, "track length must be at least 1"),
            SetupError::UnknownRacer(id) => write!(f, "no racer with id {id}"),
            SetupError::UnknownTarget(id) => write!(f, "skill target {id} is not in the roster"),
            SetupError::EmptyMoveSet(id) => {
                write!(f, "move generator for racer {id} has no choices")
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// Fatal defects detected while a trial is running.
///
/// Each variant indicates a bug in skill authoring or in the engine, not a
/// runtime fault: the trial is aborted and the error surfaced, never mapped
/// to a default game outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// A phase that requires a current racer found none.
    NoCurrentRacer {
        /// The phase being processed when the racer was missing.
        phase: Phase,
    },
    /// A racer id resolved to nothing in the trial arena.
    MissingRacer(RacerId),
    /// A head-chain walk revisited a racer, i.e. the link graph is corrupt.
    StackCycle(RacerId),
    /// A move generator had nothing to draw from.
    EmptyMoveSet(RacerId),
    /// A skill reached resolution without target and owner having been
    /// bound at attach time.
    UnboundSkill(SkillId),
    /// A one-shot or countdown wrapper enclosed another wrapper instead of
    /// a primitive effect.
    NestedTemporarySkill(SkillId),
    /// A move sub-protocol step produced an outcome its caller cannot accept.
    UnexpectedOutcome {
        /// The phase that produced the outcome.
        phase: Phase,
    },
    /// The round counter passed the sanity bound; the configuration cannot
    /// terminate.
    RoundLimitExceeded {
        /// The round at which the trial was abandoned.
        round: u32,
    },
    /// Zero trials were requested from the Monte Carlo entry point.
    NoTrials,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::NoCurrentRacer { phase } => {
                write!(f, "no current racer while processing {phase}")
            }
            SimError::MissingRacer(id) => write!(f, "racer {id} is not in the arena"),
            SimError::StackCycle(id) => {
                write!(f, "stack links above racer {id} form a cycle")
            }
            SimError::EmptyMoveSet(id) => {
                write!(f, "move generator for racer {id} has no choices")
            }
            SimError::UnboundSkill(id) => {
                write!(f, "{id} was never bound to a target and owner")
            }
            SimError::NestedTemporarySkill(id) => {
                write!(f, "{id} wraps another wrapper; inner effects must be primitive")
            }
            SimError::UnexpectedOutcome { phase } => {
                write!(f, "unexpected move outcome at {phase}")
            }
            SimError::RoundLimitExceeded { round } => {
                write!(f, "round {round} exceeds the sanity bound; race cannot terminate")
            }
            SimError::NoTrials => write!(f, "at least one trial is required"),
        }
    }
}

impl std::error::Error for SimError {}

/// Result type for simulation steps.
pub type SimResult<T> = Result<T, SimError>;
