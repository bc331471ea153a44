//! Turn phases and phase sets.
//!
//! A trial is always in exactly one [`Phase`]; a skill's trigger is a
//! [`PhaseSet`], so one skill can respond to several phases. Sets are built
//! from single phases with `|` and queried with [`PhaseSet::contains`].

use std::fmt;
use std::ops::BitOr;

/// The stage of turn processing a trial is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No trial has been started on this state yet.
    Unstarted,
    /// The trial has just been initialized from the template.
    GameStart,
    /// A new round is being opened: fresh move order, moved-set cleared.
    RoundStart,
    /// A racer has been picked to move and its step count drawn.
    MoveBefore,
    /// The pending move is being applied to the track.
    MoveBegin,
    /// The move has been applied; finish and round bookkeeping runs.
    MoveEnd,
    /// The trial is over and the ranking is final.
    GameEnd,
}

impl Phase {
    const fn bit(self) -> u8 {
        match self {
            Phase::Unstarted => 0,
            Phase::GameStart => 1,
            Phase::RoundStart => 1 << 1,
            Phase::MoveBefore => 1 << 2,
            Phase::MoveBegin => 1 << 3,
            Phase::MoveEnd => 1 << 4,
            Phase::GameEnd => 1 << 5,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Unstarted => "unstarted",
            Phase::GameStart => "game start",
            Phase::RoundStart => "round start",
            Phase::MoveBefore => "move before",
            Phase::MoveBegin => "move begin",
            Phase::MoveEnd => "move end",
            Phase::GameEnd => "game end",
        };
        write!(f, "{name}")
    }
}

/// A set of phases a skill is eligible to trigger in.
///
/// `Unstarted` carries no bit, so a set built only from it is empty and a
/// skill triggered on it can never fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseSet(u8);

impl PhaseSet {
    /// The empty set; a skill with this trigger never fires.
    #[must_use]
    pub const fn empty() -> Self {
        PhaseSet(0)
    }

    /// A set containing a single phase.
    #[must_use]
    pub const fn only(phase: Phase) -> Self {
        PhaseSet(phase.bit())
    }

    /// This set extended with one more phase.
    #[must_use]
    pub const fn with(self, phase: Phase) -> Self {
        PhaseSet(self.0 | phase.bit())
    }

    /// Whether the given phase is a member of this set.
    #[must_use]
    pub const fn contains(self, phase: Phase) -> bool {
        self.0 & phase.bit() != 0
    }

    /// Whether the set has no members.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Phase> for PhaseSet {
    fn from(phase: Phase) -> Self {
        PhaseSet::only(phase)
    }
}

impl BitOr for Phase {
    type Output = PhaseSet;

    fn bitor(self, rhs: Phase) -> PhaseSet {
        PhaseSet::only(self).with(rhs)
    }
}

impl BitOr<Phase> for PhaseSet {
    type Output = PhaseSet;

    fn bitor(self, rhs: Phase) -> PhaseSet {
        self.with(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_phase_membership() {
        let set = PhaseSet::only(Phase::MoveBefore);
        assert!(set.contains(Phase::MoveBefore));
        assert!(!set.contains(Phase::RoundStart));
        assert!(!set.is_empty());
    }

    #[test]
    fn test_multi_phase_set() {
        let set = Phase::RoundStart | Phase::MoveEnd;
        assert!(set.contains(Phase::RoundStart));
        assert!(set.contains(Phase::MoveEnd));
        assert!(!set.contains(Phase::MoveBefore));

        let wider = set | Phase::GameEnd;
        assert!(wider.contains(Phase::GameEnd));
        assert!(wider.contains(Phase::RoundStart));
    }

    #[test]
    fn test_unstarted_is_empty() {
        let set = PhaseSet::only(Phase::Unstarted);
        assert!(set.is_empty());
        assert!(!set.contains(Phase::Unstarted));
    }

    #[test]
    fn test_from_phase() {
        let set: PhaseSet = Phase::GameStart.into();
        assert!(set.contains(Phase::GameStart));
    }
}
