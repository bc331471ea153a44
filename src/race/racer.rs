//! Racer state: track position, owned skills, move generator, stack links.

use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::race::{Skill, SkillId};

/// Stable identifier for a racer.
///
/// Racers live in a per-state arena that never shrinks during a trial, so
/// an id taken from the template addresses the same racer in every cloned
/// trial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RacerId(pub usize);

impl fmt::Display for RacerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Custom step-count generator.
pub type MoveFn = Arc<dyn Fn(&mut ChaCha8Rng) -> i32 + Send + Sync>;

/// How a racer draws its base step count each move.
#[derive(Clone)]
pub enum MoveGen {
    /// Draw uniformly from a fixed, non-empty list of step counts.
    Choice(Vec<i32>),
    /// Always the same step count.
    Fixed(i32),
    /// Arbitrary generator over the trial RNG.
    Custom(MoveFn),
}

impl MoveGen {
    /// Draw one step count.
    ///
    /// Returns `None` only for an empty choice list, which roster
    /// construction rejects; the engine treats it as a fatal defect.
    #[must_use]
    pub fn draw(&self, rng: &mut ChaCha8Rng) -> Option<i32> {
        match self {
            MoveGen::Choice(choices) => choices.choose(rng).copied(),
            MoveGen::Fixed(n) => Some(*n),
            MoveGen::Custom(f) => Some(f(rng)),
        }
    }
}

impl Default for MoveGen {
    /// The standard die: one of 1, 2 or 3, uniformly.
    fn default() -> Self {
        MoveGen::Choice(vec![1, 2, 3])
    }
}

impl fmt::Debug for MoveGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveGen::Choice(choices) => f.debug_tuple("Choice").field(choices).finish(),
            MoveGen::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            MoveGen::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One participant moving along the track.
#[derive(Debug, Clone)]
pub struct Racer {
    name: String,
    cell: u32,
    skills: Vec<Skill>,
    move_gen: MoveGen,
    head: Option<RacerId>,
    bottom: Option<RacerId>,
}

impl Racer {
    /// Create a racer at cell 0 with the default move generator and no
    /// skills.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Racer {
            name: name.into(),
            cell: 0,
            skills: Vec::new(),
            move_gen: MoveGen::default(),
            head: None,
            bottom: None,
        }
    }

    /// The racer's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cell on the track, 0-based.
    #[must_use]
    pub fn cell(&self) -> u32 {
        self.cell
    }

    /// Whether the racer has reached or passed the finish line.
    #[must_use]
    pub fn is_finished(&self, track_length: u32) -> bool {
        self.cell >= track_length
    }

    /// The racer stacked directly above, if any.
    #[must_use]
    pub fn head(&self) -> Option<RacerId> {
        self.head
    }

    /// The racer stacked directly below, if any.
    #[must_use]
    pub fn bottom(&self) -> Option<RacerId> {
        self.bottom
    }

    /// Whether the racer is part of any stack.
    #[must_use]
    pub fn is_stacked(&self) -> bool {
        self.head.is_some() || self.bottom.is_some()
    }

    /// The racer's skills in attach order.
    #[must_use]
    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    /// Look up an owned skill by id.
    #[must_use]
    pub fn skill(&self, id: SkillId) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id() == id)
    }

    /// The racer's move generator.
    #[must_use]
    pub fn move_gen(&self) -> &MoveGen {
        &self.move_gen
    }

    pub(crate) fn set_move_gen(&mut self, move_gen: MoveGen) {
        self.move_gen = move_gen;
    }

    /// Shift the cell by a signed delta, saturating at cell 0.
    pub(crate) fn shift(&mut self, delta: i32) {
        self.cell = self.cell.saturating_add_signed(delta);
    }

    pub(crate) fn skill_mut(&mut self, id: SkillId) -> Option<&mut Skill> {
        self.skills.iter_mut().find(|s| s.id() == id)
    }

    pub(crate) fn push_skill(&mut self, skill: Skill) {
        self.skills.push(skill);
    }

    pub(crate) fn remove_skill(&mut self, id: SkillId) -> bool {
        let before = self.skills.len();
        self.skills.retain(|s| s.id() != id);
        self.skills.len() != before
    }

    pub(crate) fn set_head(&mut self, head: Option<RacerId>) {
        self.head = head;
    }

    pub(crate) fn set_bottom(&mut self, bottom: Option<RacerId>) {
        self.bottom = bottom;
    }
}
