//! Skills: conditional, targeted behavior attached to racers.
//!
//! A skill is a trigger (set of phases), a condition, an effect and a
//! target. Conditions and effects are closed variant types dispatched by
//! pattern match; the one-shot and countdown wrappers that the temporary
//! and delayed skill patterns need are explicit [`Effect`] variants rather
//! than captured closures, so their remaining state is visible data.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::race::{PhaseSet, RaceState, RacerId};

/// Unique identifier for an attached skill within one roster.
///
/// Allocated when the skill is attached; identifiers are never reused, so a
/// removed skill's id stays dangling rather than aliasing a newer skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkillId(pub u64);

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skill-{}", self.0)
    }
}

/// Predicate evaluated against the trial state.
///
/// Predicates read the state and may draw randomness; they must not have
/// observable side effects beyond the draw.
pub type ConditionFn = Arc<dyn Fn(&RaceState, &mut ChaCha8Rng) -> bool + Send + Sync>;

/// Effect function mutating the trial state.
pub type EffectFn = Arc<dyn Fn(&mut RaceState, &mut ChaCha8Rng) + Send + Sync>;

/// When a triggered, targeted skill actually fires.
#[derive(Clone)]
pub enum Condition {
    /// Fires (or never fires) unconditionally.
    Always(bool),
    /// Fires with the given probability in `[0, 1)`, one uniform draw per
    /// evaluation.
    Chance(f64),
    /// Fires when the predicate holds for the current state.
    Predicate(ConditionFn),
}

impl Condition {
    /// Evaluate the condition against the state.
    pub(crate) fn evaluate(&self, state: &RaceState, rng: &mut ChaCha8Rng) -> bool {
        match self {
            Condition::Always(value) => *value,
            Condition::Chance(p) => rng.r#gen::<f64>() < *p,
            Condition::Predicate(f) => f(state, rng),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always(value) => f.debug_tuple("Always").field(value).finish(),
            Condition::Chance(p) => f.debug_tuple("Chance").field(p).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// What an activated skill does.
#[derive(Clone)]
pub enum Effect {
    /// Add the given delta to the pending move amount.
    ExtraSteps(i32),
    /// Run an arbitrary state mutation.
    Mutate(EffectFn),
    /// Do nothing; useful as a placeholder while composing skills.
    NoOp,
    /// Apply the inner skill's effect once, then remove this skill from its
    /// owner.
    OneShot(Box<Skill>),
    /// Decrement `remaining` each activation; at zero, attach the inner
    /// skill to the owner as a one-shot and remove this skill.
    Countdown {
        /// Activations left before the inner skill is attached.
        remaining: u32,
        /// The skill to attach when the countdown ends.
        skill: Box<Skill>,
    },
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::ExtraSteps(n) => f.debug_tuple("ExtraSteps").field(n).finish(),
            Effect::Mutate(_) => f.write_str("Mutate(..)"),
            Effect::NoOp => f.write_str("NoOp"),
            Effect::OneShot(inner) => f.debug_tuple("OneShot").field(&inner.name()).finish(),
            Effect::Countdown { remaining, skill } => f
                .debug_struct("Countdown")
                .field("remaining", remaining)
                .field("skill", &skill.name())
                .finish(),
        }
    }
}

/// A unit of conditional behavior owned by a racer.
#[derive(Debug, Clone)]
pub struct Skill {
    id: SkillId,
    trigger: PhaseSet,
    condition: Condition,
    effect: Effect,
    target: Option<RacerId>,
    owner: Option<RacerId>,
    name: String,
    description: String,
    activations: u32,
}

impl Skill {
    /// Create a skill with the given trigger, condition and effect.
    ///
    /// Target and owner are left unset; attaching the skill to a racer
    /// resolves both to that racer unless a target was set explicitly with
    /// [`Skill::with_target`].
    #[must_use]
    pub fn new(trigger: impl Into<PhaseSet>, condition: Condition, effect: Effect) -> Self {
        Skill {
            id: SkillId(0),
            trigger: trigger.into(),
            condition,
            effect,
            target: None,
            owner: None,
            name: String::new(),
            description: String::new(),
            activations: 0,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the display description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Aim the skill at a racer other than its eventual owner.
    #[must_use]
    pub fn with_target(mut self, target: RacerId) -> Self {
        self.target = Some(target);
        self
    }

    /// Identifier assigned at attach time.
    #[must_use]
    pub fn id(&self) -> SkillId {
        self.id
    }

    /// The phases this skill may fire in.
    #[must_use]
    pub fn trigger(&self) -> PhaseSet {
        self.trigger
    }

    /// The firing condition.
    #[must_use]
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// The effect applied on activation.
    #[must_use]
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// The racer this skill acts on, once attached.
    #[must_use]
    pub fn target(&self) -> Option<RacerId> {
        self.target
    }

    /// The racer holding this skill, once attached.
    #[must_use]
    pub fn owner(&self) -> Option<RacerId> {
        self.owner
    }

    /// Display name; filled from the id at attach time if left empty.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// How many times this skill's effect has been applied.
    #[must_use]
    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// Resolve identity at attach time: assign the id, default target and
    /// owner to the attaching racer, and derive a name if none was given.
    pub(crate) fn bind(&mut self, id: SkillId, racer: RacerId) {
        self.id = id;
        if self.target.is_none() {
            self.target = Some(racer);
        }
        if self.owner.is_none() {
            self.owner = Some(racer);
        }
        if self.name.is_empty() {
            self.name = id.to_string();
        }
    }

    /// Record one activation.
    pub(crate) fn note_activation(&mut self) {
        self.activations += 1;
    }

    /// Mutable access to the effect, for in-place countdown bookkeeping.
    pub(crate) fn effect_mut(&mut self) -> &mut Effect {
        &mut self.effect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::Phase;
    use rand::SeedableRng;

    #[test]
    fn test_bind_defaults_target_and_owner() {
        let mut skill = Skill::new(
            Phase::MoveBefore,
            Condition::Always(true),
            Effect::ExtraSteps(2),
        );
        skill.bind(SkillId(7), RacerId(1));

        assert_eq!(skill.id(), SkillId(7));
        assert_eq!(skill.target(), Some(RacerId(1)));
        assert_eq!(skill.owner(), Some(RacerId(1)));
        assert_eq!(skill.name(), "skill-7");
    }

    #[test]
    fn test_bind_keeps_explicit_target() {
        let mut skill = Skill::new(Phase::MoveBefore, Condition::Always(true), Effect::NoOp)
            .with_target(RacerId(0))
            .with_name("hindrance");
        skill.bind(SkillId(1), RacerId(2));

        assert_eq!(skill.target(), Some(RacerId(0)));
        assert_eq!(skill.owner(), Some(RacerId(2)));
        assert_eq!(skill.name(), "hindrance");
    }

    #[test]
    fn test_condition_always() {
        let state = RaceState::new(10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(Condition::Always(true).evaluate(&state, &mut rng));
        assert!(!Condition::Always(false).evaluate(&state, &mut rng));
    }

    #[test]
    fn test_condition_chance_extremes() {
        let state = RaceState::new(10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // p = 0.0 can never fire; p just below 1.0 fires essentially always.
        for _ in 0..100 {
            assert!(!Condition::Chance(0.0).evaluate(&state, &mut rng));
        }
        let fired = (0..100)
            .filter(|_| Condition::Chance(0.999_999).evaluate(&state, &mut rng))
            .count();
        assert!(fired >= 99);
    }

    #[test]
    fn test_condition_predicate_reads_state() {
        let state = RaceState::new(42);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let cond = Condition::Predicate(Arc::new(|state, _| state.track_length() == 42));
        assert!(cond.evaluate(&state, &mut rng));
    }

    #[test]
    fn test_debug_formats() {
        let skill = Skill::new(
            Phase::RoundStart,
            Condition::Chance(0.5),
            Effect::ExtraSteps(1),
        )
        .with_name("coin flip");
        let debug = format!("{skill:?}");
        assert!(debug.contains("coin flip"));
        assert!(debug.contains("Chance"));
    }
}
