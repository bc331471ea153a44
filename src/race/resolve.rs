//! Skill attachment and the activation protocol.
//!
//! Activation is a three-gate check: the phase must be in the skill's
//! trigger set, the skill's target must be the racer currently being
//! resolved (unless the untargeted entry point is used, as at round start),
//! and the condition must hold. On activation the current racer is rebound
//! to the skill's target for the duration of the effect, then restored.
//!
//! Sweeps iterate over snapshots of both the active roster and each
//! racer's skill list, so an effect may attach or remove skills without
//! corrupting the iteration in progress.

use rand_chacha::ChaCha8Rng;

use crate::error::{SimError, SimResult};
use crate::race::{Condition, Effect, Phase, RaceState, RacerId, Skill, SkillId};

/// Follow-up work decided while the stored effect was mutably borrowed.
enum FollowUp {
    Nothing,
    Steps(i32),
    Run(crate::race::EffectFn),
    FireOneShot(Effect),
    CountdownDone(Skill),
}

impl RaceState {
    // ---- attachment -------------------------------------------------------

    /// Attach a skill to a racer, binding an id and defaulting the skill's
    /// target and owner to that racer if they were left unset.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingRacer`] if the racer is not in the arena.
    pub fn attach_skill(&mut self, racer: RacerId, mut skill: Skill) -> SimResult<SkillId> {
        self.require(racer)?;
        let id = self.alloc_skill_id();
        skill.bind(id, racer);
        if let Some(holder) = self.racer_mut(racer) {
            holder.push_skill(skill);
        }
        Ok(id)
    }

    /// Attach a skill that fires at most once: a wrapper with the same
    /// trigger, condition and metadata applies the inner effect on first
    /// activation and then removes itself.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingRacer`] if the racer is not in the arena.
    pub fn attach_temp_skill(&mut self, racer: RacerId, skill: Skill) -> SimResult<SkillId> {
        let mut wrapper = Skill::new(
            skill.trigger(),
            skill.condition().clone(),
            Effect::OneShot(Box::new(skill.clone())),
        )
        .with_name(skill.name())
        .with_description(skill.description());
        if let Some(target) = skill.target() {
            wrapper = wrapper.with_target(target);
        }
        self.attach_skill(racer, wrapper)
    }

    /// Attach a skill after a delay of `rounds` round starts.
    ///
    /// A countdown carrier triggers at every round start with the target
    /// check bypassed, decrementing its counter; at zero it attaches the
    /// enclosed skill via [`RaceState::attach_temp_skill`] and removes
    /// itself.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingRacer`] if the racer is not in the arena.
    pub fn attach_delayed_skill(
        &mut self,
        racer: RacerId,
        skill: Skill,
        rounds: u32,
    ) -> SimResult<SkillId> {
        let counter = Skill::new(
            Phase::RoundStart,
            Condition::Always(true),
            Effect::Countdown {
                remaining: rounds,
                skill: Box::new(skill),
            },
        )
        .with_name("Round countdown")
        .with_description("Counts down each round start; at zero attaches its enclosed skill");
        self.attach_skill(racer, counter)
    }

    /// Delayed extra movement: after `rounds` round starts, the racer moves
    /// `steps` extra cells once on its next move preparation, then loses
    /// the bonus.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingRacer`] if the racer is not in the arena.
    pub fn attach_delayed_bonus(
        &mut self,
        racer: RacerId,
        steps: i32,
        rounds: u32,
    ) -> SimResult<SkillId> {
        let bonus = Skill::new(
            Phase::MoveBefore,
            Condition::Always(true),
            Effect::ExtraSteps(steps),
        )
        .with_name("Status: extra movement")
        .with_description(format!("Moves {steps} extra cells"));
        self.attach_delayed_skill(racer, bonus, rounds)
    }

    /// Remove a skill from a racer's list.
    ///
    /// Returns whether the skill was present.
    pub fn remove_skill(&mut self, racer: RacerId, skill: SkillId) -> bool {
        self.racer_mut(racer)
            .is_some_and(|holder| holder.remove_skill(skill))
    }

    // ---- activation -------------------------------------------------------

    /// Try to activate one skill with the target check enforced.
    ///
    /// Returns whether the skill fired. A skill or holder that has vanished
    /// since the caller snapshotted it is not an error; the attempt simply
    /// reports `false`.
    ///
    /// # Errors
    ///
    /// Propagates fatal defects from the effect, and reports a skill whose
    /// target was never bound.
    pub fn try_skill(
        &mut self,
        holder: RacerId,
        skill: SkillId,
        phase: Phase,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<bool> {
        self.activate(holder, skill, phase, true, rng)
    }

    /// Try to activate one skill with the target check bypassed.
    ///
    /// Used at round start, a phase with no racer being resolved.
    ///
    /// # Errors
    ///
    /// Propagates fatal defects from the effect, and reports a skill whose
    /// target was never bound.
    pub fn try_skill_untargeted(
        &mut self,
        holder: RacerId,
        skill: SkillId,
        phase: Phase,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<bool> {
        self.activate(holder, skill, phase, false, rng)
    }

    /// Sweep every active racer's skills with the target check enforced.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal defect raised by any activation.
    pub fn resolve_skills(&mut self, phase: Phase, rng: &mut ChaCha8Rng) -> SimResult<()> {
        self.sweep(phase, true, rng)
    }

    /// Sweep every active racer's skills with the target check bypassed.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal defect raised by any activation.
    pub fn resolve_skills_untargeted(
        &mut self,
        phase: Phase,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<()> {
        self.sweep(phase, false, rng)
    }

    fn sweep(&mut self, phase: Phase, respect_target: bool, rng: &mut ChaCha8Rng) -> SimResult<()> {
        let roster: Vec<RacerId> = self.active().to_vec();
        for holder in roster {
            let skills: Vec<SkillId> = match self.racer(holder) {
                Some(racer) => racer.skills().iter().map(Skill::id).collect(),
                None => continue,
            };
            for skill in skills {
                self.activate(holder, skill, phase, respect_target, rng)?;
            }
        }
        Ok(())
    }

    fn activate(
        &mut self,
        holder: RacerId,
        skill: SkillId,
        phase: Phase,
        respect_target: bool,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<bool> {
        let Some(found) = self.racer(holder).and_then(|r| r.skill(skill)) else {
            return Ok(false);
        };
        if !found.trigger().contains(phase) {
            return Ok(false);
        }
        let target = found.target().ok_or(SimError::UnboundSkill(skill))?;
        if respect_target && self.current() != Some(target) {
            return Ok(false);
        }

        let condition = found.condition().clone();
        if !condition.evaluate(self, rng) {
            return Ok(false);
        }

        if let Some(found) = self.racer_mut(holder).and_then(|r| r.skill_mut(skill)) {
            found.note_activation();
        } else {
            return Ok(false);
        }

        let previous = self.current();
        self.set_current(Some(target));
        let applied = self.apply_effect(holder, skill, rng);
        self.set_current(previous);
        applied.map(|()| true)
    }

    fn apply_effect(
        &mut self,
        holder: RacerId,
        skill: SkillId,
        rng: &mut ChaCha8Rng,
    ) -> SimResult<()> {
        let follow_up = {
            let Some(found) = self.racer_mut(holder).and_then(|r| r.skill_mut(skill)) else {
                return Ok(());
            };
            match found.effect_mut() {
                Effect::ExtraSteps(n) => FollowUp::Steps(*n),
                Effect::Mutate(f) => FollowUp::Run(f.clone()),
                Effect::NoOp => FollowUp::Nothing,
                Effect::OneShot(inner) => {
                    inner.note_activation();
                    FollowUp::FireOneShot(inner.effect().clone())
                }
                Effect::Countdown { remaining, skill } => {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        FollowUp::CountdownDone((**skill).clone())
                    } else {
                        FollowUp::Nothing
                    }
                }
            }
        };

        match follow_up {
            FollowUp::Nothing => Ok(()),
            FollowUp::Steps(n) => {
                self.add_pending_steps(n);
                Ok(())
            }
            FollowUp::Run(f) => {
                f(self, rng);
                Ok(())
            }
            FollowUp::FireOneShot(effect) => {
                match effect {
                    Effect::ExtraSteps(n) => self.add_pending_steps(n),
                    Effect::Mutate(f) => f(self, rng),
                    Effect::NoOp => {}
                    Effect::OneShot(_) | Effect::Countdown { .. } => {
                        return Err(SimError::NestedTemporarySkill(skill));
                    }
                }
                self.remove_skill(holder, skill);
                Ok(())
            }
            FollowUp::CountdownDone(inner) => {
                self.attach_temp_skill(holder, inner)?;
                self.remove_skill(holder, skill);
                Ok(())
            }
        }
    }
}
