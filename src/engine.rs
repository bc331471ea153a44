//! Engine: drives single trials through the phase state machine and
//! repeats them for Monte Carlo aggregation.
//!
//! The engine owns an immutable roster template and one live trial state.
//! Every trial starts by cloning the template wholesale, so trials never
//! share mutable state; the Monte Carlo loop exploits that by cloning the
//! template per rayon worker and merging per-worker histograms with an
//! order-independent fold/reduce.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::{SetupError, SimError, SimResult};
use crate::race::{MoveGen, Phase, RaceState, RacerId, Skill, SkillId};
use crate::stats::RankHistogram;

/// Sanity bound on rounds per trial.
///
/// Every honest configuration finishes in roughly `track length` rounds;
/// a trial that reaches this bound has a move-amount generator or skill
/// set that can stall the race forever, which is a design defect.
pub const SANITY_MAX_ROUNDS: u32 = 100_000;

/// Result of one move sub-protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A racer was prepared and can now move.
    CanNextStep,
    /// A racer moved but others are still due this round.
    NotAllMoved,
    /// Everyone due this round has moved; the round is over.
    AllMoved,
    /// The last racer finished; the trial is over.
    GameEnd,
}

/// Outcome of a completed trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialResult {
    /// Name and rank of every racer, in rank order.
    pub ranking: Vec<(String, u32)>,
    /// Rounds the trial took.
    pub rounds: u32,
}

/// The simulation engine: roster template plus one live trial state.
#[derive(Debug, Clone)]
pub struct Engine {
    template: RaceState,
    state: RaceState,
}

impl Engine {
    /// Create an engine for a track of the given length.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::ZeroTrackLength`] for a zero-length track.
    pub fn new(track_length: u32) -> Result<Self, SetupError> {
        if track_length == 0 {
            return Err(SetupError::ZeroTrackLength);
        }
        let template = RaceState::new(track_length);
        let state = template.clone();
        Ok(Engine { template, state })
    }

    /// Add a racer to the roster template.
    pub fn add_racer(&mut self, name: impl Into<String>) -> RacerId {
        self.template.add_racer(name)
    }

    /// Replace a racer's move generator.
    ///
    /// # Errors
    ///
    /// Rejects unknown racers and empty choice lists.
    pub fn set_move_gen(&mut self, racer: RacerId, move_gen: MoveGen) -> Result<(), SetupError> {
        if self.template.racer(racer).is_none() {
            return Err(SetupError::UnknownRacer(racer));
        }
        if matches!(&move_gen, MoveGen::Choice(choices) if choices.is_empty()) {
            return Err(SetupError::EmptyMoveSet(racer));
        }
        self.template.set_move_gen(racer, move_gen);
        Ok(())
    }

    /// Attach a skill to a racer in the roster template.
    ///
    /// A skill without an explicit target ends up targeting (and owned by)
    /// the attaching racer.
    ///
    /// # Errors
    ///
    /// Rejects unknown racers and skills whose explicit target is not in
    /// the roster.
    pub fn attach_skill(&mut self, racer: RacerId, skill: Skill) -> Result<SkillId, SetupError> {
        if self.template.racer(racer).is_none() {
            return Err(SetupError::UnknownRacer(racer));
        }
        match skill.target() {
            Some(target) if self.template.racer(target).is_none() => {
                Err(SetupError::UnknownTarget(target))
            }
            _ => self
                .template
                .attach_skill(racer, skill)
                .map_err(|_| SetupError::UnknownRacer(racer)),
        }
    }

    /// The immutable roster template.
    #[must_use]
    pub fn template(&self) -> &RaceState {
        &self.template
    }

    /// The live trial state.
    #[must_use]
    pub fn state(&self) -> &RaceState {
        &self.state
    }

    /// Mutable access to the live trial state, for tests and diagnostics
    /// that script move orders between phases.
    pub fn state_mut(&mut self) -> &mut RaceState {
        &mut self.state
    }

    // ---- granular trial driving ------------------------------------------

    /// Start a fresh trial: replace the live state with a deep copy of the
    /// template and enter the game-start phase.
    pub fn begin_trial(&mut self) {
        self.state = self.template.clone();
        self.state.set_phase(Phase::GameStart);
    }

    /// Open a new round on the live state.
    ///
    /// # Errors
    ///
    /// Propagates fatal defects from round-start skill resolution.
    pub fn round_start(&mut self, rng: &mut ChaCha8Rng) -> SimResult<()> {
        phase_round_start(&mut self.state, rng)
    }

    /// Run one move step on the live state: prepare the next racer and, if
    /// one was found, execute and settle its move.
    ///
    /// # Errors
    ///
    /// Propagates fatal defects from any phase of the step.
    pub fn step(&mut self, rng: &mut ChaCha8Rng) -> SimResult<StepOutcome> {
        run_step(&mut self.state, rng)
    }

    /// Close the trial: enter the game-end phase and clear the racer being
    /// resolved.
    pub fn finish_trial(&mut self) {
        phase_game_end(&mut self.state);
    }

    // ---- full runs --------------------------------------------------------

    /// Run one complete trial on the live state.
    ///
    /// # Errors
    ///
    /// Propagates fatal simulation defects; no partial ranking is ever
    /// returned.
    pub fn run_trial(&mut self, rng: &mut ChaCha8Rng) -> SimResult<TrialResult> {
        self.begin_trial();
        drive_trial(&mut self.state, rng)?;
        Ok(TrialResult {
            ranking: self.state.ranking_by_name(),
            rounds: self.state.round(),
        })
    }

    /// Run `trials` independent trials and aggregate their rankings.
    ///
    /// Trial `i` is seeded with `base_seed + i`, so a run is reproducible
    /// regardless of how trials are scheduled across threads.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoTrials`] for a zero trial count and aborts the
    /// whole run on the first fatal defect in any trial.
    pub fn run_trials(&self, trials: u64, base_seed: u64) -> SimResult<RankHistogram> {
        if trials == 0 {
            return Err(SimError::NoTrials);
        }

        (0..trials)
            .into_par_iter()
            .try_fold(
                || RankHistogram::new(self.template.names()),
                |mut hist, trial| -> SimResult<RankHistogram> {
                    let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(trial));
                    let mut state = self.template.clone();
                    state.set_phase(Phase::GameStart);
                    drive_trial(&mut state, &mut rng)?;
                    hist.record(state.finish_order());
                    Ok(hist)
                },
            )
            .try_reduce(
                || RankHistogram::new(self.template.names()),
                |mut merged, part| {
                    merged.merge(&part);
                    Ok(merged)
                },
            )
    }
}

// ---- the phase state machine, shared by live and per-worker states -------

fn phase_round_start(state: &mut RaceState, rng: &mut ChaCha8Rng) -> SimResult<()> {
    state.set_phase(Phase::RoundStart);
    state.clear_moved();
    state.bump_round();
    state.shuffle_move_order(rng);
    state.resolve_skills_untargeted(Phase::RoundStart, rng)
}

fn phase_move_before(state: &mut RaceState, rng: &mut ChaCha8Rng) -> SimResult<StepOutcome> {
    state.set_phase(Phase::MoveBefore);
    let Some(mover) = state.next_mover() else {
        return Ok(StepOutcome::AllMoved);
    };
    state.set_current(Some(mover));

    let drawn = state.require(mover)?.move_gen().draw(rng);
    let steps = drawn.ok_or(SimError::EmptyMoveSet(mover))?;
    state.set_pending_steps(steps);

    state.resolve_skills(Phase::MoveBefore, rng)?;
    Ok(StepOutcome::CanNextStep)
}

fn phase_move_begin(state: &mut RaceState) -> SimResult<()> {
    state.set_phase(Phase::MoveBegin);
    let mover = state.current().ok_or(SimError::NoCurrentRacer {
        phase: Phase::MoveBegin,
    })?;
    let steps = state.pending_steps();
    state.move_racer(mover, steps)
}

fn phase_move_end(state: &mut RaceState) -> SimResult<StepOutcome> {
    state.set_phase(Phase::MoveEnd);
    let mover = state.current().ok_or(SimError::NoCurrentRacer {
        phase: Phase::MoveEnd,
    })?;
    state.mark_moved(mover);

    if state.require(mover)?.is_finished(state.track_length()) {
        state.finish_racer(mover)?;
        state.set_current(None);
        if state.is_race_over() {
            return Ok(StepOutcome::GameEnd);
        }
    }

    if state.all_moved() {
        Ok(StepOutcome::AllMoved)
    } else {
        Ok(StepOutcome::NotAllMoved)
    }
}

fn phase_game_end(state: &mut RaceState) {
    state.set_phase(Phase::GameEnd);
    state.set_current(None);
}

fn run_step(state: &mut RaceState, rng: &mut ChaCha8Rng) -> SimResult<StepOutcome> {
    match phase_move_before(state, rng)? {
        StepOutcome::AllMoved => Ok(StepOutcome::AllMoved),
        StepOutcome::CanNextStep => {
            phase_move_begin(state)?;
            phase_move_end(state)
        }
        StepOutcome::NotAllMoved | StepOutcome::GameEnd => Err(SimError::UnexpectedOutcome {
            phase: Phase::MoveBefore,
        }),
    }
}

/// Drive a freshly cloned state from game start to game end.
fn drive_trial(state: &mut RaceState, rng: &mut ChaCha8Rng) -> SimResult<()> {
    loop {
        phase_round_start(state, rng)?;
        if state.round() > SANITY_MAX_ROUNDS {
            return Err(SimError::RoundLimitExceeded {
                round: state.round(),
            });
        }
        loop {
            match run_step(state, rng)? {
                StepOutcome::NotAllMoved => {}
                StepOutcome::AllMoved => break,
                StepOutcome::GameEnd => {
                    phase_game_end(state);
                    return Ok(());
                }
                StepOutcome::CanNextStep => {
                    return Err(SimError::UnexpectedOutcome {
                        phase: Phase::MoveEnd,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{Condition, Effect};

    fn two_fixed_movers(length: u32) -> Engine {
        let mut engine = Engine::new(length).expect("positive length");
        let a = engine.add_racer("a");
        let b = engine.add_racer("b");
        engine.set_move_gen(a, MoveGen::Fixed(2)).expect("valid");
        engine.set_move_gen(b, MoveGen::Fixed(2)).expect("valid");
        engine
    }

    #[test]
    fn test_zero_track_length_rejected() {
        assert_eq!(Engine::new(0).err(), Some(SetupError::ZeroTrackLength));
    }

    #[test]
    fn test_unknown_racer_rejected() {
        let mut engine = Engine::new(10).expect("positive length");
        let ghost = RacerId(5);
        assert_eq!(
            engine.set_move_gen(ghost, MoveGen::Fixed(1)).err(),
            Some(SetupError::UnknownRacer(ghost))
        );
        let skill = Skill::new(Phase::MoveBefore, Condition::Always(true), Effect::NoOp);
        assert_eq!(
            engine.attach_skill(ghost, skill).err(),
            Some(SetupError::UnknownRacer(ghost))
        );
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut engine = Engine::new(10).expect("positive length");
        let a = engine.add_racer("a");
        let ghost = RacerId(9);
        let skill = Skill::new(Phase::MoveBefore, Condition::Always(true), Effect::NoOp)
            .with_target(ghost);
        assert_eq!(
            engine.attach_skill(a, skill).err(),
            Some(SetupError::UnknownTarget(ghost))
        );
    }

    #[test]
    fn test_empty_move_set_rejected() {
        let mut engine = Engine::new(10).expect("positive length");
        let a = engine.add_racer("a");
        assert_eq!(
            engine.set_move_gen(a, MoveGen::Choice(Vec::new())).err(),
            Some(SetupError::EmptyMoveSet(a))
        );
    }

    #[test]
    fn test_trial_completes_with_full_ranking() {
        let mut engine = two_fixed_movers(10);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let result = engine.run_trial(&mut rng).expect("trial completes");

        assert_eq!(result.ranking.len(), 2);
        let mut ranks: Vec<u32> = result.ranking.iter().map(|(_, r)| *r).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2]);
        assert!(result.rounds >= 1);
        assert_eq!(engine.state().phase(), Phase::GameEnd);
        assert!(engine.state().is_race_over());
    }

    #[test]
    fn test_round_start_prepares_round() {
        let mut engine = two_fixed_movers(10);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        engine.begin_trial();
        engine.round_start(&mut rng).expect("no skills to fail");

        let state = engine.state();
        assert_eq!(state.phase(), Phase::RoundStart);
        assert_eq!(state.round(), 1);
        assert_eq!(state.move_order().len(), 2);
        let mut order = state.move_order().to_vec();
        order.sort_by_key(|id| id.0);
        assert_eq!(order, vec![RacerId(0), RacerId(1)]);
    }

    #[test]
    fn test_run_trials_counts_sum_to_trials() {
        let mut engine = Engine::new(8).expect("positive length");
        engine.add_racer("a");
        engine.add_racer("b");
        engine.add_racer("c");

        let hist = engine.run_trials(50, 99).expect("trials complete");
        assert_eq!(hist.trials(), 50);
        for name in ["a", "b", "c"] {
            assert_eq!(hist.total_for(name), 50);
        }
    }

    #[test]
    fn test_run_trials_is_reproducible() {
        let mut engine = Engine::new(12).expect("positive length");
        engine.add_racer("a");
        engine.add_racer("b");

        let first = engine.run_trials(64, 1234).expect("trials complete");
        let second = engine.run_trials(64, 1234).expect("trials complete");
        assert_eq!(first, second);

        let shifted = engine.run_trials(64, 1235).expect("trials complete");
        // A different base seed is overwhelmingly likely to differ.
        assert_ne!(first, shifted);
    }

    #[test]
    fn test_zero_trials_rejected() {
        let mut engine = Engine::new(10).expect("positive length");
        engine.add_racer("a");
        assert_eq!(engine.run_trials(0, 1).err(), Some(SimError::NoTrials));
    }

    #[test]
    fn test_stalled_race_hits_round_limit() {
        let mut engine = Engine::new(10).expect("positive length");
        let a = engine.add_racer("a");
        engine.set_move_gen(a, MoveGen::Fixed(0)).expect("valid");

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = engine.run_trial(&mut rng);
        assert!(matches!(
            result,
            Err(SimError::RoundLimitExceeded { .. })
        ));
    }
}
