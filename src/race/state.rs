//! Per-trial race state.
//!
//! A [`RaceState`] owns the racer arena plus all turn bookkeeping: current
//! phase, round counter, move order, moved-set, pending move amount, the
//! racer being resolved, and the finish order. Racers are addressed by
//! [`RacerId`] into an arena that never shrinks during a trial, so cloning
//! a state clones the whole object graph with every relation intact.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::{SimError, SimResult};
use crate::race::{MoveGen, Phase, Racer, RacerId, SkillId};

/// Complete state of one race trial.
#[derive(Debug, Clone)]
pub struct RaceState {
    /// Racer arena; never shrinks, indexed by `RacerId`.
    racers: Vec<Racer>,
    /// Racers still on the track, in insertion order.
    active: Vec<RacerId>,
    phase: Phase,
    round: u32,
    move_order: Vec<RacerId>,
    moved: HashSet<RacerId>,
    pending_steps: i32,
    current: Option<RacerId>,
    track_length: u32,
    /// Finish order; rank = index + 1.
    finish_order: Vec<RacerId>,
    next_skill_id: u64,
}

impl RaceState {
    /// Create an empty state for a track of the given length.
    #[must_use]
    pub fn new(track_length: u32) -> Self {
        RaceState {
            racers: Vec::new(),
            active: Vec::new(),
            phase: Phase::Unstarted,
            round: 0,
            move_order: Vec::new(),
            moved: HashSet::new(),
            pending_steps: 0,
            current: None,
            track_length,
            finish_order: Vec::new(),
            next_skill_id: 0,
        }
    }

    /// Track length in cells; a racer at `cell >= track_length` has
    /// finished.
    #[must_use]
    pub fn track_length(&self) -> u32 {
        self.track_length
    }

    /// The phase currently being processed.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Rounds started so far; the first round is 1.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    pub(crate) fn bump_round(&mut self) {
        self.round += 1;
    }

    // ---- roster -----------------------------------------------------------

    /// Add a racer to the roster and the active list.
    pub fn add_racer(&mut self, name: impl Into<String>) -> RacerId {
        let id = RacerId(self.racers.len());
        self.racers.push(Racer::new(name));
        self.active.push(id);
        id
    }

    /// Look up a racer by id.
    #[must_use]
    pub fn racer(&self, id: RacerId) -> Option<&Racer> {
        self.racers.get(id.0)
    }

    pub(crate) fn racer_mut(&mut self, id: RacerId) -> Option<&mut Racer> {
        self.racers.get_mut(id.0)
    }

    pub(crate) fn require(&self, id: RacerId) -> SimResult<&Racer> {
        self.racers.get(id.0).ok_or(SimError::MissingRacer(id))
    }

    /// Number of racers ever added, finished or not.
    #[must_use]
    pub fn roster_len(&self) -> usize {
        self.racers.len()
    }

    /// Display names of every racer, in roster order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.racers.iter().map(|r| r.name().to_string()).collect()
    }

    /// Racers still on the track, in insertion order.
    #[must_use]
    pub fn active(&self) -> &[RacerId] {
        &self.active
    }

    /// Whether the racer is still on the track.
    #[must_use]
    pub fn is_active(&self, id: RacerId) -> bool {
        self.active.contains(&id)
    }

    /// Whether the trial is over, i.e. nobody is left on the track.
    #[must_use]
    pub fn is_race_over(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn set_move_gen(&mut self, id: RacerId, move_gen: MoveGen) {
        if let Some(racer) = self.racers.get_mut(id.0) {
            racer.set_move_gen(move_gen);
        }
    }

    pub(crate) fn alloc_skill_id(&mut self) -> SkillId {
        self.next_skill_id += 1;
        SkillId(self.next_skill_id)
    }

    // ---- current racer and pending move -----------------------------------

    /// The racer currently being resolved, if any.
    ///
    /// During a skill effect this is the skill's target, so effect code can
    /// uniformly address "the racer being affected"; it is restored to the
    /// previously-resolving racer afterwards.
    #[must_use]
    pub fn current(&self) -> Option<RacerId> {
        self.current
    }

    pub(crate) fn set_current(&mut self, current: Option<RacerId>) {
        self.current = current;
    }

    /// The step count the current racer is about to move.
    ///
    /// Only meaningful between move preparation and move execution.
    #[must_use]
    pub fn pending_steps(&self) -> i32 {
        self.pending_steps
    }

    pub(crate) fn set_pending_steps(&mut self, steps: i32) {
        self.pending_steps = steps;
    }

    /// Add a delta to the pending step count.
    pub fn add_pending_steps(&mut self, delta: i32) {
        self.pending_steps += delta;
    }

    // ---- move order and moved-set -----------------------------------------

    /// This round's move order.
    #[must_use]
    pub fn move_order(&self) -> &[RacerId] {
        &self.move_order
    }

    /// Replace this round's move order.
    ///
    /// The engine generates a fresh random permutation each round; this
    /// override exists for tests and diagnostics that need a scripted
    /// order.
    pub fn set_move_order(&mut self, order: Vec<RacerId>) {
        self.move_order = order;
    }

    pub(crate) fn shuffle_move_order(&mut self, rng: &mut ChaCha8Rng) {
        let mut order = self.active.clone();
        order.shuffle(rng);
        self.move_order = order;
    }

    /// Whether the racer has completed its move this round.
    #[must_use]
    pub fn is_moved(&self, id: RacerId) -> bool {
        self.moved.contains(&id)
    }

    pub(crate) fn mark_moved(&mut self, id: RacerId) {
        self.moved.insert(id);
    }

    pub(crate) fn clear_moved(&mut self) {
        self.moved.clear();
    }

    /// Whether every racer in the move order has completed a move.
    #[must_use]
    pub fn all_moved(&self) -> bool {
        self.moved.len() == self.move_order.len()
    }

    /// The next racer due to move: the first entry of the move order that
    /// has neither moved this round nor already finished.
    #[must_use]
    pub fn next_mover(&self) -> Option<RacerId> {
        self.move_order
            .iter()
            .copied()
            .find(|id| {
                !self.moved.contains(id)
                    && self
                        .racer(*id)
                        .is_some_and(|r| !r.is_finished(self.track_length))
            })
    }

    // ---- stacking ---------------------------------------------------------

    /// Whether the racer is part of a stack.
    #[must_use]
    pub fn is_stacked(&self, id: RacerId) -> bool {
        self.racer(id).is_some_and(Racer::is_stacked)
    }

    /// Everyone stacked above the racer, bottom-to-top, excluding the racer
    /// itself.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StackCycle`] if the walk revisits a racer, which
    /// means the link graph has been corrupted.
    pub fn stack_above(&self, id: RacerId) -> SimResult<Vec<RacerId>> {
        let mut chain = Vec::new();
        let mut cursor = id;
        while let Some(next) = self.racer(cursor).and_then(Racer::head) {
            if next == id || chain.contains(&next) {
                return Err(SimError::StackCycle(id));
            }
            chain.push(next);
            cursor = next;
        }
        Ok(chain)
    }

    fn set_head_of(&mut self, id: RacerId, head: Option<RacerId>) {
        if let Some(racer) = self.racers.get_mut(id.0) {
            racer.set_head(head);
        }
    }

    fn set_bottom_of(&mut self, id: RacerId, bottom: Option<RacerId>) {
        if let Some(racer) = self.racers.get_mut(id.0) {
            racer.set_bottom(bottom);
        }
    }

    /// Stack `upper` on top of `lower`, detaching any link either side
    /// already holds so the head/bottom relation stays one-to-one.
    pub(crate) fn link_stack(&mut self, upper: RacerId, lower: RacerId) {
        if upper == lower {
            return;
        }
        let old_lower = self.racer(upper).and_then(Racer::bottom);
        if let Some(old) = old_lower {
            self.set_head_of(old, None);
        }
        let old_upper = self.racer(lower).and_then(Racer::head);
        if let Some(old) = old_upper {
            self.set_bottom_of(old, None);
        }
        self.set_bottom_of(upper, Some(lower));
        self.set_head_of(lower, Some(upper));
    }

    /// Drop the racer's bottom link, clearing the reverse link too.
    pub(crate) fn unlink_bottom(&mut self, id: RacerId) {
        let old = self.racer(id).and_then(Racer::bottom);
        if let Some(old) = old {
            self.set_head_of(old, None);
            self.set_bottom_of(id, None);
        }
    }

    /// After a racer lands on a new cell, rebuild its bottom link: the
    /// first active racer (in roster order, excluding itself) sharing the
    /// cell becomes its bottom; with no match any existing bottom link is
    /// cleared.
    pub(crate) fn rescan_bottom(&mut self, id: RacerId) {
        let Some(cell) = self.racer(id).map(Racer::cell) else {
            return;
        };
        let found = self
            .active
            .iter()
            .copied()
            .find(|&other| other != id && self.racer(other).is_some_and(|r| r.cell() == cell));
        match found {
            Some(lower) => self.link_stack(id, lower),
            None => self.unlink_bottom(id),
        }
    }

    // ---- movement ---------------------------------------------------------

    /// Cascading move: shift the racer, rebuild its bottom link, then carry
    /// everyone stacked above it by the same delta without touching their
    /// links.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingRacer`] for an id outside the arena and
    /// propagates [`SimError::StackCycle`] from the chain walk.
    pub fn move_racer(&mut self, id: RacerId, delta: i32) -> SimResult<()> {
        self.require(id)?;
        if let Some(racer) = self.racers.get_mut(id.0) {
            racer.shift(delta);
        }
        self.rescan_bottom(id);
        for rider in self.stack_above(id)? {
            self.shift_racer(rider, delta);
        }
        Ok(())
    }

    /// Non-cascading move: cell update only, no rescan, no stack mutation.
    pub fn shift_racer(&mut self, id: RacerId, delta: i32) {
        if let Some(racer) = self.racers.get_mut(id.0) {
            racer.shift(delta);
        }
    }

    // ---- ranking ----------------------------------------------------------

    /// Finish order so far; rank = index + 1.
    #[must_use]
    pub fn finish_order(&self) -> &[RacerId] {
        &self.finish_order
    }

    /// The rank assigned to a racer, if it has finished.
    #[must_use]
    pub fn rank_of(&self, id: RacerId) -> Option<u32> {
        self.finish_order
            .iter()
            .position(|&r| r == id)
            .and_then(|pos| u32::try_from(pos + 1).ok())
    }

    /// The trial's name-to-rank mapping, in rank order.
    #[must_use]
    pub fn ranking_by_name(&self) -> Vec<(String, u32)> {
        self.finish_order
            .iter()
            .enumerate()
            .filter_map(|(pos, id)| {
                let name = self.racer(*id)?.name().to_string();
                let rank = u32::try_from(pos + 1).ok()?;
                Some((name, rank))
            })
            .collect()
    }

    /// Retire a racer and its whole above-stack: the racer takes the next
    /// free rank, then each rider in chain order takes the following ranks,
    /// and the group leaves the active roster. Any stack link between the
    /// finishing group and a racer still on the track is severed.
    ///
    /// # Errors
    ///
    /// Propagates [`SimError::StackCycle`] from the chain walk.
    pub(crate) fn finish_racer(&mut self, id: RacerId) -> SimResult<()> {
        let mut group = vec![id];
        group.extend(self.stack_above(id)?);

        // Detach the group from whoever it was standing on.
        self.unlink_bottom(id);

        self.active.retain(|r| !group.contains(r));
        self.finish_order.extend(group);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(names: &[&str], length: u32) -> (RaceState, Vec<RacerId>) {
        let mut state = RaceState::new(length);
        let ids = names.iter().map(|n| state.add_racer(*n)).collect();
        (state, ids)
    }

    #[test]
    fn test_add_racer_preserves_order() {
        let (state, ids) = state_with(&["a", "b", "c"], 10);
        assert_eq!(state.active(), ids.as_slice());
        assert_eq!(state.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_link_stack_is_symmetric() {
        let (mut state, ids) = state_with(&["a", "b"], 10);
        state.link_stack(ids[1], ids[0]);

        assert_eq!(state.racer(ids[1]).and_then(Racer::bottom), Some(ids[0]));
        assert_eq!(state.racer(ids[0]).and_then(Racer::head), Some(ids[1]));
    }

    #[test]
    fn test_link_stack_detaches_previous_links() {
        let (mut state, ids) = state_with(&["a", "b", "c"], 10);
        state.link_stack(ids[1], ids[0]);
        // b now stacks on c instead; a must lose its head link.
        state.link_stack(ids[1], ids[2]);

        assert_eq!(state.racer(ids[0]).and_then(Racer::head), None);
        assert_eq!(state.racer(ids[1]).and_then(Racer::bottom), Some(ids[2]));
        assert_eq!(state.racer(ids[2]).and_then(Racer::head), Some(ids[1]));
    }

    #[test]
    fn test_rescan_bottom_prefers_roster_order() {
        let (mut state, ids) = state_with(&["a", "b", "c"], 10);
        state.shift_racer(ids[0], 4);
        state.shift_racer(ids[1], 4);
        state.shift_racer(ids[2], 4);

        // c lands where both a and b already stand; a wins the tie-break.
        state.rescan_bottom(ids[2]);
        assert_eq!(state.racer(ids[2]).and_then(Racer::bottom), Some(ids[0]));
    }

    #[test]
    fn test_rescan_bottom_clears_when_alone() {
        let (mut state, ids) = state_with(&["a", "b"], 10);
        state.link_stack(ids[1], ids[0]);
        state.shift_racer(ids[1], 3);
        state.rescan_bottom(ids[1]);

        assert!(!state.is_stacked(ids[0]));
        assert!(!state.is_stacked(ids[1]));
    }

    #[test]
    fn test_move_racer_carries_stack() {
        let (mut state, ids) = state_with(&["a", "b", "c"], 20);
        // b on a, c on b; moving a drags both riders.
        state.link_stack(ids[1], ids[0]);
        state.link_stack(ids[2], ids[1]);

        state.move_racer(ids[0], 5).expect("clean chain");
        for id in &ids {
            assert_eq!(state.racer(*id).map(Racer::cell), Some(5));
        }
        // Links survive the carry.
        assert_eq!(state.racer(ids[0]).and_then(Racer::head), Some(ids[1]));
        assert_eq!(state.racer(ids[1]).and_then(Racer::head), Some(ids[2]));
    }

    #[test]
    fn test_stack_above_reports_cycle() {
        let (mut state, ids) = state_with(&["a", "b"], 10);
        state.link_stack(ids[1], ids[0]);
        state.link_stack(ids[0], ids[1]);

        assert_eq!(state.stack_above(ids[0]), Err(SimError::StackCycle(ids[0])));
    }

    #[test]
    fn test_finish_racer_ranks_mover_before_riders() {
        let (mut state, ids) = state_with(&["a", "b", "c"], 10);
        state.link_stack(ids[1], ids[0]);
        state.link_stack(ids[2], ids[1]);

        state.finish_racer(ids[0]).expect("clean chain");
        assert_eq!(state.rank_of(ids[0]), Some(1));
        assert_eq!(state.rank_of(ids[1]), Some(2));
        assert_eq!(state.rank_of(ids[2]), Some(3));
        assert!(state.is_race_over());
    }

    #[test]
    fn test_finish_racer_severs_link_to_track() {
        let (mut state, ids) = state_with(&["a", "b", "c"], 10);
        // b stands on a; only b finishes, a stays on the track.
        state.link_stack(ids[1], ids[0]);

        state.finish_racer(ids[1]).expect("clean chain");
        assert_eq!(state.racer(ids[0]).and_then(Racer::head), None);
        assert!(state.is_active(ids[0]));
        assert!(!state.is_active(ids[1]));
    }

    #[test]
    fn test_next_mover_skips_moved_and_finished() {
        let (mut state, ids) = state_with(&["a", "b", "c"], 5);
        state.set_move_order(ids.clone());

        state.mark_moved(ids[0]);
        state.shift_racer(ids[1], 5); // b has finished
        assert_eq!(state.next_mover(), Some(ids[2]));

        state.mark_moved(ids[2]);
        assert_eq!(state.next_mover(), None);
    }

    #[test]
    fn test_ranking_by_name() {
        let (mut state, ids) = state_with(&["a", "b"], 10);
        state.finish_racer(ids[1]).expect("clean chain");
        state.finish_racer(ids[0]).expect("clean chain");

        assert_eq!(
            state.ranking_by_name(),
            vec![("b".to_string(), 1), ("a".to_string(), 2)]
        );
    }
}
