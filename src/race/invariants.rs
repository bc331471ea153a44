//! Race state invariants - sanity checks that detect bugs.
//!
//! These should NEVER trigger in a correctly implemented simulation. If
//! they do, it indicates a bug in the engine or in skill authoring, not a
//! gameplay situation.

use std::collections::HashSet;

use crate::race::{RaceState, Racer, RacerId};

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check all race state invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(state: &RaceState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let ids: Vec<RacerId> = (0..state.roster_len()).map(RacerId).collect();

    for &id in &ids {
        let Some(racer) = state.racer(id) else {
            continue;
        };

        // Stack links must not point at the racer itself.
        if racer.head() == Some(id) || racer.bottom() == Some(id) {
            violations.push(InvariantViolation {
                message: format!("racer {id} is linked to itself"),
            });
        }

        // A.head == B must imply B.bottom == A, and the pair must share a
        // cell.
        if let Some(above) = racer.head() {
            match state.racer(above) {
                Some(upper) => {
                    if upper.bottom() != Some(id) {
                        violations.push(InvariantViolation {
                            message: format!(
                                "racer {id} has head {above} but {above} has bottom {:?}",
                                upper.bottom()
                            ),
                        });
                    }
                    if upper.cell() != racer.cell() {
                        violations.push(InvariantViolation {
                            message: format!(
                                "stacked racers {id} (cell {}) and {above} (cell {}) have drifted apart",
                                racer.cell(),
                                upper.cell()
                            ),
                        });
                    }
                }
                None => violations.push(InvariantViolation {
                    message: format!("racer {id} has head {above} outside the arena"),
                }),
            }
        }

        // B.bottom == A must imply A.head == B.
        if let Some(below) = racer.bottom() {
            let reverse = state.racer(below).and_then(Racer::head);
            if reverse != Some(id) {
                violations.push(InvariantViolation {
                    message: format!(
                        "racer {id} has bottom {below} but {below} has head {reverse:?}"
                    ),
                });
            }
        }

        // Head chains must terminate.
        if state.stack_above(id).is_err() {
            violations.push(InvariantViolation {
                message: format!("head chain above racer {id} does not terminate"),
            });
        }
    }

    // Nobody is both racing and ranked, and nobody is ranked twice.
    let active: HashSet<RacerId> = state.active().iter().copied().collect();
    let mut ranked = HashSet::new();
    for &id in state.finish_order() {
        if active.contains(&id) {
            violations.push(InvariantViolation {
                message: format!("racer {id} is both active and ranked"),
            });
        }
        if !ranked.insert(id) {
            violations.push(InvariantViolation {
                message: format!("racer {id} appears twice in the finish order"),
            });
        }
        if state.racer(id).is_none() {
            violations.push(InvariantViolation {
                message: format!("finish order contains unknown racer {id}"),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_state_has_no_violations() {
        let mut state = RaceState::new(10);
        let a = state.add_racer("a");
        let b = state.add_racer("b");
        state.shift_racer(a, 3);
        state.shift_racer(b, 3);
        state.rescan_bottom(b);

        assert!(check_invariants(&state).is_empty());
    }

    #[test]
    fn test_detects_drifted_stack() {
        let mut state = RaceState::new(10);
        let a = state.add_racer("a");
        let b = state.add_racer("b");
        state.link_stack(b, a);
        state.shift_racer(b, 2);

        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("drifted")));
    }

    #[test]
    fn test_detects_cycle() {
        let mut state = RaceState::new(10);
        let a = state.add_racer("a");
        let b = state.add_racer("b");
        state.link_stack(b, a);
        state.link_stack(a, b);

        let violations = check_invariants(&state);
        assert!(
            violations
                .iter()
                .any(|v| v.message.contains("does not terminate"))
        );
    }

    #[test]
    fn test_detects_double_finish() {
        let mut state = RaceState::new(10);
        let a = state.add_racer("a");
        state.finish_racer(a).expect("clean chain");
        state.finish_racer(a).expect("clean chain");

        let violations = check_invariants(&state);
        assert!(violations.iter().any(|v| v.message.contains("twice")));
    }
}
