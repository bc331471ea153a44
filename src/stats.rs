//! Rank statistics aggregated over many trials.

// Percentage math intentionally goes through f64.
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use crate::race::RacerId;

/// Per-racer, per-rank occurrence counts across trials.
///
/// Counts are indexed by roster position and zero-based rank, so merging
/// two histograms from the same roster is plain element-wise addition:
/// commutative and associative, which is what lets trials run in any order
/// on any number of threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankHistogram {
    names: Vec<String>,
    /// `counts[racer][rank - 1]` = occurrences.
    counts: Vec<Vec<u64>>,
    trials: u64,
}

impl RankHistogram {
    /// Create an empty histogram for the given roster.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let k = names.len();
        RankHistogram {
            names,
            counts: vec![vec![0; k]; k],
            trials: 0,
        }
    }

    /// Racer names in roster order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Trials recorded so far.
    #[must_use]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Record one trial's finish order (rank = position + 1).
    pub fn record(&mut self, finish_order: &[RacerId]) {
        self.trials += 1;
        for (position, id) in finish_order.iter().enumerate() {
            let cell = self
                .counts
                .get_mut(id.0)
                .and_then(|row| row.get_mut(position));
            if let Some(cell) = cell {
                *cell += 1;
            }
        }
    }

    /// Fold another histogram from the same roster into this one.
    pub fn merge(&mut self, other: &RankHistogram) {
        self.trials += other.trials;
        for (row, other_row) in self.counts.iter_mut().zip(&other.counts) {
            for (cell, other_cell) in row.iter_mut().zip(other_row) {
                *cell += other_cell;
            }
        }
    }

    /// Occurrences of a racer finishing at the given 1-based rank.
    #[must_use]
    pub fn count(&self, name: &str, rank: u32) -> u64 {
        let Some(racer) = self.names.iter().position(|n| n == name) else {
            return 0;
        };
        let Some(index) = usize::try_from(rank).ok().and_then(|r| r.checked_sub(1)) else {
            return 0;
        };
        self.counts
            .get(racer)
            .and_then(|row| row.get(index))
            .copied()
            .unwrap_or(0)
    }

    /// Total occurrences recorded for a racer across all ranks.
    ///
    /// Equals [`RankHistogram::trials`] for every racer that finished in
    /// every trial.
    #[must_use]
    pub fn total_for(&self, name: &str) -> u64 {
        let Some(racer) = self.names.iter().position(|n| n == name) else {
            return 0;
        };
        self.counts
            .get(racer)
            .map(|row| row.iter().sum())
            .unwrap_or(0)
    }

    /// Convert the counts to two-decimal percentage strings.
    #[must_use]
    pub fn to_percentages(&self) -> Vec<RacerPercentages> {
        self.names
            .iter()
            .enumerate()
            .map(|(racer, name)| RacerPercentages {
                name: name.clone(),
                ranks: self
                    .counts
                    .get(racer)
                    .map(|row| {
                        row.iter()
                            .map(|&count| format_percentage(count, self.trials))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// One racer's rank probabilities, formatted for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RacerPercentages {
    /// Racer display name.
    pub name: String,
    /// Percentage strings indexed by rank - 1.
    pub ranks: Vec<String>,
}

/// Format `count / trials` as a two-decimal percentage string.
///
/// Zero trials yields `0.00%`; reporting before any trial ran is a caller
/// mistake the Monte Carlo entry point already rejects.
#[must_use]
pub fn format_percentage(count: u64, trials: u64) -> String {
    if trials == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (count as f64 / trials as f64) * 100.0)
}
