//! Output formatting utilities for CLI.

// Rate math intentionally goes through f64.
#![allow(clippy::cast_precision_loss)]

use derby::{RankHistogram, TrialResult};
use serde::Serialize;

/// JSON-serializable single-race result.
#[derive(Debug, Serialize)]
pub(super) struct JsonRunResult {
    /// Random seed used.
    pub(super) seed: u64,
    /// Rounds the race took.
    pub(super) rounds: u32,
    /// Final placements in rank order.
    pub(super) placements: Vec<JsonPlacement>,
}

/// JSON-serializable placement entry.
#[derive(Debug, Serialize)]
pub(super) struct JsonPlacement {
    /// Rank, starting at 1.
    pub(super) rank: u32,
    /// Racer name.
    pub(super) name: String,
}

impl JsonRunResult {
    /// Create from a trial result.
    pub(super) fn from_trial(result: &TrialResult, seed: u64) -> Self {
        Self {
            seed,
            rounds: result.rounds,
            placements: result
                .ranking
                .iter()
                .map(|(name, rank)| JsonPlacement {
                    rank: *rank,
                    name: name.clone(),
                })
                .collect(),
        }
    }
}

/// Format a single-race result as human-readable text.
pub(super) fn format_run_text(result: &TrialResult, seed: u64) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Race finished in {} rounds (seed: {seed})\n",
        result.rounds
    ));
    for (name, rank) in &result.ranking {
        output.push_str(&format!("  #{rank}: {name}\n"));
    }

    output
}

/// Format a rank-probability histogram as a human-readable table.
pub(super) fn format_simulate_text(hist: &RankHistogram) -> String {
    let mut output = String::new();

    output.push_str(&format!("Rank probabilities ({} trials)\n", hist.trials()));
    output.push_str("========================================\n\n");

    let table = hist.to_percentages();
    let name_width = table
        .iter()
        .map(|row| row.name.len())
        .max()
        .unwrap_or(0)
        .max("Racer".len());

    output.push_str(&format!("{:<name_width$}", "Racer"));
    for rank in 1..=table.len() {
        output.push_str(&format!("  {:>8}", format!("#{rank}")));
    }
    output.push('\n');

    for row in &table {
        output.push_str(&format!("{:<name_width$}", row.name));
        for cell in &row.ranks {
            output.push_str(&format!("  {cell:>8}"));
        }
        output.push('\n');
    }

    output
}

/// JSON-serializable simulation result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSimulateResult {
    /// Trials run.
    trials: u64,
    /// Per-racer rank statistics.
    racers: Vec<JsonRacerStats>,
}

/// JSON-serializable per-racer rank statistics.
#[derive(Debug, Serialize)]
pub(super) struct JsonRacerStats {
    /// Racer name.
    name: String,
    /// Per-rank occurrences and rates, indexed by rank order.
    ranks: Vec<JsonRankStat>,
}

/// JSON-serializable single-rank entry.
#[derive(Debug, Serialize)]
pub(super) struct JsonRankStat {
    /// Rank, starting at 1.
    rank: u32,
    /// Times the racer finished at this rank.
    count: u64,
    /// `count / trials` as a fraction.
    rate: f64,
}

impl JsonSimulateResult {
    /// Create from a histogram.
    pub(super) fn from_histogram(hist: &RankHistogram) -> Self {
        let trials = hist.trials();
        let racers = hist
            .names()
            .iter()
            .map(|name| JsonRacerStats {
                name: name.clone(),
                ranks: (1..=hist.names().len())
                    .filter_map(|rank| u32::try_from(rank).ok())
                    .map(|rank| {
                        let count = hist.count(name, rank);
                        JsonRankStat {
                            rank,
                            count,
                            rate: if trials == 0 {
                                0.0
                            } else {
                                count as f64 / trials as f64
                            },
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { trials, racers }
    }
}

/// Format a rank-probability histogram as CSV.
pub(super) fn format_simulate_csv(hist: &RankHistogram) -> String {
    let mut output = String::new();

    // Header
    output.push_str("racer,rank,count,probability\n");

    // Data rows
    let trials = hist.trials();
    for name in hist.names() {
        for rank in 1..=hist.names().len() {
            let Ok(rank) = u32::try_from(rank) else {
                continue;
            };
            let count = hist.count(name, rank);
            let rate = if trials == 0 {
                0.0
            } else {
                count as f64 / trials as f64
            };
            output.push_str(&format!("{name},{rank},{count},{rate:.4}\n"));
        }
    }

    output
}
