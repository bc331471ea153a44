//! Simulate command implementation.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use super::output::{JsonSimulateResult, format_simulate_csv, format_simulate_text};
use super::roster::demo_engine;
use super::{CliError, SimulateFormat};

/// Execute the simulate command: many independent races, aggregated into
/// rank probabilities.
///
/// # Errors
///
/// Returns an error if the simulation fails.
pub(crate) fn execute(
    trials: u64,
    seed: Option<u64>,
    length: u32,
    threads: Option<usize>,
    format: SimulateFormat,
    progress: bool,
) -> Result<(), CliError> {
    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    // Base seed
    let base_seed = seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(42))
            .unwrap_or(42)
    });

    let engine = demo_engine(length)?;

    // Progress bar
    let pb = if progress {
        let pb = ProgressBar::new(trials);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} trials ({per_sec})")
                .expect("valid template")
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let hist = engine.run_trials(trials, base_seed)?;

    // Update progress bar after completion (no atomic overhead in hot path)
    if let Some(pb) = pb {
        pb.set_position(hist.trials());
        pb.finish_with_message("done");
    }

    let duration = start.elapsed();

    // Calculate trials per second
    #[allow(clippy::cast_precision_loss)]
    let trials_per_sec = if duration.as_secs_f64() > 0.0 {
        hist.trials() as f64 / duration.as_secs_f64()
    } else {
        0.0
    };

    // Output based on format
    match format {
        SimulateFormat::Text => {
            println!();
            print!("{}", format_simulate_text(&hist));
            println!();
            println!(
                "Duration: {:.2}s ({trials_per_sec:.0} trials/sec)",
                duration.as_secs_f64()
            );
        }
        SimulateFormat::Json => {
            let json_result = JsonSimulateResult::from_histogram(&hist);
            let json = serde_json::to_string_pretty(&json_result)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
        SimulateFormat::Csv => {
            print!("{}", format_simulate_csv(&hist));
        }
    }

    Ok(())
}
