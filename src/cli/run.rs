//! Run command implementation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::output::{JsonRunResult, format_run_text};
use super::roster::demo_engine;
use super::{CliError, RunFormat};

/// Execute the run command: one race with the demo roster.
///
/// # Errors
///
/// Returns an error if the race fails to run.
pub(crate) fn execute(
    seed: Option<u64>,
    length: u32,
    format: RunFormat,
) -> Result<(), CliError> {
    // Generate seed if not provided
    let seed = seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(42))
            .unwrap_or(42)
    });

    let mut engine = demo_engine(length)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let result = engine.run_trial(&mut rng)?;

    match format {
        RunFormat::Text => {
            print!("{}", format_run_text(&result, seed));
        }
        RunFormat::Json => {
            let json_result = JsonRunResult::from_trial(&result, seed);
            let json = serde_json::to_string_pretty(&json_result)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
    }

    Ok(())
}
