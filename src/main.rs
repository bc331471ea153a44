//! Derby CLI - Command-line interface for racing simulations.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Derby - a Monte Carlo simulator for turn-based stacking races
#[derive(Parser, Debug)]
#[command(name = "derby")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single race with the demo roster
    Run {
        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Track length in cells (default: 23)
        #[arg(short, long, default_value = "23")]
        length: u32,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::RunFormat,
    },

    /// Run mass parallel races and aggregate rank probabilities
    Simulate {
        /// Number of trials to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        trials: u64,

        /// Base seed (each trial derives its own from it)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Track length in cells (default: 23)
        #[arg(short, long, default_value = "23")]
        length: u32,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::SimulateFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Run {
            seed,
            length,
            format,
        } => cli::run::execute(seed, length, format),

        Commands::Simulate {
            trials,
            seed,
            length,
            threads,
            format,
            progress,
        } => cli::simulate::execute(trials, seed, length, threads, format, progress),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
