//! CLI command implementations for Derby.

pub(crate) mod roster;
pub(crate) mod run;
pub(crate) mod simulate;

mod output;

use clap::ValueEnum;
use std::error::Error;
use std::fmt;

/// Output format for the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum RunFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Output format for the `simulate` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SimulateFormat {
    /// Human-readable text table.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<derby::SetupError> for CliError {
    fn from(e: derby::SetupError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<derby::SimError> for CliError {
    fn from(e: derby::SimError) -> Self {
        Self::new(e.to_string())
    }
}
