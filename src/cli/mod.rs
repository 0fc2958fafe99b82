//! Command line interface for rbdist.
//!
//! Parses arguments, dispatches to the command executors and renders
//! results and failures for the terminal.

mod args;
pub mod commands;
mod output;

pub use args::{Args, BundleArgs, Command, ContentArgs, RuleArgs, RuntimeConfig, WaitTarget};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
