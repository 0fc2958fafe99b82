//! rbdist - release bundle distribution client.
//!
//! Creates, signs, distributes and cleans up release bundles on a
//! distribution service, waiting for asynchronous state changes with
//! bounded polling.

use rbdist::cli;
use rbdist::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Create output manager for error display (never quiet for fatal errors)
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }

            process::exit(e.exit_code());
        }
    }
}
