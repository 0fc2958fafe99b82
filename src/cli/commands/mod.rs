//! Command execution.
//!
//! Each command loads configuration, builds a lifecycle controller and
//! reports through the runtime's output manager. Failures are rendered here
//! and turned into the process exit code.

mod cleanup;
mod create;
mod delete;
mod distribute;
mod helpers;
mod sign;
mod status;
mod wait;

use crate::cli::{Args, Command, OutputManager, RuntimeConfig};
use crate::error::Result;

use cleanup::execute_cleanup;
use create::{execute_create, execute_update};
use delete::execute_delete;
use distribute::execute_distribute;
use sign::execute_sign;
use status::{execute_list, execute_status};
use wait::execute_wait;

/// Execute the command selected by `args` and return the exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {validation_error}"));
        return Ok(2);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Create { bundle, content } => {
            execute_create(&args, &config, bundle, content).await
        }
        Command::Update { bundle, content } => {
            execute_update(&args, &config, bundle, content).await
        }
        Command::Sign {
            bundle,
            storing_repository,
        } => execute_sign(&args, &config, bundle, storing_repository.as_deref()).await,
        Command::Distribute {
            bundle,
            rules,
            sync,
            max_wait_minutes,
            dry_run,
        } => {
            execute_distribute(
                &args,
                &config,
                bundle,
                rules,
                *sync,
                *max_wait_minutes,
                *dry_run,
            )
            .await
        }
        Command::Delete {
            bundle,
            rules,
            delete_from_dist,
            sync,
            dry_run,
        } => {
            execute_delete(
                &args,
                &config,
                bundle,
                rules,
                *delete_from_dist,
                *sync,
                *dry_run,
            )
            .await
        }
        Command::Status { bundle, json } => execute_status(&args, &config, bundle, *json).await,
        Command::Wait {
            bundle,
            until,
            max_wait_minutes,
        } => execute_wait(&args, &config, bundle, *until, *max_wait_minutes).await,
        Command::List { json } => execute_list(&args, &config, *json).await,
        Command::Cleanup {
            base_names,
            bundle_version,
            max_age_hours,
        } => execute_cleanup(&args, &config, base_names, bundle_version, *max_age_hours).await,
    };

    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            // Failures are reported even in quiet mode
            let output = OutputManager::new(false, false);
            output.error(&format!("Command '{}' failed: {e}", args.command.name()));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&format!("• {suggestion}"));
                }
            }

            Ok(e.exit_code())
        }
    }
}
