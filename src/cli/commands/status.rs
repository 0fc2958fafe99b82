//! Status and list commands.
//!
//! Both print through `OutputManager::data`, so their output survives
//! `--quiet` and can be piped.

use super::helpers::{build_controller, load_config};
use crate::bundle::DistributionProgress;
use crate::cli::RuntimeConfig;
use crate::cli::args::{Args, BundleArgs};
use crate::error::Result;
use crate::lifecycle::BundleStatus;

fn describe(status: &BundleStatus) -> Vec<String> {
    let mut lines = vec![format!("Release bundle {}", status.identity)];

    match &status.local {
        None => lines.push("  local:        not found".to_string()),
        Some(local) => {
            let state = local
                .state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unreported".to_string());
            lines.push(format!("  local:        {state}"));
            if let Some(description) = &local.description {
                lines.push(format!("  description:  {description}"));
            }
        }
    }

    match &status.distribution {
        None => lines.push("  distribution: not distributed".to_string()),
        Some(records) => {
            let summary = match DistributionProgress::assess(records) {
                DistributionProgress::Unindexed => "no targets yet".to_string(),
                DistributionProgress::InFlight { terminal, total } => {
                    format!("{terminal}/{total} targets finished")
                }
                DistributionProgress::Completed => "completed".to_string(),
                DistributionProgress::Failed { failed_targets } => {
                    format!("failed on {}", failed_targets.join(", "))
                }
            };
            lines.push(format!("  distribution: {summary}"));
            lines.extend(
                records
                    .iter()
                    .map(|r| format!("    {} ({}): {}", r.target(), r.id, r.status)),
            );
        }
    }
    lines
}

/// Execute status command
pub(super) async fn execute_status(
    args: &Args,
    config: &RuntimeConfig,
    bundle: &BundleArgs,
    json: bool,
) -> Result<()> {
    let settings = load_config(args)?;
    let controller = build_controller(&settings, None)?;
    let status = controller.status(&bundle.identity()).await?;

    if json {
        config.output().data(&serde_json::to_string_pretty(&status)?);
    } else {
        for line in describe(&status) {
            config.output().data(&line);
        }
    }
    Ok(())
}

/// Execute list command
pub(super) async fn execute_list(args: &Args, config: &RuntimeConfig, json: bool) -> Result<()> {
    let settings = load_config(args)?;
    let controller = build_controller(&settings, None)?;
    let names = controller.list_bundle_names().await?;

    if json {
        config.output().data(&serde_json::to_string_pretty(&names)?);
    } else {
        for name in &names {
            config.output().data(name);
        }
    }
    Ok(())
}
