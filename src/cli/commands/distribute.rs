//! Distribute command.

use super::helpers::{build_controller, build_rules, interruptible, load_config};
use crate::cli::RuntimeConfig;
use crate::cli::args::{Args, BundleArgs, RuleArgs};
use crate::error::Result;
use crate::lifecycle::{DistributionMode, DistributionOutcome};
use crate::service::DistributionRequest;

/// Execute distribute command
pub(super) async fn execute_distribute(
    args: &Args,
    config: &RuntimeConfig,
    bundle: &BundleArgs,
    rules: &RuleArgs,
    sync: bool,
    max_wait_minutes: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    let settings = load_config(args)?;
    let rules = build_rules(rules)?;
    let controller = build_controller(&settings, max_wait_minutes)?;
    let out = config.output();

    let request = DistributionRequest {
        identity: bundle.identity(),
        rules,
        dry_run,
    };
    let mode = if sync {
        DistributionMode::Wait
    } else {
        DistributionMode::FireAndForget
    };

    let outcome = if mode == DistributionMode::Wait && !dry_run {
        out.progress(&format!(
            "Distributing {} and waiting up to {}s...",
            request.identity,
            controller.poll_policy().ceiling().as_secs()
        ));
        let request = &request;
        interruptible(&controller, |controller| async move {
            controller.distribute(request, mode).await
        })
        .await?
    } else {
        out.progress(&format!("Distributing {}...", request.identity));
        controller.distribute(&request, mode).await?
    };

    match outcome {
        DistributionOutcome::Triggered if dry_run => {
            out.success(&format!("Distribution of {} validated (dry run)", request.identity));
        }
        DistributionOutcome::Triggered => {
            out.success(&format!("Distribution of {} triggered", request.identity));
        }
        DistributionOutcome::Completed { records } => {
            out.success(&format!(
                "Distribution of {} completed on {} target(s)",
                request.identity,
                records.len()
            ));
            for record in &records {
                out.indent(&format!("{}: {}", record.target(), record.status));
            }
        }
    }
    Ok(())
}
