//! Wait command.

use super::helpers::{build_controller, interruptible, load_config};
use crate::cli::RuntimeConfig;
use crate::cli::args::{Args, BundleArgs, WaitTarget};
use crate::error::Result;

/// Execute wait command
pub(super) async fn execute_wait(
    args: &Args,
    config: &RuntimeConfig,
    bundle: &BundleArgs,
    until: WaitTarget,
    max_wait_minutes: Option<u64>,
) -> Result<()> {
    let settings = load_config(args)?;
    let controller = build_controller(&settings, max_wait_minutes)?;
    let out = config.output();
    let identity = bundle.identity();
    let id = &identity;

    match until {
        WaitTarget::Distribution => {
            let records = interruptible(&controller, |controller| async move {
                controller.wait_for_distribution(id).await
            })
            .await?;
            out.success(&format!(
                "Distribution of {identity} completed on {} target(s)",
                records.len()
            ));
        }
        WaitTarget::Exists => {
            interruptible(&controller, |controller| async move {
                controller.wait_for_local_existence(id, true).await
            })
            .await?;
            out.success(&format!("Release bundle {identity} exists"));
        }
        WaitTarget::Absent => {
            interruptible(&controller, |controller| async move {
                controller.wait_for_local_existence(id, false).await
            })
            .await?;
            out.success(&format!("Release bundle {identity} is gone"));
        }
        WaitTarget::Deleted => {
            interruptible(&controller, |controller| async move {
                controller.wait_for_deletion(id).await
            })
            .await?;
            out.success(&format!("Release bundle {identity} removed from distribution"));
        }
    }
    Ok(())
}
