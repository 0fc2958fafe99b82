//! Delete command.

use super::helpers::{
    build_controller, build_rules, interruptible, load_config, prompt_confirmation,
};
use crate::cli::RuntimeConfig;
use crate::cli::args::{Args, BundleArgs, RuleArgs};
use crate::error::Result;
use crate::service::DeleteRequest;

/// Execute delete command
pub(super) async fn execute_delete(
    args: &Args,
    config: &RuntimeConfig,
    bundle: &BundleArgs,
    rules: &RuleArgs,
    delete_from_dist: bool,
    sync: bool,
    dry_run: bool,
) -> Result<()> {
    let settings = load_config(args)?;
    let sites = build_rules(rules)?;
    let out = config.output();
    let identity = bundle.identity();

    if !config.is_quiet() && !dry_run {
        if delete_from_dist {
            out.warn(&format!(
                "About to delete release bundle {identity} and its distributed copies"
            ));
        } else {
            out.warn(&format!("About to delete release bundle {identity}"));
        }
        if !prompt_confirmation("Continue with delete?")? {
            out.println("Delete cancelled");
            return Ok(());
        }
    }

    let controller = build_controller(&settings, None)?;
    let request = DeleteRequest {
        identity,
        sites,
        delete_from_distribution: delete_from_dist,
        dry_run,
    };
    controller.delete(&request).await?;

    if dry_run {
        out.success(&format!("Deletion of {} validated (dry run)", request.identity));
        return Ok(());
    }

    if sync {
        out.progress(&format!("Waiting for {} to disappear...", request.identity));
        let identity = &request.identity;
        interruptible(&controller, |controller| async move {
            if delete_from_dist {
                controller.wait_for_deletion(identity).await?;
            }
            controller.wait_for_local_existence(identity, false).await
        })
        .await?;
        out.success(&format!("Release bundle {} deleted", request.identity));
    } else {
        out.success(&format!("Deletion of {} requested", request.identity));
    }
    Ok(())
}
