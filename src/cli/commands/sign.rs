//! Sign command.

use super::helpers::{build_controller, load_config};
use crate::cli::RuntimeConfig;
use crate::cli::args::{Args, BundleArgs};
use crate::error::Result;

/// Execute sign command
pub(super) async fn execute_sign(
    args: &Args,
    config: &RuntimeConfig,
    bundle: &BundleArgs,
    storing_repository: Option<&str>,
) -> Result<()> {
    let settings = load_config(args)?;
    let controller = build_controller(&settings, None)?;
    let identity = bundle.identity();

    config
        .output()
        .progress(&format!("Signing release bundle {identity}..."));
    controller.sign(&identity, storing_repository).await?;

    let state = controller
        .local_state(&identity)
        .await?
        .and_then(|snapshot| snapshot.state);
    match state {
        Some(state) => config
            .output()
            .success(&format!("Release bundle {identity} is {state}")),
        None => config
            .output()
            .success(&format!("Signed release bundle {identity}")),
    }
    Ok(())
}
