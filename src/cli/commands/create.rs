//! Create and update commands.

use super::helpers::{build_controller, build_descriptor, load_config};
use crate::cli::RuntimeConfig;
use crate::cli::args::{Args, BundleArgs, ContentArgs};
use crate::error::Result;

/// Execute create command
pub(super) async fn execute_create(
    args: &Args,
    config: &RuntimeConfig,
    bundle: &BundleArgs,
    content: &ContentArgs,
) -> Result<()> {
    let settings = load_config(args)?;
    let descriptor = build_descriptor(bundle, content)?;
    let controller = build_controller(&settings, None)?;
    let out = config.output();

    out.progress(&format!(
        "Creating release bundle {} from {} pattern(s)...",
        descriptor.identity,
        descriptor.file_spec_patterns.len()
    ));
    let identity = controller.create(&descriptor).await?;

    if content.dry_run {
        out.success(&format!("Release bundle {identity} validated (dry run)"));
    } else if content.sign {
        out.success(&format!("Created and signed release bundle {identity}"));
    } else {
        out.success(&format!("Created release bundle {identity}"));
    }
    Ok(())
}

/// Execute update command
pub(super) async fn execute_update(
    args: &Args,
    config: &RuntimeConfig,
    bundle: &BundleArgs,
    content: &ContentArgs,
) -> Result<()> {
    let settings = load_config(args)?;
    let descriptor = build_descriptor(bundle, content)?;
    let controller = build_controller(&settings, None)?;

    config
        .output()
        .progress(&format!("Updating release bundle {}...", descriptor.identity));
    controller.update(&descriptor).await?;
    config
        .output()
        .success(&format!("Updated release bundle {}", descriptor.identity));
    Ok(())
}
