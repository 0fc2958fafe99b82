//! Cleanup command.
//!
//! Deletes stale `<base>-<unix seconds>` release bundles left behind by
//! earlier runs.

use super::helpers::{build_controller, load_config};
use crate::cli::RuntimeConfig;
use crate::cli::args::Args;
use crate::error::{CliError, Result};
use crate::sweep::{NameMatcher, sweep_stale_bundles};
use chrono::{TimeDelta, Utc};

/// Execute cleanup command
pub(super) async fn execute_cleanup(
    args: &Args,
    config: &RuntimeConfig,
    base_names: &[String],
    bundle_version: &str,
    max_age_hours: i64,
) -> Result<()> {
    let invalid = |reason: String| CliError::InvalidArguments { reason };
    let matcher = NameMatcher::new(base_names).map_err(|e| invalid(e.to_string()))?;
    let max_age = TimeDelta::try_hours(max_age_hours)
        .ok_or_else(|| invalid(format!("--max-age-hours {max_age_hours} is out of range")))?;

    let settings = load_config(args)?;
    let controller = build_controller(&settings, None)?;
    let out = config.output();

    out.progress(&format!(
        "Sweeping release bundles older than {max_age_hours}h derived from {}...",
        base_names.join(", ")
    ));
    let report =
        sweep_stale_bundles(&controller, &matcher, bundle_version, Utc::now(), max_age).await;

    if let Some(error) = &report.listing_error {
        out.warn(&format!("Could not list release bundles: {error}"));
        return Ok(());
    }

    for name in &report.deleted {
        out.indent(&format!("deleted {name}"));
    }
    for name in &report.failed {
        out.warn(&format!("Failed to delete {name}"));
    }
    for name in &report.skipped {
        out.warn(&format!("Skipped {name}: no timestamp suffix"));
    }

    out.success(&format!(
        "Cleanup finished: {} deleted, {} kept, {} failed",
        report.deleted.len(),
        report.kept.len(),
        report.failed.len()
    ));
    Ok(())
}
