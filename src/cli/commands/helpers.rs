//! Shared helper functions for command execution.

use crate::bundle::{
    BundleDescriptor, DistributionRule, DistributionRulesFile, ReleaseNotes, parse_properties,
};
use crate::cli::args::{Args, BundleArgs, ContentArgs, RuleArgs};
use crate::config::DistributionConfig;
use crate::error::{CliError, Result};
use crate::lifecycle::{LifecycleController, LifecycleResult};
use crate::service::HttpRepositoryService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Load configuration and apply the global connection flags
pub(super) fn load_config(args: &Args) -> Result<DistributionConfig> {
    let mut config = DistributionConfig::load(args.config.as_deref())?;

    let overrides = [
        (&args.url, &mut config.service.url),
        (&args.user, &mut config.service.user),
        (&args.password, &mut config.service.password),
        (&args.access_token, &mut config.service.access_token),
    ];
    for (flag, slot) in overrides {
        if let Some(value) = flag {
            *slot = Some(value.clone());
        }
    }

    config.validate()?;
    Ok(config)
}

/// Build a controller for `config`, optionally bounding every wait to
/// `max_wait_minutes`
pub(super) fn build_controller(
    config: &DistributionConfig,
    max_wait_minutes: Option<u64>,
) -> Result<LifecycleController> {
    let service = HttpRepositoryService::new(&config.service)?;

    let mut policy = config.polling.policy();
    if let Some(minutes) = max_wait_minutes {
        policy = policy.with_max_wait(Duration::from_secs(minutes.saturating_mul(60)));
    }
    log::debug!(
        "Polling up to {} times every {:?}",
        policy.max_attempts,
        policy.delay
    );

    Ok(LifecycleController::new(Arc::new(service), policy))
}

/// Run a wait with Ctrl-C cancelling it.
///
/// Nothing listens for the signal until `wait` starts, so prompts and
/// single requests keep the default Ctrl-C behaviour. After an interrupt the
/// poller stops at its next check and the wait reports [`crate::error::LifecycleError::PollCancelled`].
pub(super) async fn interruptible<T, F, Fut>(controller: &LifecycleController, wait: F) -> Result<T>
where
    F: FnOnce(LifecycleController) -> Fut,
    Fut: Future<Output = LifecycleResult<T>>,
{
    let token = CancellationToken::new();
    let scoped = controller.clone().with_cancellation(token.clone());
    let wait = wait(scoped);
    tokio::pin!(wait);

    tokio::select! {
        result = &mut wait => return Ok(result?),
        interrupted = tokio::signal::ctrl_c() => {
            if let Err(e) = interrupted {
                log::debug!("Ctrl-C handler unavailable: {e}");
            } else {
                log::warn!("Interrupted, abandoning wait");
                token.cancel();
            }
        }
    }
    Ok(wait.await?)
}

/// Assemble a validated descriptor from create/update arguments
pub(super) fn build_descriptor(
    bundle: &BundleArgs,
    content: &ContentArgs,
) -> Result<BundleDescriptor> {
    if content.release_notes_syntax.is_some() && content.release_notes_path.is_none() {
        return Err(CliError::InvalidArguments {
            reason: "--release-notes-syntax requires --release-notes-path".to_string(),
        }
        .into());
    }

    let release_notes = content
        .release_notes_path
        .as_deref()
        .map(|path| ReleaseNotes::from_file(path, content.release_notes_syntax))
        .transpose()?;

    let properties = content
        .target_props
        .as_deref()
        .map(parse_properties)
        .transpose()?
        .unwrap_or_default();

    let distribution_rules = if content.rules.is_empty() {
        Vec::new()
    } else {
        build_rules(&content.rules)?
    };

    BundleDescriptor::builder(bundle.identity())
        .patterns(content.patterns.iter().cloned())
        .exclusions(content.exclusions.iter().cloned())
        .sign(content.sign)
        .release_notes(release_notes)
        .description(content.description.clone())
        .properties(properties)
        .distribution_rules(distribution_rules)
        .storing_repository(content.storing_repository.clone())
        .dry_run(content.dry_run)
        .build()
}

/// Resolve target site rules: the rules file wins, otherwise one rule is
/// built from the site/city/country flags (wildcards by default)
pub(super) fn build_rules(rules: &RuleArgs) -> Result<Vec<DistributionRule>> {
    if let Some(path) = &rules.dist_rules {
        if rules.site.is_some() || rules.city.is_some() || !rules.country_codes.is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "--dist-rules cannot be combined with --site, --city or --country-codes"
                    .to_string(),
            }
            .into());
        }
        return DistributionRulesFile::load(path);
    }

    let mut rule = DistributionRule::for_site(rules.site.as_deref().unwrap_or("*"));
    if let Some(city) = &rules.city {
        rule.city_name = city.clone();
    }
    if !rules.country_codes.is_empty() {
        rule.country_codes = rules.country_codes.clone();
    }
    Ok(vec![rule])
}

/// Prompt user for confirmation with y/n input
pub(super) fn prompt_confirmation(prompt: &str) -> std::io::Result<bool> {
    use std::io::Write;

    print!("{prompt} [y/N]: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    let response = input.trim().to_lowercase();
    Ok(matches!(response.as_str(), "y" | "yes"))
}
