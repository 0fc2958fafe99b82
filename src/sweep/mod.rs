//! Stale bundle cleanup.
//!
//! Bundles created by test or CI runs are named `<base>-<unix seconds>`.
//! The sweep lists every bundle, picks the ones derived from a known base
//! name whose embedded timestamp is older than the retention window, and
//! issues a fire-and-forget delete for each. Individual failures are logged
//! and skipped; the sweep itself never fails.

use crate::bundle::{DistributionRule, ReleaseBundleIdentity};
use crate::lifecycle::LifecycleController;
use crate::service::DeleteRequest;
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::fmt::Display;
use std::future::Future;

/// Default retention window in hours
pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

/// Default retention window
pub fn default_max_age() -> TimeDelta {
    TimeDelta::hours(DEFAULT_MAX_AGE_HOURS)
}

/// What a sweep looked at and what it did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Names that matched a base name and were old enough to delete
    pub deleted: Vec<String>,
    /// Names that matched but are still inside the retention window
    pub kept: Vec<String>,
    /// Names that matched a base name but carry an unparseable timestamp
    pub skipped: Vec<String>,
    /// Names whose delete call failed
    pub failed: Vec<String>,
    /// Set when the listing itself failed and nothing was examined
    pub listing_error: Option<String>,
}

impl SweepReport {
    /// True when no delete failed and the listing succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.listing_error.is_none()
    }
}

/// How one listed name relates to the sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Not derived from any base name
    Unrelated,
    /// Derived from a base name but the suffix is not a timestamp
    Unparseable,
    /// Timestamp inside the retention window (or in the future)
    Recent,
    /// Timestamp older than the retention window
    Stale,
}

/// Matches `<base>-<suffix>` names for a set of base names
#[derive(Debug, Clone)]
pub struct NameMatcher {
    patterns: Vec<Regex>,
}

impl NameMatcher {
    /// Build a matcher for `base_names`
    pub fn new<S: AsRef<str>>(base_names: &[S]) -> Result<Self, regex::Error> {
        let patterns = base_names
            .iter()
            .map(|base| Regex::new(&format!("^{}-([^-]+)$", regex::escape(base.as_ref()))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Classify `name` against the retention window ending at `now`
    pub fn classify(&self, name: &str, now: DateTime<Utc>, max_age: TimeDelta) -> Candidate {
        let Some(suffix) = self
            .patterns
            .iter()
            .find_map(|re| re.captures(name))
            .and_then(|caps| caps.get(1))
        else {
            return Candidate::Unrelated;
        };

        let created = suffix
            .as_str()
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        match created {
            None => Candidate::Unparseable,
            Some(created) if now.signed_duration_since(created) > max_age => Candidate::Stale,
            Some(_) => Candidate::Recent,
        }
    }
}

/// Delete every stale item among those returned by `list`.
///
/// `delete` is called exactly once per stale name, with that exact name.
pub async fn clean_up_old_items<L, LF, LE, D, DF, DE>(
    matcher: &NameMatcher,
    now: DateTime<Utc>,
    max_age: TimeDelta,
    list: L,
    mut delete: D,
) -> SweepReport
where
    L: FnOnce() -> LF,
    LF: Future<Output = Result<Vec<String>, LE>>,
    LE: Display,
    D: FnMut(String) -> DF,
    DF: Future<Output = Result<(), DE>>,
    DE: Display,
{
    let mut report = SweepReport::default();

    let names = match list().await {
        Ok(names) => names,
        Err(e) => {
            log::warn!("Failed to list items for cleanup: {e}");
            report.listing_error = Some(e.to_string());
            return report;
        }
    };

    for name in names {
        match matcher.classify(&name, now, max_age) {
            Candidate::Unrelated => {}
            Candidate::Unparseable => {
                log::warn!("Skipping '{name}': suffix is not a unix timestamp");
                report.skipped.push(name);
            }
            Candidate::Recent => report.kept.push(name),
            Candidate::Stale => match delete(name.clone()).await {
                Ok(()) => {
                    log::info!("Deleted stale item '{name}'");
                    report.deleted.push(name);
                }
                Err(e) => {
                    log::warn!("Failed to delete '{name}': {e}");
                    report.failed.push(name);
                }
            },
        }
    }

    report
}

/// Delete stale release bundles of `version` everywhere they were shipped
pub async fn sweep_stale_bundles(
    controller: &LifecycleController,
    matcher: &NameMatcher,
    version: &str,
    now: DateTime<Utc>,
    max_age: TimeDelta,
) -> SweepReport {
    clean_up_old_items(
        matcher,
        now,
        max_age,
        || controller.list_bundle_names(),
        |name| {
            let request = DeleteRequest {
                identity: ReleaseBundleIdentity::new(name, version),
                sites: vec![DistributionRule::default()],
                delete_from_distribution: true,
                dry_run: false,
            };
            async move { controller.delete(&request).await }
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).expect("valid timestamp")
    }

    #[test]
    fn classification_by_age_and_base() {
        let matcher = NameMatcher::new(&["cli-test"]).expect("valid pattern");
        let now = at(1_700_000_000 + 3600);

        assert_eq!(
            matcher.classify("cli-test-1700000000", now, default_max_age()),
            Candidate::Recent
        );
        assert_eq!(
            matcher.classify("cli-test-1000000000", now, default_max_age()),
            Candidate::Stale
        );
        assert_eq!(
            matcher.classify("cli-test-nightly", now, default_max_age()),
            Candidate::Unparseable
        );
        assert_eq!(
            matcher.classify("other-1000000000", now, default_max_age()),
            Candidate::Unrelated
        );
        assert_eq!(
            matcher.classify("cli-test-dist-1000000000", now, default_max_age()),
            Candidate::Unrelated
        );
    }

    #[test]
    fn future_timestamps_are_kept() {
        let matcher = NameMatcher::new(&["cli-test"]).expect("valid pattern");
        assert_eq!(
            matcher.classify("cli-test-2000000000", at(1_700_000_000), default_max_age()),
            Candidate::Recent
        );
    }

    #[test]
    fn age_exactly_at_the_window_is_kept() {
        let matcher = NameMatcher::new(&["cli-test"]).expect("valid pattern");
        let now = at(1_000_000_000) + default_max_age();
        assert_eq!(
            matcher.classify("cli-test-1000000000", now, default_max_age()),
            Candidate::Recent
        );
    }

    #[tokio::test]
    async fn stale_items_are_deleted_once_by_exact_name() {
        let matcher = NameMatcher::new(&["cli-test"]).expect("valid pattern");
        let deleted = RefCell::new(Vec::new());

        let report = clean_up_old_items(
            &matcher,
            at(1_700_000_000 + 3600),
            default_max_age(),
            || async {
                Ok::<_, String>(vec![
                    "cli-test-1700000000".to_string(),
                    "cli-test-1000000000".to_string(),
                    "unrelated-bundle".to_string(),
                ])
            },
            |name| {
                deleted.borrow_mut().push(name);
                async { Ok::<_, String>(()) }
            },
        )
        .await;

        assert_eq!(deleted.into_inner(), vec!["cli-test-1000000000".to_string()]);
        assert_eq!(report.deleted, vec!["cli-test-1000000000".to_string()]);
        assert_eq!(report.kept, vec!["cli-test-1700000000".to_string()]);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn delete_failures_do_not_stop_the_sweep() {
        let matcher = NameMatcher::new(&["a", "b"]).expect("valid pattern");

        let report = clean_up_old_items(
            &matcher,
            at(1_700_000_000),
            default_max_age(),
            || async { Ok::<_, String>(vec!["a-1".to_string(), "b-2".to_string()]) },
            |name| async move {
                if name == "a-1" {
                    Err("HTTP 500".to_string())
                } else {
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(report.failed, vec!["a-1".to_string()]);
        assert_eq!(report.deleted, vec!["b-2".to_string()]);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn listing_failure_is_reported_not_raised() {
        let matcher = NameMatcher::new(&["cli-test"]).expect("valid pattern");
        let report = clean_up_old_items(
            &matcher,
            at(1_700_000_000),
            default_max_age(),
            || async { Err::<Vec<String>, _>("connection refused".to_string()) },
            |_name| async { Ok::<_, String>(()) },
        )
        .await;

        assert_eq!(report.listing_error.as_deref(), Some("connection refused"));
        assert!(report.deleted.is_empty());
    }
}
