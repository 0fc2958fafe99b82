//! Local bundle state and per-site distribution records.
//!
//! The service exposes two status axes that are not always populated
//! together: the creation-side `state` of the bundle itself, and a list of
//! per-site distribution records. Both are mapped through exhaustive
//! classifiers that reject unknown strings.

use crate::error::StateError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Creation/signing-side state of a release bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalBundleState {
    /// Created, not signed
    Open,
    /// Signed
    Signed,
    /// Signed and validated for distribution
    ReadyForDistribution,
}

impl LocalBundleState {
    /// Wire representation
    pub fn as_wire(&self) -> &'static str {
        match self {
            LocalBundleState::Open => "OPEN",
            LocalBundleState::Signed => "SIGNED",
            LocalBundleState::ReadyForDistribution => "READY_FOR_DISTRIBUTION",
        }
    }

    /// Signed or better
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            LocalBundleState::Signed | LocalBundleState::ReadyForDistribution
        )
    }
}

impl fmt::Display for LocalBundleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Map a raw `state` string to [`LocalBundleState`]
pub fn classify_local_state(raw: &str) -> Result<LocalBundleState, StateError> {
    match raw {
        "OPEN" => Ok(LocalBundleState::Open),
        "SIGNED" => Ok(LocalBundleState::Signed),
        "READY_FOR_DISTRIBUTION" => Ok(LocalBundleState::ReadyForDistribution),
        other => Err(StateError::UnknownLocalState {
            raw: other.to_string(),
        }),
    }
}

/// Status of one distribution target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistributionStatus {
    /// Target known but nothing shipped yet
    NotDistributed,
    /// Transfer running
    InProgress,
    /// Transfer finished successfully
    Completed,
    /// Transfer failed
    Failed,
}

impl DistributionStatus {
    /// Wire representation
    pub fn as_wire(&self) -> &'static str {
        match self {
            DistributionStatus::NotDistributed => "Not distributed",
            DistributionStatus::InProgress => "In progress",
            DistributionStatus::Completed => "Completed",
            DistributionStatus::Failed => "Failed",
        }
    }

    fn classify(raw: &str) -> Result<Self, StateError> {
        match raw {
            "Not distributed" => Ok(DistributionStatus::NotDistributed),
            "In progress" => Ok(DistributionStatus::InProgress),
            "Completed" => Ok(DistributionStatus::Completed),
            "Failed" => Ok(DistributionStatus::Failed),
            other => Err(StateError::UnknownDistributionStatus {
                raw: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Distribution record as returned on the wire
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawDistributionRecord {
    /// Distribution/target id; numeric ids are rendered as strings
    #[serde(default, alias = "distribution_id", deserialize_with = "string_or_number")]
    pub id: String,
    /// Raw status string
    pub status: String,
    /// Site name, when the service reports it
    #[serde(default, alias = "site_name")]
    pub site: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {other}"
        ))),
    }
}

/// Classified per-target distribution record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionRecord {
    /// Distribution/target id
    pub id: String,
    /// Site name, when reported
    pub site: Option<String>,
    /// Classified status
    pub status: DistributionStatus,
}

impl DistributionRecord {
    /// True only for `Completed`
    pub fn is_terminal_success(&self) -> bool {
        self.status == DistributionStatus::Completed
    }

    /// True only for `Failed`
    pub fn is_terminal_failure(&self) -> bool {
        self.status == DistributionStatus::Failed
    }

    /// Completed or Failed
    pub fn is_terminal(&self) -> bool {
        self.is_terminal_success() || self.is_terminal_failure()
    }

    /// Site name if known, otherwise the id
    pub fn target(&self) -> &str {
        self.site.as_deref().unwrap_or(&self.id)
    }
}

/// Classify every raw record, failing on the first unknown status.
///
/// An empty input yields an empty list; callers must treat that as "not
/// indexed yet", which is not the same as a list of `NotDistributed`.
pub fn classify_distribution_records(
    raw: &[RawDistributionRecord],
) -> Result<Vec<DistributionRecord>, StateError> {
    raw.iter()
        .map(|record| {
            Ok(DistributionRecord {
                id: record.id.clone(),
                site: record.site.clone(),
                status: DistributionStatus::classify(&record.status)?,
            })
        })
        .collect()
}

/// True iff the list is non-empty and every record is Completed or Failed
pub fn all_records_terminal(records: &[DistributionRecord]) -> bool {
    !records.is_empty() && records.iter().all(DistributionRecord::is_terminal)
}

/// Aggregate view of a distribution across all targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionProgress {
    /// No records yet
    Unindexed,
    /// Some targets are still pending
    InFlight {
        /// Targets in a terminal state
        terminal: usize,
        /// Total targets
        total: usize,
    },
    /// Every target completed
    Completed,
    /// Every target is terminal and at least one failed
    Failed {
        /// Targets that failed
        failed_targets: Vec<String>,
    },
}

impl DistributionProgress {
    /// Assess a classified record list
    pub fn assess(records: &[DistributionRecord]) -> Self {
        if records.is_empty() {
            return DistributionProgress::Unindexed;
        }
        if !all_records_terminal(records) {
            return DistributionProgress::InFlight {
                terminal: records.iter().filter(|r| r.is_terminal()).count(),
                total: records.len(),
            };
        }
        let failed_targets: Vec<String> = records
            .iter()
            .filter(|r| r.is_terminal_failure())
            .map(|r| r.target().to_string())
            .collect();
        if failed_targets.is_empty() {
            DistributionProgress::Completed
        } else {
            DistributionProgress::Failed { failed_targets }
        }
    }
}
