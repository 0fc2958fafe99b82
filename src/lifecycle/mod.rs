//! Release bundle lifecycle orchestration.
//!
//! [`LifecycleController`] drives create -> sign -> distribute -> wait ->
//! delete against a [`RepositoryService`]. It keeps no local copy of bundle
//! state: every query and every poll attempt re-reads the service.
//!
//! Out-of-order calls (signing a bundle that was never created, for example)
//! are not prevented locally; the service rejects them and the rejection is
//! surfaced as a typed [`LifecycleError`]. Multi-step sequences are not
//! transactional and nothing is rolled back on failure.

use crate::bundle::{
    BundleDescriptor, DistributionProgress, DistributionRecord, LocalBundleState,
    ReleaseBundleIdentity, ReleaseNotes, classify_distribution_records, classify_local_state,
};
use crate::error::{LifecycleError, ServiceError};
use crate::poll::{PollOutcome, PollPolicy, Poller, Probe};
use crate::service::{
    DeleteRequest, DistributionRequest, LocalBundleResponse, RepositoryService,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result type for lifecycle operations
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// Whether `distribute` waits for the sites to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionMode {
    /// Return as soon as the service accepted the request
    #[default]
    FireAndForget,
    /// Poll until every site reached a terminal state
    Wait,
}

/// What `distribute` observed before returning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionOutcome {
    /// Request accepted; completion was not awaited
    Triggered,
    /// Every target completed
    Completed {
        /// Final per-site records
        records: Vec<DistributionRecord>,
    },
}

/// Local (creation-side) view of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalBundleSnapshot {
    /// Local state; `None` when the service omits it
    pub state: Option<LocalBundleState>,
    /// Description
    pub description: Option<String>,
    /// Release notes
    pub release_notes: Option<ReleaseNotes>,
}

impl LocalBundleSnapshot {
    fn from_response(response: LocalBundleResponse) -> LifecycleResult<Self> {
        let state = response
            .state
            .as_deref()
            .map(classify_local_state)
            .transpose()?;
        Ok(Self {
            state,
            description: response.description,
            release_notes: response.release_notes,
        })
    }
}

/// Both state axes of a bundle at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleStatus {
    /// Bundle identity
    pub identity: ReleaseBundleIdentity,
    /// Local view, `None` when the bundle does not exist locally
    pub local: Option<LocalBundleSnapshot>,
    /// Per-site records, `None` when unknown to the distribution index
    pub distribution: Option<Vec<DistributionRecord>>,
}

/// Orchestrates bundle operations and the waits between them
#[derive(Clone)]
pub struct LifecycleController {
    service: Arc<dyn RepositoryService>,
    poller: Poller,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

fn settle(operation: &str, outcome: PollOutcome) -> LifecycleResult<()> {
    match outcome {
        PollOutcome::Success { .. } => Ok(()),
        PollOutcome::FailureReported { reason, .. } => Err(LifecycleError::PollFailed {
            operation: operation.to_string(),
            reason,
        }),
        PollOutcome::TimedOut { attempts } => Err(LifecycleError::PollTimedOut {
            operation: operation.to_string(),
            attempts,
        }),
        PollOutcome::Cancelled { attempts } => Err(LifecycleError::PollCancelled {
            operation: operation.to_string(),
            attempts,
        }),
    }
}

impl LifecycleController {
    /// Create a controller over `service` using `policy` for every wait
    pub fn new(service: Arc<dyn RepositoryService>, policy: PollPolicy) -> Self {
        Self {
            service,
            poller: Poller::new(policy),
        }
    }

    /// Abort waits when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(token);
        self
    }

    /// Policy used by every wait
    pub fn poll_policy(&self) -> PollPolicy {
        self.poller.policy()
    }

    /// Create a bundle. Synchronous from the service's point of view.
    pub async fn create(
        &self,
        descriptor: &BundleDescriptor,
    ) -> LifecycleResult<ReleaseBundleIdentity> {
        let identity = &descriptor.identity;
        let bundle = identity.to_string();

        self.service
            .create_bundle(descriptor)
            .await
            .map_err(|e| match e {
                ServiceError::Rejected { status, message } => LifecycleError::CreationRejected {
                    bundle: bundle.clone(),
                    reason: format!("HTTP {status}: {message}"),
                },
                other => LifecycleError::from_service("create", &bundle, other),
            })?;

        log::info!("Created release bundle {bundle}");
        Ok(identity.clone())
    }

    /// Replace the content of an existing bundle
    pub async fn update(&self, descriptor: &BundleDescriptor) -> LifecycleResult<()> {
        let bundle = descriptor.identity.to_string();
        self.service
            .update_bundle(descriptor)
            .await
            .map_err(|e| LifecycleError::from_service("update", &bundle, e))?;
        log::info!("Updated release bundle {bundle}");
        Ok(())
    }

    /// Sign a bundle and confirm it reached `Signed` or better.
    ///
    /// Signing an already-signed bundle succeeds even if the service rejects
    /// the repeated request.
    pub async fn sign(
        &self,
        identity: &ReleaseBundleIdentity,
        storing_repository: Option<&str>,
    ) -> LifecycleResult<()> {
        let bundle = identity.to_string();

        match self.service.sign_bundle(identity, storing_repository).await {
            Ok(()) => {}
            Err(ServiceError::Rejected { status, message }) => {
                if let Some(state) = self.signed_state(identity).await {
                    log::info!("Release bundle {bundle} is already {state}");
                    return Ok(());
                }
                return Err(LifecycleError::SigningRejected {
                    bundle,
                    reason: format!("HTTP {status}: {message}"),
                });
            }
            Err(other) => return Err(LifecycleError::from_service("sign", &bundle, other)),
        }

        match self.local_state(identity).await? {
            None => Err(LifecycleError::NotFound { bundle }),
            Some(LocalBundleSnapshot {
                state: Some(state), ..
            }) if !state.is_signed() => Err(LifecycleError::SigningRejected {
                bundle,
                reason: format!("bundle is still {state} after signing"),
            }),
            Some(_) => {
                log::info!("Signed release bundle {bundle}");
                Ok(())
            }
        }
    }

    async fn signed_state(&self, identity: &ReleaseBundleIdentity) -> Option<LocalBundleState> {
        match self.local_state(identity).await {
            Ok(Some(snapshot)) => snapshot.state.filter(LocalBundleState::is_signed),
            _ => None,
        }
    }

    /// Trigger distribution and, in [`DistributionMode::Wait`], poll until
    /// every site is terminal.
    ///
    /// Dry runs never wait.
    pub async fn distribute(
        &self,
        request: &DistributionRequest,
        mode: DistributionMode,
    ) -> LifecycleResult<DistributionOutcome> {
        let identity = &request.identity;
        let bundle = identity.to_string();

        self.service
            .distribute_bundle(request)
            .await
            .map_err(|e| LifecycleError::from_service("distribute", &bundle, e))?;

        log::info!(
            "Distribution of {bundle} triggered{}",
            if request.dry_run { " (dry run)" } else { "" }
        );

        if mode == DistributionMode::FireAndForget || request.dry_run {
            return Ok(DistributionOutcome::Triggered);
        }

        let records = self.wait_for_distribution(identity).await?;
        Ok(DistributionOutcome::Completed { records })
    }

    /// Poll the per-site records until all are terminal.
    ///
    /// An empty or missing record list means the service has not indexed
    /// the distribution yet and is retried. Returns the final records when
    /// every site completed.
    pub async fn wait_for_distribution(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> LifecycleResult<Vec<DistributionRecord>> {
        let bundle = identity.to_string();
        let label = format!("distribution of {bundle}");
        let last_seen = tokio::sync::Mutex::new(Vec::new());

        let outcome = self
            .poller
            .run(&label, || {
                let service = &self.service;
                let bundle = &bundle;
                let last_seen = &last_seen;
                async move {
                    let raw = match service.get_distribution_records(identity).await {
                        Ok(Some(raw)) => raw,
                        Ok(None) | Err(ServiceError::NotFound) => return Probe::Retry,
                        Err(e) => {
                            return Probe::Unrecoverable(LifecycleError::from_service(
                                "distribution status",
                                bundle,
                                e,
                            ));
                        }
                    };
                    let records = match classify_distribution_records(&raw) {
                        Ok(records) => records,
                        Err(e) => return Probe::Unrecoverable(e.into()),
                    };
                    let progress = DistributionProgress::assess(&records);
                    *last_seen.lock().await = records;

                    match progress {
                        DistributionProgress::Unindexed | DistributionProgress::InFlight { .. } => {
                            Probe::Retry
                        }
                        DistributionProgress::Completed => Probe::Succeeded,
                        DistributionProgress::Failed { failed_targets } => Probe::Failed(format!(
                            "distribution of {bundle} failed for {}",
                            failed_targets.join(", ")
                        )),
                    }
                }
            })
            .await?;

        settle(&label, outcome)?;
        log::info!("Distribution of {bundle} completed");
        Ok(last_seen.into_inner())
    }

    /// Poll until the bundle's local existence matches `expect_exist`.
    ///
    /// Serves both directions: after creation (`true`) and after deletion
    /// (`false`).
    pub async fn wait_for_local_existence(
        &self,
        identity: &ReleaseBundleIdentity,
        expect_exist: bool,
    ) -> LifecycleResult<()> {
        let bundle = identity.to_string();
        let label = if expect_exist {
            format!("{bundle} to exist")
        } else {
            format!("{bundle} to be removed")
        };

        let outcome = self
            .poller
            .run(&label, || {
                let service = &self.service;
                let bundle = &bundle;
                async move {
                    let exists = match service.get_local_bundle(identity).await {
                        Ok(found) => found.is_some(),
                        Err(ServiceError::NotFound) => false,
                        Err(e) => {
                            return Probe::Unrecoverable(LifecycleError::from_service(
                                "local bundle query",
                                bundle,
                                e,
                            ));
                        }
                    };
                    if exists == expect_exist {
                        Probe::Succeeded
                    } else {
                        Probe::Retry
                    }
                }
            })
            .await?;

        settle(&label, outcome)
    }

    /// Issue a delete. Deleting an absent bundle succeeds.
    ///
    /// Deletion completes asynchronously on the service; follow up with
    /// [`Self::wait_for_local_existence`] (or [`Self::wait_for_deletion`]
    /// when distributed copies were purged) to confirm it.
    pub async fn delete(&self, request: &DeleteRequest) -> LifecycleResult<()> {
        let bundle = request.identity.to_string();
        match self.service.delete_bundle(request).await {
            Ok(()) => {
                log::info!("Deletion of {bundle} requested");
                Ok(())
            }
            Err(ServiceError::NotFound) => {
                log::debug!("Release bundle {bundle} already absent");
                Ok(())
            }
            Err(e) => Err(LifecycleError::from_service("delete", &bundle, e)),
        }
    }

    /// Poll the distribution index until it no longer knows the bundle
    pub async fn wait_for_deletion(&self, identity: &ReleaseBundleIdentity) -> LifecycleResult<()> {
        let bundle = identity.to_string();
        let label = format!("distribution deletion of {bundle}");

        let outcome = self
            .poller
            .run(&label, || {
                let service = &self.service;
                let bundle = &bundle;
                async move {
                    match service.get_distribution_records(identity).await {
                        Ok(None) | Err(ServiceError::NotFound) => Probe::Succeeded,
                        Ok(Some(_)) => Probe::Retry,
                        Err(e) => Probe::Unrecoverable(LifecycleError::from_service(
                            "distribution status",
                            bundle,
                            e,
                        )),
                    }
                }
            })
            .await?;

        settle(&label, outcome)
    }

    /// Current local view, `None` when the bundle does not exist
    pub async fn local_state(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> LifecycleResult<Option<LocalBundleSnapshot>> {
        match self.service.get_local_bundle(identity).await {
            Ok(Some(response)) => LocalBundleSnapshot::from_response(response).map(Some),
            Ok(None) | Err(ServiceError::NotFound) => Ok(None),
            Err(e) => Err(LifecycleError::from_service(
                "local bundle query",
                &identity.to_string(),
                e,
            )),
        }
    }

    /// Current per-site records, `None` when unknown to the index
    pub async fn distribution_records(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> LifecycleResult<Option<Vec<DistributionRecord>>> {
        match self.service.get_distribution_records(identity).await {
            Ok(Some(raw)) => Ok(Some(classify_distribution_records(&raw)?)),
            Ok(None) | Err(ServiceError::NotFound) => Ok(None),
            Err(e) => Err(LifecycleError::from_service(
                "distribution status",
                &identity.to_string(),
                e,
            )),
        }
    }

    /// Snapshot of both state axes
    pub async fn status(&self, identity: &ReleaseBundleIdentity) -> LifecycleResult<BundleStatus> {
        Ok(BundleStatus {
            identity: identity.clone(),
            local: self.local_state(identity).await?,
            distribution: self.distribution_records(identity).await?,
        })
    }

    /// Names of every bundle known to the service
    pub async fn list_bundle_names(&self) -> LifecycleResult<Vec<String>> {
        self.service
            .list_bundle_names()
            .await
            .map_err(|e| LifecycleError::from_service("list bundles", "*", e))
    }
}
