//! Scripted in-memory repository service shared by the integration tests.

#![allow(dead_code)]

use rbdist::bundle::{BundleDescriptor, RawDistributionRecord, ReleaseBundleIdentity};
use rbdist::error::ServiceError;
use rbdist::service::{
    DeleteRequest, DistributionRequest, LocalBundleResponse, RepositoryService, ServiceResult,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutable state behind [`FakeService`].
///
/// Scripted responses are consumed first; once a script runs dry the fake
/// answers from its bundle and distribution maps.
#[derive(Default)]
pub struct FakeState {
    pub bundles: HashMap<ReleaseBundleIdentity, LocalBundleResponse>,
    pub distribution: HashMap<ReleaseBundleIdentity, Vec<RawDistributionRecord>>,
    pub local_script: VecDeque<ServiceResult<Option<LocalBundleResponse>>>,
    pub distribution_script: VecDeque<ServiceResult<Option<Vec<RawDistributionRecord>>>>,
    pub create_error: Option<ServiceError>,
    pub sign_error: Option<ServiceError>,
    pub delete_error: Option<ServiceError>,
    pub names: Vec<String>,
    pub calls: Vec<String>,
    pub local_queries: u32,
    pub distribution_queries: u32,
}

#[derive(Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    pub fn with(&self, configure: impl FnOnce(&mut FakeState)) {
        configure(&mut self.state());
    }

    /// Seed an existing bundle in the given local state
    pub fn seed(&self, identity: &ReleaseBundleIdentity, state: &str) {
        self.state()
            .bundles
            .insert(identity.clone(), local(identity, Some(state)));
    }

    pub fn script_distribution(
        &self,
        responses: impl IntoIterator<Item = ServiceResult<Option<Vec<RawDistributionRecord>>>>,
    ) {
        self.state().distribution_script.extend(responses);
    }

    pub fn script_local(
        &self,
        responses: impl IntoIterator<Item = ServiceResult<Option<LocalBundleResponse>>>,
    ) {
        self.state().local_script.extend(responses);
    }
}

pub fn local(identity: &ReleaseBundleIdentity, state: Option<&str>) -> LocalBundleResponse {
    LocalBundleResponse {
        name: identity.name.clone(),
        version: identity.version.clone(),
        state: state.map(str::to_string),
        ..LocalBundleResponse::default()
    }
}

pub fn record(id: &str, site: &str, status: &str) -> RawDistributionRecord {
    RawDistributionRecord {
        id: id.to_string(),
        status: status.to_string(),
        site: Some(site.to_string()),
    }
}

pub fn records(statuses: &[(&str, &str)]) -> ServiceResult<Option<Vec<RawDistributionRecord>>> {
    Ok(Some(
        statuses
            .iter()
            .enumerate()
            .map(|(i, (site, status))| record(&(i + 1).to_string(), site, status))
            .collect(),
    ))
}

#[async_trait::async_trait]
impl RepositoryService for FakeService {
    async fn get_local_bundle(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> ServiceResult<Option<LocalBundleResponse>> {
        let mut state = self.state();
        state.local_queries += 1;
        match state.local_script.pop_front() {
            Some(response) => response,
            None => Ok(state.bundles.get(identity).cloned()),
        }
    }

    async fn create_bundle(&self, descriptor: &BundleDescriptor) -> ServiceResult<()> {
        let mut state = self.state();
        let identity = &descriptor.identity;
        state.calls.push(format!("create {identity}"));
        if let Some(error) = state.create_error.clone() {
            return Err(error);
        }
        if state.bundles.contains_key(identity) {
            return Err(ServiceError::Rejected {
                status: 409,
                message: format!("release bundle {identity} already exists"),
            });
        }
        let initial = if descriptor.sign { "SIGNED" } else { "OPEN" };
        state
            .bundles
            .insert(identity.clone(), local(identity, Some(initial)));
        state.names.push(identity.name.clone());
        Ok(())
    }

    async fn update_bundle(&self, descriptor: &BundleDescriptor) -> ServiceResult<()> {
        let mut state = self.state();
        let identity = &descriptor.identity;
        state.calls.push(format!("update {identity}"));
        match state.bundles.get(identity).and_then(|b| b.state.as_deref()) {
            None => Err(ServiceError::NotFound),
            Some("OPEN") => Ok(()),
            Some(other) => Err(ServiceError::Rejected {
                status: 400,
                message: format!("cannot update a bundle in state {other}"),
            }),
        }
    }

    async fn sign_bundle(
        &self,
        identity: &ReleaseBundleIdentity,
        _storing_repository: Option<&str>,
    ) -> ServiceResult<()> {
        let mut state = self.state();
        state.calls.push(format!("sign {identity}"));
        if let Some(error) = state.sign_error.clone() {
            return Err(error);
        }
        match state.bundles.get_mut(identity) {
            None => Err(ServiceError::NotFound),
            Some(bundle) => {
                bundle.state = Some("SIGNED".to_string());
                Ok(())
            }
        }
    }

    async fn distribute_bundle(&self, request: &DistributionRequest) -> ServiceResult<()> {
        let mut state = self.state();
        let identity = &request.identity;
        state.calls.push(format!("distribute {identity}"));
        match state.bundles.get(identity).and_then(|b| b.state.as_deref()) {
            None => Err(ServiceError::NotFound),
            Some("OPEN") => Err(ServiceError::Rejected {
                status: 400,
                message: "release bundle is not signed".to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    async fn get_distribution_records(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> ServiceResult<Option<Vec<RawDistributionRecord>>> {
        let mut state = self.state();
        state.distribution_queries += 1;
        match state.distribution_script.pop_front() {
            Some(response) => response,
            None => Ok(state.distribution.get(identity).cloned()),
        }
    }

    async fn delete_bundle(&self, request: &DeleteRequest) -> ServiceResult<()> {
        let mut state = self.state();
        let identity = &request.identity;
        state.calls.push(format!("delete {identity}"));
        if let Some(error) = state.delete_error.clone() {
            return Err(error);
        }
        if request.delete_from_distribution {
            state.distribution.remove(identity);
        }
        state.names.retain(|name| name != &identity.name);
        match state.bundles.remove(identity) {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound),
        }
    }

    async fn list_bundle_names(&self) -> ServiceResult<Vec<String>> {
        Ok(self.state().names.clone())
    }
}
