//! Distribution REST API (v1) client.

use super::{
    DeleteRequest, DistributionRequest, LocalBundleResponse, RepositoryService, ServiceResult,
};
use crate::bundle::{
    BundleDescriptor, DistributionRule, RawDistributionRecord, ReleaseBundleIdentity,
    ReleaseNotes, query,
};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use anyhow::Context;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

const API_PREFIX: [&str; 2] = ["api", "v1"];

#[derive(Debug, Clone)]
enum Credentials {
    Token(String),
    Basic { user: String, password: String },
    Anonymous,
}

/// [`RepositoryService`] backed by the distribution service's HTTP API
#[derive(Debug, Clone)]
pub struct HttpRepositoryService {
    client: reqwest::Client,
    base: Url,
    credentials: Credentials,
}

#[derive(Serialize)]
struct PropertyBody<'a> {
    key: &'a str,
    values: Vec<&'a str>,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    aql: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    added_props: Vec<PropertyBody<'a>>,
}

#[derive(Serialize)]
struct SpecBody<'a> {
    queries: Vec<QueryBody<'a>>,
}

#[derive(Serialize)]
struct BundleBody<'a> {
    name: &'a str,
    version: &'a str,
    dry_run: bool,
    sign_immediately: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    storing_repository: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_notes: Option<&'a ReleaseNotes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distribution_rules: Option<&'a [DistributionRule]>,
    spec: SpecBody<'a>,
}

impl<'a> BundleBody<'a> {
    fn from_descriptor(descriptor: &'a BundleDescriptor) -> Self {
        let added_props = || -> Vec<PropertyBody<'a>> {
            descriptor
                .properties
                .iter()
                .map(|(key, value)| PropertyBody {
                    key,
                    values: value.split(',').map(str::trim).collect(),
                })
                .collect()
        };

        let queries = descriptor
            .file_spec_patterns
            .iter()
            .map(|pattern| QueryBody {
                aql: query::to_aql(pattern, &descriptor.exclusion_patterns),
                added_props: added_props(),
            })
            .collect();

        Self {
            name: &descriptor.identity.name,
            version: &descriptor.identity.version,
            dry_run: descriptor.dry_run,
            sign_immediately: descriptor.sign,
            storing_repository: descriptor.storing_repository.as_deref(),
            description: descriptor.description.as_deref(),
            release_notes: descriptor.release_notes.as_ref(),
            distribution_rules: (!descriptor.distribution_rules.is_empty())
                .then_some(descriptor.distribution_rules.as_slice()),
            spec: SpecBody { queries },
        }
    }
}

#[derive(Serialize)]
struct SignBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    storing_repository: Option<&'a str>,
}

#[derive(Serialize)]
struct DistributeBody<'a> {
    dry_run: bool,
    distribution_rules: &'a [DistributionRule],
    #[serde(skip_serializing_if = "Option::is_none")]
    on_success: Option<&'static str>,
}

#[derive(Deserialize)]
struct BundleSummary {
    name: String,
}

/// Map a response status onto the service error taxonomy
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ServiceResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no details").to_string()
    } else {
        body.trim().to_string()
    };
    match status {
        StatusCode::NOT_FOUND => Err(ServiceError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ServiceError::Unauthorized {
            status: status.as_u16(),
        }),
        s if s.is_server_error() => Err(ServiceError::Transport {
            reason: format!("HTTP {}: {message}", s.as_u16()),
        }),
        s => Err(ServiceError::Rejected {
            status: s.as_u16(),
            message,
        }),
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(body: &str) -> ServiceResult<T> {
    serde_json::from_str(body).map_err(|e| ServiceError::InvalidResponse {
        reason: e.to_string(),
    })
}

/// Details of a bundle the service reported as present.
///
/// Existence is already settled by the status code; a body that does not
/// parse only loses the details.
fn local_bundle_from_body(identity: &ReleaseBundleIdentity, body: &str) -> LocalBundleResponse {
    match parse_json::<LocalBundleResponse>(body) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("Ignoring unreadable details of release bundle {identity}: {e}");
            LocalBundleResponse {
                name: identity.name.clone(),
                version: identity.version.clone(),
                ..LocalBundleResponse::default()
            }
        }
    }
}

impl HttpRepositoryService {
    /// Build a client from connection settings
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let base = config.base_url()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("rbdist/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let credentials = match (&config.access_token, &config.user) {
            (Some(token), _) => Credentials::Token(token.clone()),
            (None, Some(user)) => Credentials::Basic {
                user: user.clone(),
                password: config.password.clone().unwrap_or_default(),
            },
            (None, None) => Credentials::Anonymous,
        };

        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build `<base>/api/v1/<segments...>`, escaping each segment
    pub(crate) fn endpoint(&self, segments: &[&str]) -> ServiceResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::Transport {
                reason: format!("base URL '{}' cannot carry a path", self.base),
            })?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        log::debug!("{method} {url}");
        let builder = self.client.request(method, url);
        match &self.credentials {
            Credentials::Token(token) => builder.bearer_auth(token),
            Credentials::Basic { user, password } => builder.basic_auth(user, Some(password)),
            Credentials::Anonymous => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ServiceResult<(StatusCode, String)> {
        let response = builder.send().await.map_err(|e| ServiceError::Transport {
            reason: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ServiceError::Transport {
            reason: format!("failed to read response body: {e}"),
        })?;
        Ok((status, body))
    }

    async fn send_expecting_success(&self, builder: RequestBuilder) -> ServiceResult<String> {
        let (status, body) = self.send(builder).await?;
        classify_status(status, &body)?;
        Ok(body)
    }

    fn bundle_segments<'a>(identity: &'a ReleaseBundleIdentity) -> [&'a str; 3] {
        ["release_bundle", &identity.name, &identity.version]
    }
}

#[async_trait::async_trait]
impl RepositoryService for HttpRepositoryService {
    async fn get_local_bundle(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> ServiceResult<Option<LocalBundleResponse>> {
        let url = self.endpoint(&Self::bundle_segments(identity))?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        classify_status(status, &body)?;
        Ok(Some(local_bundle_from_body(identity, &body)))
    }

    async fn create_bundle(&self, descriptor: &BundleDescriptor) -> ServiceResult<()> {
        let url = self.endpoint(&["release_bundle"])?;
        let body = BundleBody::from_descriptor(descriptor);
        self.send_expecting_success(self.request(Method::POST, url).json(&body))
            .await
            .map(drop)
    }

    async fn update_bundle(&self, descriptor: &BundleDescriptor) -> ServiceResult<()> {
        let url = self.endpoint(&Self::bundle_segments(&descriptor.identity))?;
        let body = BundleBody::from_descriptor(descriptor);
        self.send_expecting_success(self.request(Method::PUT, url).json(&body))
            .await
            .map(drop)
    }

    async fn sign_bundle(
        &self,
        identity: &ReleaseBundleIdentity,
        storing_repository: Option<&str>,
    ) -> ServiceResult<()> {
        let url = self.endpoint(&["release_bundle", &identity.name, &identity.version, "sign"])?;
        let body = SignBody { storing_repository };
        self.send_expecting_success(self.request(Method::POST, url).json(&body))
            .await
            .map(drop)
    }

    async fn distribute_bundle(&self, request: &DistributionRequest) -> ServiceResult<()> {
        let identity = &request.identity;
        let url = self.endpoint(&["distribution", &identity.name, &identity.version])?;
        let body = DistributeBody {
            dry_run: request.dry_run,
            distribution_rules: &request.rules,
            on_success: None,
        };
        self.send_expecting_success(self.request(Method::POST, url).json(&body))
            .await
            .map(drop)
    }

    async fn get_distribution_records(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> ServiceResult<Option<Vec<RawDistributionRecord>>> {
        let url = self.endpoint(&[
            "release_bundle",
            &identity.name,
            &identity.version,
            "distribution",
        ])?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        classify_status(status, &body)?;
        parse_json(&body).map(Some)
    }

    async fn delete_bundle(&self, request: &DeleteRequest) -> ServiceResult<()> {
        let identity = &request.identity;

        if request.delete_from_distribution {
            let url = self.endpoint(&["distribution", &identity.name, &identity.version, "delete"])?;
            let body = DistributeBody {
                dry_run: request.dry_run,
                distribution_rules: &request.sites,
                on_success: Some("delete"),
            };
            return self
                .send_expecting_success(self.request(Method::POST, url).json(&body))
                .await
                .map(drop);
        }

        // The local delete endpoint has no dry-run mode; validate existence instead.
        if request.dry_run {
            return match self.get_local_bundle(identity).await? {
                Some(_) => Ok(()),
                None => Err(ServiceError::NotFound),
            };
        }

        let url = self.endpoint(&Self::bundle_segments(identity))?;
        self.send_expecting_success(self.request(Method::DELETE, url))
            .await
            .map(drop)
    }

    async fn list_bundle_names(&self) -> ServiceResult<Vec<String>> {
        let url = self.endpoint(&["release_bundle"])?;
        let body = self
            .send_expecting_success(self.request(Method::GET, url))
            .await?;
        let summaries: Vec<BundleSummary> = parse_json(&body)?;

        let names: BTreeSet<String> = summaries.into_iter().map(|s| s.name).collect();
        Ok(names.into_iter().collect())
    }
}
