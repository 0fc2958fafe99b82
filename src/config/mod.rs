//! Service connection and polling configuration.
//!
//! Values are layered: built-in defaults, then the TOML config file, then
//! `RBDIST_*` environment variables, then command line flags (applied by the
//! CLI layer). The resulting struct is handed to the controller explicitly.

use crate::error::{ConfigError, Result};
use crate::poll::{DEFAULT_MAX_ATTEMPTS, PollPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Upper bound accepted for `RBDIST_POLL_ATTEMPTS`
pub const MAX_POLL_ATTEMPTS: u32 = 3600;

/// Upper bound accepted for `RBDIST_POLL_DELAY_MS`
pub const MAX_POLL_DELAY_MS: u64 = 60_000;

/// Connection settings for the distribution service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the distribution service
    pub url: Option<String>,
    /// Basic-auth user
    pub user: Option<String>,
    /// Basic-auth password
    pub password: Option<String>,
    /// Bearer token; takes precedence over user/password
    pub access_token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            access_token: None,
            timeout_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Parsed base URL with a trailing slash, ready for joining
    pub fn base_url(&self) -> Result<Url> {
        let raw = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingUrl)?;

        let with_slash = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };

        let url = Url::parse(&with_slash).map_err(|e| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }
            .into());
        }
        Ok(url)
    }
}

/// Poll loop settings shared by every wait operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Probe invocations per wait
    pub max_attempts: u32,
    /// Delay between probes in milliseconds
    pub delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: 1000,
        }
    }
}

impl PollingConfig {
    /// Convert into a poll policy
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Service connection
    pub service: ServiceConfig,
    /// Polling behaviour
    pub polling: PollingConfig,
}

/// Parse a numeric value, clamping it to `max`; invalid input is ignored
fn parse_clamped<T>(value: Option<String>, max: T) -> Option<T>
where
    T: FromStr + Ord,
{
    value
        .and_then(|s| s.trim().parse::<T>().ok())
        .map(|v| v.min(max))
}

impl DistributionConfig {
    /// Default config file location (`<config dir>/rbdist/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rbdist").join("config.toml"))
    }

    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load configuration from `explicit` (which must exist) or from the
    /// default location (which may be absent), then apply the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.is_file() => {
                    log::debug!("Loading config from {}", path.display());
                    Self::load_file(&path)?
                }
                _ => Self::default(),
            },
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `RBDIST_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("RBDIST_URL") {
            self.service.url = Some(url);
        }
        if let Some(user) = non_empty("RBDIST_USER") {
            self.service.user = Some(user);
        }
        if let Some(password) = non_empty("RBDIST_PASSWORD") {
            self.service.password = Some(password);
        }
        if let Some(token) = non_empty("RBDIST_ACCESS_TOKEN") {
            self.service.access_token = Some(token);
        }
        if let Some(timeout) = parse_clamped(lookup("RBDIST_TIMEOUT_SECS"), 3600u64) {
            self.service.timeout_secs = timeout;
        }
        if let Some(attempts) = parse_clamped(lookup("RBDIST_POLL_ATTEMPTS"), MAX_POLL_ATTEMPTS) {
            self.polling.max_attempts = attempts;
        }
        if let Some(delay) = parse_clamped(lookup("RBDIST_POLL_DELAY_MS"), MAX_POLL_DELAY_MS) {
            self.polling.delay_ms = delay;
        }
    }

    /// Validate settings needed to talk to the service
    pub fn validate(&self) -> Result<()> {
        self.service.base_url()?;
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::InvalidPolling {
                reason: "max_attempts must be at least 1".to_string(),
            }
            .into());
        }
        if self.polling.delay_ms > MAX_POLL_DELAY_MS {
            return Err(ConfigError::InvalidPolling {
                reason: format!(
                    "delay_ms too high: {} (max: {MAX_POLL_DELAY_MS})",
                    self.polling.delay_ms
                ),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DistError;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn toml_file_populates_both_sections() {
        let config = DistributionConfig::from_toml_str(
            r#"
            [service]
            url = "https://dist.example.com/distribution"
            access_token = "abc"

            [polling]
            max_attempts = 30
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.service.access_token.as_deref(), Some("abc"));
        assert_eq!(config.service.timeout_secs, 60);
        assert_eq!(config.polling.max_attempts, 30);
        assert_eq!(config.polling.delay_ms, 1000);
    }

    #[test]
    fn environment_overrides_and_clamps() {
        let mut config = DistributionConfig::default();
        config.apply_lookup(lookup(&[
            ("RBDIST_URL", "http://localhost:8080/distribution"),
            ("RBDIST_POLL_ATTEMPTS", "999999"),
            ("RBDIST_POLL_DELAY_MS", "not-a-number"),
            ("RBDIST_USER", "  "),
        ]));

        assert_eq!(
            config.service.url.as_deref(),
            Some("http://localhost:8080/distribution")
        );
        assert_eq!(config.polling.max_attempts, MAX_POLL_ATTEMPTS);
        assert_eq!(config.polling.delay_ms, 1000);
        assert_eq!(config.service.user, None);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let service = ServiceConfig {
            url: Some("https://dist.example.com/distribution".to_string()),
            ..ServiceConfig::default()
        };
        assert_eq!(
            service.base_url().expect("valid").as_str(),
            "https://dist.example.com/distribution/"
        );
    }

    #[test]
    fn validation_rejects_missing_url_bad_scheme_and_zero_attempts() {
        let missing = DistributionConfig::default().validate();
        assert!(matches!(missing, Err(DistError::Config(ConfigError::MissingUrl))));

        let mut ftp = DistributionConfig::default();
        ftp.service.url = Some("ftp://dist.example.com".to_string());
        assert!(matches!(
            ftp.validate(),
            Err(DistError::Config(ConfigError::InvalidUrl { .. }))
        ));

        let mut zero = DistributionConfig::default();
        zero.service.url = Some("https://dist.example.com".to_string());
        zero.polling.max_attempts = 0;
        assert!(matches!(
            zero.validate(),
            Err(DistError::Config(ConfigError::InvalidPolling { .. }))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = DistributionConfig::load_file(&dir.path().join("absent.toml"));
        assert!(matches!(
            result,
            Err(DistError::Config(ConfigError::ReadFailed { .. }))
        ));
    }
}
