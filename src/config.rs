//! Engine configuration.
//!
//! Loaded from YAML, then overridden from `SHIP_PARTIES_*` environment
//! variables, then from command-line flags in the server binary.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contacts::{DomainAllowList, DEFAULT_OFFICIAL_DOMAINS};
use crate::error::ConfigError;
use crate::inference::Mode;
use crate::retrieval::RetrievalOptions;

/// Environment variable overriding `default_mode`.
pub const ENV_MODE: &str = "SHIP_PARTIES_MODE";
/// Environment variable overriding `ai_timeout_ms`.
pub const ENV_AI_TIMEOUT_MS: &str = "SHIP_PARTIES_AI_TIMEOUT_MS";
/// Environment variable overriding `server.bind`.
pub const ENV_BIND: &str = "SHIP_PARTIES_BIND";
/// Environment variable overriding `official_domains` (comma separated).
pub const ENV_OFFICIAL_DOMAINS: &str = "SHIP_PARTIES_OFFICIAL_DOMAINS";

/// Retrieval limits as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum number of sources queried.
    pub max_sources: usize,
    /// Maximum snippets kept per source.
    pub max_per_source: usize,
    /// Cache lifetime in seconds.
    pub ttl_secs: u64,
    /// Deadline for each source in milliseconds.
    pub per_source_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_sources: 4,
            max_per_source: 3,
            ttl_secs: 6 * 60 * 60,
            per_source_timeout_ms: 6_000,
        }
    }
}

impl RetrievalConfig {
    /// Runtime options for the retrieval collaborator.
    #[must_use]
    pub fn options(&self) -> RetrievalOptions {
        RetrievalOptions {
            max_sources: self.max_sources,
            max_per_source: self.max_per_source,
            ttl: Duration::from_secs(self.ttl_secs),
            per_source_timeout: Duration::from_millis(self.per_source_timeout_ms),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Mode used when a request names none.
    pub default_mode: Mode,
    /// Deadline of the AI round trip.
    pub ai_timeout_ms: u64,
    /// Public retrieval limits.
    pub retrieval: RetrievalConfig,
    /// Domains whose strong evidence may yield contacts.
    pub official_domains: Vec<String>,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::default(),
            ai_timeout_ms: 20_000,
            retrieval: RetrievalConfig::default(),
            official_domains: DEFAULT_OFFICIAL_DOMAINS
                .iter()
                .map(|d| (*d).to_string())
                .collect(),
            server: ServerConfig::default(),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl EngineConfig {
    /// Parses a YAML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or a validation failure.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`EngineConfig::from_yaml_str`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Applies `SHIP_PARTIES_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparsable override.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unparsable override.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(mode) = get(ENV_MODE) {
            self.default_mode = mode.parse().map_err(|_| invalid(ENV_MODE, mode))?;
        }
        if let Some(timeout) = get(ENV_AI_TIMEOUT_MS) {
            self.ai_timeout_ms = timeout
                .trim()
                .parse()
                .map_err(|e| invalid(ENV_AI_TIMEOUT_MS, format!("{timeout}: {e}")))?;
        }
        if let Some(bind) = get(ENV_BIND) {
            self.server.bind = bind.trim().to_string();
        }
        if let Some(domains) = get(ENV_OFFICIAL_DOMAINS) {
            self.official_domains = domains
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        self.validate()
    }

    /// Rejects zero caps and timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai_timeout_ms == 0 {
            return Err(invalid("ai_timeout_ms", "must be greater than zero"));
        }
        let r = &self.retrieval;
        for (field, value) in [
            ("retrieval.max_sources", r.max_sources as u64),
            ("retrieval.max_per_source", r.max_per_source as u64),
            ("retrieval.ttl_secs", r.ttl_secs),
            ("retrieval.per_source_timeout_ms", r.per_source_timeout_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        if self.server.bind.trim().is_empty() {
            return Err(invalid("server.bind", "must not be empty"));
        }
        Ok(())
    }

    /// Deadline of the AI round trip.
    #[must_use]
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }

    /// Allow-list built from `official_domains`.
    #[must_use]
    pub fn domain_allow_list(&self) -> DomainAllowList {
        DomainAllowList::new(&self.official_domains)
    }
}
