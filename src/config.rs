//! Configuration surface: provider endpoints, precedence, timeouts and
//! supported destination storages.
//!
//! Configuration is read once from a TOML file and then shared read-only by
//! every request; nothing here is mutated after loading.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::transfer::Destination;

const DEFAULT_DOI_RESOLVER_URL: &str = "https://doi.org";
const DEFAULT_REDIRECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is syntactically valid but unusable.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An HTTP client could not be constructed for a component.
    #[error("cannot build HTTP client for {component}: {reason}")]
    HttpClient {
        /// Provider id or component name.
        component: String,
        /// Why construction failed.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// The statically known provider implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// EUDAT B2Share record repositories.
    B2Share,
    /// Zenodo record repositories.
    Zenodo,
}

/// Settings for one metadata provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Stable provider identifier.
    pub id: String,
    /// Which provider implementation handles this entry.
    pub kind: ProviderKind,
    /// Human-readable provider name.
    pub name: String,
    /// Bound for each record or listing fetch, in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
    /// API endpoint override; by default the server is taken from the landing URL.
    #[serde(default)]
    pub base_url: Option<Url>,
}

impl ProviderConfig {
    /// Creates a provider entry with default timeout and no endpoint override.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ProviderKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
            base_url: None,
        }
    }

    /// Returns the fetch timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for the transfer backend that receives staged jobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferBackendConfig {
    /// Base URL of the transfer service.
    pub url: Url,
    /// Bound for job submission, in milliseconds.
    #[serde(default = "default_transfer_timeout_ms")]
    pub timeout_ms: u64,
}

impl TransferBackendConfig {
    /// Returns the submission timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingConfig {
    /// Base URL used to look up DOI redirects.
    #[serde(default = "default_doi_resolver_url")]
    pub doi_resolver_url: Url,
    /// Bound for the redirect lookup, in milliseconds.
    #[serde(default = "default_redirect_timeout_ms")]
    pub redirect_timeout_ms: u64,
    /// TCP/TLS connect timeout for every client, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Destination storages that may be requested.
    #[serde(default = "default_supported_destinations")]
    pub supported_destinations: Vec<Destination>,
    /// Transfer backend; required only for job submission.
    #[serde(default)]
    pub transfer: Option<TransferBackendConfig>,
    /// Providers in precedence order.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            doi_resolver_url: default_doi_resolver_url(),
            redirect_timeout_ms: DEFAULT_REDIRECT_TIMEOUT_MS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            supported_destinations: default_supported_destinations(),
            transfer: None,
            providers: default_providers(),
        }
    }
}

impl StagingConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on syntax errors or invalid values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout_ms("redirect_timeout_ms", self.redirect_timeout_ms)?;
        if !(1..=3600).contains(&self.connect_timeout_secs) {
            return Err(ConfigError::invalid(
                "connect_timeout_secs",
                format!("{} is outside 1..=3600", self.connect_timeout_secs),
            ));
        }
        validate_http_url("doi_resolver_url", &self.doi_resolver_url)?;

        if self.supported_destinations.is_empty() {
            return Err(ConfigError::invalid(
                "supported_destinations",
                "at least one destination storage is required",
            ));
        }

        if self.providers.is_empty() {
            return Err(ConfigError::invalid(
                "providers",
                "at least one provider is required",
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(ConfigError::invalid("providers.id", "must not be blank"));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::invalid(
                    "providers.id",
                    format!("duplicate provider id '{}'", provider.id),
                ));
            }
            validate_timeout_ms(&format!("providers.{}.timeout_ms", provider.id), provider.timeout_ms)?;
            if let Some(base_url) = &provider.base_url {
                validate_http_url(&format!("providers.{}.base_url", provider.id), base_url)?;
            }
        }

        if let Some(transfer) = &self.transfer {
            validate_timeout_ms("transfer.timeout_ms", transfer.timeout_ms)?;
            validate_http_url("transfer.url", &transfer.url)?;
        }

        Ok(())
    }

    /// Returns the redirect lookup timeout as a [`Duration`].
    #[must_use]
    pub fn redirect_timeout(&self) -> Duration {
        Duration::from_millis(self.redirect_timeout_ms)
    }

    /// Returns the connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns true if `destination` may be requested.
    #[must_use]
    pub fn supports(&self, destination: Destination) -> bool {
        self.supported_destinations.contains(&destination)
    }
}

fn validate_timeout_ms(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::invalid(
            field,
            format!("{value} is outside 1..={MAX_TIMEOUT_MS}"),
        ));
    }
    Ok(())
}

fn validate_http_url(field: &str, url: &Url) -> Result<(), ConfigError> {
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::invalid(
            field,
            format!("'{url}' is not an absolute http(s) URL"),
        ));
    }
    Ok(())
}

fn default_doi_resolver_url() -> Url {
    Url::parse(DEFAULT_DOI_RESOLVER_URL).unwrap_or_else(|e| panic!("invalid default URL: {e}"))
}

fn default_redirect_timeout_ms() -> u64 {
    DEFAULT_REDIRECT_TIMEOUT_MS
}

fn default_provider_timeout_ms() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_MS
}

fn default_transfer_timeout_ms() -> u64 {
    DEFAULT_TRANSFER_TIMEOUT_MS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_supported_destinations() -> Vec<Destination> {
    Destination::ALL.to_vec()
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new("b2share", ProviderKind::B2Share, "EUDAT B2Share"),
        ProviderConfig::new("zenodo", ProviderKind::Zenodo, "Zenodo"),
    ]
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/doi-transfer/config.toml`
/// 2. `$HOME/.config/doi-transfer/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("doi-transfer")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("doi-transfer")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StagingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].kind, ProviderKind::B2Share);
        assert_eq!(config.providers[1].kind, ProviderKind::Zenodo);
        assert_eq!(config.doi_resolver_url.as_str(), "https://doi.org/");
    }

    #[test]
    fn test_from_toml_str_full() {
        let raw = r#"
            doi_resolver_url = "https://doi.example.org"
            redirect_timeout_ms = 2500
            supported_destinations = ["s3", "dcache"]

            [transfer]
            url = "https://fts3.example.org:8446"

            [[providers]]
            id = "zen"
            kind = "zenodo"
            name = "Zenodo Sandbox"
            timeout_ms = 1200
            base_url = "https://sandbox.zenodo.org"

            [[providers]]
            id = "b2"
            kind = "b2share"
            name = "B2Share"
        "#;
        let config = StagingConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.redirect_timeout(), Duration::from_millis(2500));
        assert_eq!(config.providers[0].id, "zen");
        assert_eq!(config.providers[0].timeout(), Duration::from_millis(1200));
        assert_eq!(
            config.providers[1].timeout(),
            Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS)
        );
        assert!(config.supports(Destination::S3));
        assert!(!config.supports(Destination::Ftp));
        let transfer = config.transfer.unwrap();
        assert_eq!(transfer.timeout(), Duration::from_millis(DEFAULT_TRANSFER_TIMEOUT_MS));
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_provider_kind() {
        let raw = r#"
            [[providers]]
            id = "x"
            kind = "figshare"
            name = "Figshare"
        "#;
        let err = StagingConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn test_from_toml_str_rejects_duplicate_ids() {
        let raw = r#"
            [[providers]]
            id = "b2"
            kind = "b2share"
            name = "one"

            [[providers]]
            id = "b2"
            kind = "zenodo"
            name = "two"
        "#;
        let err = StagingConfig::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate provider id 'b2'"));
    }

    #[test]
    fn test_from_toml_str_rejects_zero_timeout() {
        let err = StagingConfig::from_toml_str("redirect_timeout_ms = 0").unwrap_err();
        assert!(err.to_string().contains("redirect_timeout_ms"));
    }

    #[test]
    fn test_from_toml_str_rejects_non_http_endpoint() {
        let raw = r#"
            [transfer]
            url = "ftp://fts.example.org"
        "#;
        let err = StagingConfig::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("transfer.url"));
    }

    #[test]
    fn test_from_toml_str_rejects_empty_destinations() {
        let err = StagingConfig::from_toml_str("supported_destinations = []").unwrap_err();
        assert!(err.to_string().contains("supported_destinations"));
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_keys() {
        let err = StagingConfig::from_toml_str("concurrency = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = StagingConfig::load(Path::new("/nonexistent/doi-transfer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
