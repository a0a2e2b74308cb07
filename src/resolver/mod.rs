//! DOI resolution: redirect lookup, provider selection and record fetch.
//!
//! # Architecture
//!
//! - [`RedirectResolver`] - Follows a DOI to its canonical landing URL
//! - [`ResolutionContext`] - Per-request cache of the redirect result
//! - [`Provider`] - Async trait that repository integrations implement
//! - [`ProviderRegistry`] - Ordered providers with a first-match selection loop
//! - [`B2ShareProvider`] / [`ZenodoProvider`] - Repository integrations
//!
//! # Example
//!
//! ```no_run
//! use doi_transfer_core::config::StagingConfig;
//! use doi_transfer_core::resolver::{
//!     RedirectResolver, ResolutionContext, build_provider_registry,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StagingConfig::default();
//! let redirects = RedirectResolver::new(&config)?;
//! let registry = build_provider_registry(&config)?;
//!
//! let ctx = ResolutionContext::new("10.5281/zenodo.7654321", &redirects);
//! let selection = registry.select(&ctx).await?;
//! let listing = selection.provider.fetch(&selection.addressing).await?;
//! println!("{} files", listing.entries.len());
//! # Ok(())
//! # }
//! ```

mod b2share;
mod context;
mod error;
mod fetch;
mod redirect;
mod registry;
mod utils;
mod zenodo;

pub use b2share::B2ShareProvider;
pub use context::ResolutionContext;
pub use error::ResolveError;
pub use redirect::RedirectResolver;
pub use registry::{ProviderRegistry, Selection};
pub use zenodo::ZenodoProvider;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::config::{ConfigError, ProviderKind, StagingConfig};
use crate::storage::RawFileListing;

/// Builds the provider registry described by the configuration.
///
/// Providers are registered in configuration order, which is the probe order.
///
/// # Errors
///
/// Returns [`ConfigError`] when a provider's HTTP client cannot be built.
pub fn build_provider_registry(config: &StagingConfig) -> Result<ProviderRegistry, ConfigError> {
    let mut registry = ProviderRegistry::new();
    let connect_timeout = config.connect_timeout();

    for provider in &config.providers {
        let provider = provider.clone();
        match provider.kind {
            ProviderKind::B2Share => {
                registry.register(Box::new(B2ShareProvider::new(provider, connect_timeout)?));
            }
            ProviderKind::Zenodo => {
                registry.register(Box::new(ZenodoProvider::new(provider, connect_timeout)?));
            }
        }
    }
    Ok(registry)
}

/// A request to resolve one DOI.
#[derive(Clone, Default)]
pub struct DoiResolutionRequest {
    /// The DOI to resolve (bare, `doi:` prefixed, or a DOI URL).
    pub doi: String,
    /// Credential for the transfer backend. Never sent to providers.
    pub access_token: Option<String>,
}

impl DoiResolutionRequest {
    /// Creates a request without an access token.
    #[must_use]
    pub fn new(doi: impl Into<String>) -> Self {
        Self {
            doi: doi.into(),
            access_token: None,
        }
    }

    /// Attaches an access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for DoiResolutionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoiResolutionRequest")
            .field("doi", &self.doi)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Where a provider found the record behind a DOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMatch {
    /// Id of the accepting provider.
    pub provider_id: String,
    /// Display name of the accepting provider.
    pub provider_name: String,
    /// Server base URL the record API is served from.
    pub server_base_url: Url,
    /// Repository record identifier.
    pub record_id: String,
}

impl ProviderMatch {
    /// Creates addressing for a record, or `None` if the record id is blank.
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        provider_name: impl Into<String>,
        server_base_url: Url,
        record_id: impl Into<String>,
    ) -> Option<Self> {
        let record_id = record_id.into();
        if record_id.trim().is_empty() {
            return None;
        }
        Some(Self {
            provider_id: provider_id.into(),
            provider_name: provider_name.into(),
            server_base_url,
            record_id,
        })
    }
}

/// Trait for repository integrations.
///
/// A provider answers two questions: does this DOI belong to me
/// ([`can_handle`](Provider::can_handle)), and what files does the record
/// hold ([`fetch`](Provider::fetch)). Implementations are stateless and
/// shared across requests; per-request state lives in [`ResolutionContext`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, as in the configuration.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Probes whether this provider serves the DOI.
    ///
    /// Returns `Ok(None)` to decline. Blank DOIs and DOIs without a redirect
    /// are declined, never treated as errors.
    ///
    /// # Errors
    ///
    /// Returns the redirect lookup error when the landing URL could not be
    /// determined.
    async fn can_handle(
        &self,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Option<ProviderMatch>, ResolveError>;

    /// Fetches the record and its file listing.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] for missing record ids, timeouts, missing
    /// listing links and upstream failures.
    async fn fetch(&self, addressing: &ProviderMatch) -> Result<RawFileListing, ResolveError>;
}
