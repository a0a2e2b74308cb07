//! DOI redirect resolution.
//!
//! The [`RedirectResolver`] asks the DOI lookup service for the DOI and
//! follows the redirect chain to the landing page. It holds no per-request
//! state; caching of the result lives in
//! [`ResolutionContext`](super::ResolutionContext).

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::bounded::{StageOutcome, race};
use crate::config::{ConfigError, StagingConfig};
use crate::http_client::{HttpClientSettings, build_http_client};

use super::ResolveError;

const DOI_SCHEME_PREFIX: &str = "doi:";

/// Follows DOI redirects to the canonical landing URL.
pub struct RedirectResolver {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl RedirectResolver {
    /// Creates a resolver from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the HTTP client cannot be built.
    pub fn new(config: &StagingConfig) -> Result<Self, ConfigError> {
        let client = build_http_client(
            "doi-redirect",
            HttpClientSettings::redirecting(config.connect_timeout(), config.redirect_timeout()),
        )?;
        Ok(Self::with_client(
            client,
            config.doi_resolver_url.clone(),
            config.redirect_timeout(),
        ))
    }

    /// Creates a resolver around an existing [`Client`] (for tests).
    ///
    /// The client must follow redirects for lookups to reach the landing page.
    #[must_use]
    pub fn with_client(client: Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    /// Builds the lookup URL for a DOI.
    ///
    /// Accepts bare DOIs (`10.x/y`), `doi:` prefixed DOIs and full URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidInput`] for blank DOIs or DOIs that
    /// cannot form a URL.
    pub fn lookup_url(&self, doi: &str) -> Result<Url, ResolveError> {
        let trimmed = doi.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::blank_doi(doi));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Url::parse(trimmed)
                .map_err(|e| ResolveError::invalid_input(doi, &format!("not a valid URL: {e}")));
        }

        let bare = if trimmed
            .get(..DOI_SCHEME_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(DOI_SCHEME_PREFIX))
        {
            trimmed[DOI_SCHEME_PREFIX.len()..].trim_start()
        } else {
            trimmed
        };

        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(bare.trim_start_matches('/'))
            .map_err(|e| ResolveError::invalid_input(doi, &format!("cannot build lookup URL: {e}")))
    }

    /// Resolves a DOI to its canonical landing URL.
    ///
    /// Returns `Ok(None)` when the lookup service answers without redirecting.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::RedirectResolutionFailed`] on transport or
    /// protocol errors (including redirect loops) and
    /// [`ResolveError::FetchTimeout`] when the lookup exceeds its bound; both
    /// are distinct from "no redirect".
    #[tracing::instrument(skip(self), fields(base = %self.base_url))]
    pub async fn resolve(&self, doi: &str) -> Result<Option<String>, ResolveError> {
        let lookup = self.lookup_url(doi)?;
        let lookup_str = lookup.to_string();
        debug!(lookup = %lookup_str, "Looking up DOI redirect");

        let response = match race(self.timeout, self.client.get(lookup).send()).await {
            StageOutcome::Completed(response) => response,
            StageOutcome::TimedOut(elapsed) => {
                warn!(elapsed_ms = elapsed.as_millis(), "DOI redirect lookup timed out");
                return Err(ResolveError::timeout("redirect lookup", &lookup_str, elapsed));
            }
            StageOutcome::Failed(error) if error.is_timeout() => {
                return Err(ResolveError::timeout("redirect lookup", &lookup_str, self.timeout));
            }
            StageOutcome::Failed(error) => {
                warn!(error = %error, "DOI redirect lookup failed");
                return Err(ResolveError::redirect_failed(doi, error.to_string()));
            }
        };

        let final_url = response.url().to_string();
        if final_url == lookup_str {
            debug!(status = response.status().as_u16(), "DOI did not redirect");
            return Ok(None);
        }

        info!(canonical_url = %final_url, "DOI redirected");
        Ok(Some(final_url))
    }
}

impl std::fmt::Debug for RedirectResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectResolver")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
