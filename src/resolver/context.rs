//! Per-request resolution state.
//!
//! A [`ResolutionContext`] is created for one DOI resolution attempt and
//! dropped with it. It caches the redirect lookup so every provider probe
//! in the same attempt sees the same answer without another network call.
//! Providers themselves stay stateless and can be shared across requests.

use tokio::sync::OnceCell;

use super::{RedirectResolver, ResolveError};

/// Redirect cache and identity of one resolution attempt.
pub struct ResolutionContext<'a> {
    doi: &'a str,
    redirects: Option<&'a RedirectResolver>,
    canonical_url: OnceCell<Result<Option<String>, ResolveError>>,
}

impl<'a> ResolutionContext<'a> {
    /// Creates a context that looks up the redirect lazily, at most once.
    #[must_use]
    pub fn new(doi: &'a str, redirects: &'a RedirectResolver) -> Self {
        Self {
            doi,
            redirects: Some(redirects),
            canonical_url: OnceCell::new(),
        }
    }

    /// Creates a context whose redirect result is already known.
    #[must_use]
    pub fn with_canonical_url(doi: &'a str, canonical_url: Option<String>) -> Self {
        Self {
            doi,
            redirects: None,
            canonical_url: OnceCell::new_with(Some(Ok(canonical_url))),
        }
    }

    /// The DOI being resolved.
    #[must_use]
    pub fn doi(&self) -> &str {
        self.doi
    }

    /// Returns true once the redirect lookup has run (or was supplied).
    #[must_use]
    pub fn is_redirect_resolved(&self) -> bool {
        self.canonical_url.initialized()
    }

    /// Returns the canonical landing URL, performing the lookup on first use.
    ///
    /// Failures are cached as well, so a broken lookup is reported to every
    /// probe without being retried.
    ///
    /// # Errors
    ///
    /// Returns the lookup error ([`ResolveError::RedirectResolutionFailed`],
    /// [`ResolveError::FetchTimeout`] or [`ResolveError::InvalidInput`]).
    pub async fn canonical_url(&self) -> Result<Option<&str>, ResolveError> {
        let cached = self
            .canonical_url
            .get_or_init(|| async {
                match self.redirects {
                    Some(redirects) => redirects.resolve(self.doi).await,
                    None => Err(ResolveError::redirect_failed(
                        self.doi,
                        "no redirect resolver available",
                    )),
                }
            })
            .await;

        match cached {
            Ok(url) => Ok(url.as_deref()),
            Err(error) => Err(error.clone()),
        }
    }
}

impl std::fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("doi", &self.doi)
            .field("canonical_url", &self.canonical_url.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_supplied_canonical_url_is_returned() {
        let ctx = ResolutionContext::with_canonical_url(
            "10.1/x",
            Some("https://b2share.eudat.eu/records/x".to_string()),
        );
        assert!(ctx.is_redirect_resolved());
        assert_eq!(
            ctx.canonical_url().await.unwrap(),
            Some("https://b2share.eudat.eu/records/x")
        );
    }

    #[tokio::test]
    async fn test_supplied_absent_canonical_url() {
        let ctx = ResolutionContext::with_canonical_url("10.1/x", None);
        assert_eq!(ctx.canonical_url().await.unwrap(), None);
        assert_eq!(ctx.doi(), "10.1/x");
    }
}
