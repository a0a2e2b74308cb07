//! Provider registry with an ordered selection loop.
//!
//! The [`ProviderRegistry`] holds the configured providers and picks the
//! first one whose probe accepts a DOI.

use tracing::{debug, info, warn};

use super::utils::is_blank;
use super::{Provider, ProviderMatch, ResolutionContext, ResolveError};

/// The provider that accepted a DOI together with its addressing.
pub struct Selection<'r> {
    /// The accepting provider.
    pub provider: &'r dyn Provider,
    /// Addressing produced by the probe.
    pub addressing: ProviderMatch,
}

impl std::fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("provider", &self.provider.id())
            .field("addressing", &self.addressing)
            .finish()
    }
}

/// An ordered collection of providers.
///
/// Probes run in registration order; the first acceptance wins.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderRegistry {
    /// Creates an empty provider registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registers a provider at the end of the probe order.
    #[tracing::instrument(skip(self, provider), fields(provider_id))]
    pub fn register(&mut self, provider: Box<dyn Provider>) {
        tracing::Span::current().record("provider_id", provider.id());
        debug!(id = provider.id(), name = provider.name(), "Registering provider");
        self.providers.push(provider);
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns provider ids in probe order.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Selects the first provider whose probe accepts the DOI.
    ///
    /// A probe error does not stop the loop; later providers still get a
    /// chance. If every probe errored, the first error is returned since it
    /// explains the failure better than "no match" (typically a failed
    /// redirect lookup shared by all probes).
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidInput`] for a blank DOI (no network is used)
    /// - [`ResolveError::NoProviderMatched`] when every probe declines
    /// - the first probe error when no probe declined cleanly
    #[tracing::instrument(skip(self, ctx), fields(doi = %ctx.doi()))]
    pub async fn select(
        &self,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Selection<'_>, ResolveError> {
        if is_blank(ctx.doi()) {
            return Err(ResolveError::blank_doi(ctx.doi()));
        }

        let mut first_error: Option<ResolveError> = None;
        let mut declined: usize = 0;

        for provider in &self.providers {
            debug!(provider = provider.id(), "Probing provider");
            match provider.can_handle(ctx).await {
                Ok(Some(addressing)) => {
                    info!(
                        provider = provider.id(),
                        record_id = %addressing.record_id,
                        "Provider accepted DOI"
                    );
                    return Ok(Selection {
                        provider: provider.as_ref(),
                        addressing,
                    });
                }
                Ok(None) => declined += 1,
                Err(err) => {
                    warn!(provider = provider.id(), error = %err, "Provider probe failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) if declined == 0 => Err(err),
            _ => Err(ResolveError::no_provider(ctx.doi(), self.providers.len())),
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("provider_count", &self.providers.len())
            .field("providers", &self.provider_ids())
            .finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
