//! Request-level orchestration: DOI → provider → file listing → transfer job.
//!
//! Each call works on its own [`ResolutionContext`]; the pipeline itself only
//! holds read-only configuration and shared connection pools, so one
//! instance serves concurrent requests.

use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{ConfigError, StagingConfig};
use crate::error::PipelineError;
use crate::resolver::{
    DoiResolutionRequest, ProviderMatch, ProviderRegistry, RedirectResolver, ResolutionContext,
    ResolveError, build_provider_registry,
};
use crate::storage::{StorageContent, normalize};
use crate::transfer::{
    Destination, DestinationSpec, FileTransferClient, ProjectedTransfer, SubmittedJob,
    TransferError, project,
};

/// Files of a resolved dataset and the record they came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDataset {
    /// Provider addressing of the record.
    pub addressing: ProviderMatch,
    /// The record's files in listing order.
    pub content: StorageContent,
}

/// A job accepted by the transfer backend.
#[derive(Debug, Clone, Serialize)]
pub struct StagedJob {
    /// Backend acknowledgement.
    pub job: SubmittedJob,
    /// The submitted job and its destination hosts.
    pub projection: ProjectedTransfer,
}

/// The full staging chain.
pub struct StagingPipeline {
    redirects: RedirectResolver,
    providers: ProviderRegistry,
    transfer: Option<FileTransferClient>,
    supported_destinations: Vec<Destination>,
}

impl StagingPipeline {
    /// Builds every client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a client or endpoint cannot be built.
    pub fn from_config(config: &StagingConfig) -> Result<Self, ConfigError> {
        let redirects = RedirectResolver::new(config)?;
        let providers = build_provider_registry(config)?;
        let mut pipeline = Self::new(redirects, providers, config.supported_destinations.clone());
        if let Some(backend) = &config.transfer {
            pipeline = pipeline
                .with_transfer_client(FileTransferClient::new(backend, config.connect_timeout())?);
        }
        Ok(pipeline)
    }

    /// Assembles a pipeline from prebuilt parts, without a transfer backend.
    #[must_use]
    pub fn new(
        redirects: RedirectResolver,
        providers: ProviderRegistry,
        supported_destinations: Vec<Destination>,
    ) -> Self {
        Self {
            redirects,
            providers,
            transfer: None,
            supported_destinations,
        }
    }

    /// Attaches the transfer backend used by [`stage`](Self::stage).
    #[must_use]
    pub fn with_transfer_client(mut self, client: FileTransferClient) -> Self {
        self.transfer = Some(client);
        self
    }

    /// Resolves a DOI into the dataset's files.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Resolve`] for any resolution failure.
    #[tracing::instrument(skip(self, request), fields(doi = %request.doi))]
    pub async fn resolve_content(
        &self,
        request: &DoiResolutionRequest,
    ) -> Result<ResolvedDataset, PipelineError> {
        let doi = request.doi.trim();
        if doi.is_empty() {
            return Err(ResolveError::blank_doi(&request.doi).into());
        }

        let ctx = ResolutionContext::new(doi, &self.redirects);
        let selection = self.providers.select(&ctx).await?;
        let listing = selection.provider.fetch(&selection.addressing).await?;
        let content = normalize(listing);
        info!(
            provider = %selection.addressing.provider_id,
            files = content.count(),
            bytes = content.total_bytes(),
            "Resolved dataset"
        );

        Ok(ResolvedDataset {
            addressing: selection.addressing,
            content,
        })
    }

    /// Resolves a DOI and projects its files onto the requested destinations.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidInput`] when no destinations are given
    /// - [`TransferError::UnsupportedDestination`] for disabled storages
    /// - [`TransferError::InvalidDestinationUrl`] for malformed destinations
    /// - any resolution failure
    #[tracing::instrument(skip(self, request, spec), fields(doi = %request.doi))]
    pub async fn resolve(
        &self,
        request: &DoiResolutionRequest,
        spec: &DestinationSpec,
    ) -> Result<ProjectedTransfer, PipelineError> {
        if spec.destinations.iter().all(|d| d.trim().is_empty()) {
            return Err(ResolveError::invalid_input(
                &request.doi,
                "no destination storage was requested",
            )
            .into());
        }
        self.check_destinations(spec)?;

        let dataset = self.resolve_content(request).await?;
        let projected = project(&dataset.content, spec);
        if let Some(url) = projected.transfer.invalid_url() {
            return Err(TransferError::invalid_destination(url).into());
        }
        Ok(projected)
    }

    /// Resolves, projects and submits the job to the transfer backend.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::BackendNotConfigured`] without touching the
    /// network when no backend is configured, otherwise any error from
    /// [`resolve`](Self::resolve) or the submission.
    #[tracing::instrument(skip(self, request, spec), fields(doi = %request.doi))]
    pub async fn stage(
        &self,
        request: &DoiResolutionRequest,
        spec: &DestinationSpec,
    ) -> Result<StagedJob, PipelineError> {
        let backend = self
            .transfer
            .as_ref()
            .ok_or(TransferError::BackendNotConfigured)?;

        let projection = self.resolve(request, spec).await?;
        let token = request.access_token.as_deref().unwrap_or_default();
        let job = backend.submit(&projection.transfer, token).await?;
        info!(job_id = %job.job_id, "Transfer job submitted");

        Ok(StagedJob { job, projection })
    }

    /// Rejects destinations whose storage is not enabled.
    ///
    /// Unparseable destinations pass here and fail during projection, where
    /// the offending string is recorded.
    fn check_destinations(&self, spec: &DestinationSpec) -> Result<(), TransferError> {
        for raw in &spec.destinations {
            let Ok(url) = Url::parse(raw.trim()) else {
                debug!(destination = %raw, "Destination does not parse; deferring to projection");
                continue;
            };
            let enabled = self
                .supported_destinations
                .iter()
                .any(|d| d.matches_scheme(url.scheme()));
            if !enabled {
                return Err(TransferError::unsupported_destination(raw, url.scheme()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for StagingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingPipeline")
            .field("redirects", &self.redirects)
            .field("providers", &self.providers)
            .field("transfer", &self.transfer.as_ref().map(FileTransferClient::jobs_url))
            .field("supported_destinations", &self.supported_destinations)
            .finish()
    }
}
