//! Machine-readable error kinds shared by every pipeline stage.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::resolver::ResolveError;
use crate::transfer::TransferError;

/// Stable, serializable classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Blank DOI or unusable request parameters.
    InvalidInput,
    /// No configured provider accepted the DOI.
    NoProviderMatched,
    /// The DOI redirect could not be followed.
    RedirectResolutionFailed,
    /// Provider or backend endpoint could not be used.
    InvalidConfig,
    /// A provider matched without producing a record id.
    MissingRecordId,
    /// A bounded network stage exceeded its timeout.
    FetchTimeout,
    /// The record does not reference its file listing.
    NoFileListingLink,
    /// A destination URL failed to parse.
    InvalidDestinationUrl,
    /// A provider or the transfer backend answered with an error.
    UpstreamError,
}

impl ErrorKind {
    /// Returns the stable string label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NoProviderMatched => "no_provider_matched",
            Self::RedirectResolutionFailed => "redirect_resolution_failed",
            Self::InvalidConfig => "invalid_config",
            Self::MissingRecordId => "missing_record_id",
            Self::FetchTimeout => "fetch_timeout",
            Self::NoFileListingLink => "no_file_listing_link",
            Self::InvalidDestinationUrl => "invalid_destination_url",
            Self::UpstreamError => "upstream_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure surfaced by [`crate::pipeline::StagingPipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Failure while resolving the DOI into a file listing.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Failure while projecting or submitting the transfer.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Failure while building clients from configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Returns the machine-readable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve(err) => err.kind(),
            Self::Transfer(err) => err.kind(),
            Self::Config(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Builds the caller-facing report for this error.
    #[must_use]
    pub fn report(&self, doi: &str) -> ErrorReport {
        let mut report = ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            doi: doi.to_string(),
            url: None,
            status: None,
            body: None,
        };

        match self {
            Self::Resolve(
                ResolveError::Upstream {
                    url, status, body, ..
                },
            ) => {
                report.url = Some(url.clone());
                report.status = *status;
                report.body.clone_from(body);
            }
            Self::Resolve(ResolveError::FetchTimeout { url, .. }) => {
                report.url = Some(url.clone());
            }
            Self::Transfer(TransferError::InvalidDestinationUrl { url }) => {
                report.url = Some(url.clone());
            }
            Self::Transfer(TransferError::Upstream {
                url, status, body, ..
            }) => {
                report.url = Some(url.clone());
                report.status = *status;
                report.body.clone_from(body);
            }
            _ => {}
        }

        report
    }
}

/// Serializable error description handed back to the request layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    /// Machine-readable error kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// The DOI of the failed request.
    pub doi: String,
    /// The offending URL, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Upstream HTTP status, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Upstream raw body, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}
