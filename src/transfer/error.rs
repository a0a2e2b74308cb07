//! Error types for transfer projection and submission.

use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur while building or submitting a transfer job.
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// A destination URL could not be parsed
    #[error("invalid destination URL '{url}'\n  Suggestion: Use an absolute URL such as s3://bucket/path")]
    InvalidDestinationUrl {
        /// The offending raw string
        url: String,
    },

    /// A destination uses a storage protocol that is not enabled
    #[error("unsupported destination '{url}': storage '{scheme}' is not enabled\n  Suggestion: Use one of the configured destination storages")]
    UnsupportedDestination {
        /// The requested destination
        url: String,
        /// Its scheme
        scheme: String,
    },

    /// Submission was requested but no transfer backend is configured
    #[error("no transfer backend configured\n  Suggestion: Add a [transfer] section to the configuration file")]
    BackendNotConfigured,

    /// The transfer backend did not answer in time
    #[error("job submission to '{url}' timed out after {}ms", elapsed.as_millis())]
    Timeout {
        /// Submission endpoint
        url: String,
        /// The configured bound
        elapsed: Duration,
    },

    /// The transfer backend rejected the job or could not be reached
    #[error("{reason} from '{url}'{}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream {
        /// Submission endpoint
        url: String,
        /// HTTP status, absent when no response was received
        status: Option<u16>,
        /// Short description of the failure
        reason: String,
        /// Raw response body, preserved for diagnostics
        body: Option<String>,
    },
}

impl TransferError {
    /// Creates an `InvalidDestinationUrl` error.
    #[must_use]
    pub fn invalid_destination(url: &str) -> Self {
        Self::InvalidDestinationUrl {
            url: url.to_string(),
        }
    }

    /// Creates an `UnsupportedDestination` error.
    #[must_use]
    pub fn unsupported_destination(url: &str, scheme: &str) -> Self {
        Self::UnsupportedDestination {
            url: url.to_string(),
            scheme: scheme.to_string(),
        }
    }

    /// Returns the machine-readable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDestinationUrl { .. } => ErrorKind::InvalidDestinationUrl,
            Self::UnsupportedDestination { .. } => ErrorKind::InvalidInput,
            Self::BackendNotConfigured => ErrorKind::InvalidConfig,
            Self::Timeout { .. } => ErrorKind::FetchTimeout,
            Self::Upstream { .. } => ErrorKind::UpstreamError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_kinds() {
        assert_eq!(
            TransferError::invalid_destination("ht!tp://x").kind(),
            ErrorKind::InvalidDestinationUrl
        );
        assert_eq!(
            TransferError::unsupported_destination("gsiftp://h/p", "gsiftp").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            TransferError::BackendNotConfigured.kind(),
            ErrorKind::InvalidConfig
        );
    }

    #[test]
    fn test_transfer_error_upstream_message_includes_status() {
        let err = TransferError::Upstream {
            url: "https://fts.example.org/jobs".to_string(),
            status: Some(403),
            reason: "transfer backend rejected the job".to_string(),
            body: Some("forbidden".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 403"));
        assert!(msg.contains("fts.example.org"));
    }
}
