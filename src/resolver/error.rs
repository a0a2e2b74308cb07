//! Error types for DOI resolution.
//!
//! This module defines structured errors for provider selection and record
//! fetching, following the What/Why/Fix pattern used across the project.

use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur while resolving a DOI into a file listing.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The DOI was blank or absent
    #[error("invalid input '{input}': {reason}\n  Suggestion: {suggestion}")]
    InvalidInput {
        /// The offending input
        input: String,
        /// Why the input was rejected
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// No configured provider recognizes the DOI
    #[error(
        "no provider recognizes DOI '{doi}': tried {tried_count} provider(s)\n  Suggestion: Check that the DOI points to a supported repository"
    )]
    NoProviderMatched {
        /// The DOI that no provider accepted
        doi: String,
        /// Number of providers that were tried
        tried_count: usize,
    },

    /// Transport or protocol failure while following the DOI redirect
    #[error("could not follow redirect for DOI '{doi}': {reason}\n  Suggestion: Check your network connection and the DOI resolver endpoint")]
    RedirectResolutionFailed {
        /// The DOI being resolved
        doi: String,
        /// Why the redirect could not be determined
        reason: String,
    },

    /// A provider was selected but cannot talk to its endpoint
    #[error("invalid configuration for provider '{provider}': {reason}\n  Suggestion: Check the provider endpoint in the configuration file")]
    InvalidConfig {
        /// Provider id
        provider: String,
        /// What is wrong with the configuration
        reason: String,
    },

    /// A provider matched but produced no record identifier
    #[error("provider '{provider}' matched but no record id was extracted")]
    MissingRecordId {
        /// Provider id
        provider: String,
    },

    /// A bounded network stage did not complete in time
    #[error("{stage} at '{url}' timed out after {}ms\n  Suggestion: Retry later or raise the provider timeout", elapsed.as_millis())]
    FetchTimeout {
        /// Which stage timed out (e.g. "record fetch")
        stage: &'static str,
        /// The URL that was being requested
        url: String,
        /// The configured bound
        elapsed: Duration,
    },

    /// The record was fetched but does not reference its files
    #[error("record '{record_id}' from provider '{provider}' has no file listing link")]
    NoFileListingLink {
        /// Provider id
        provider: String,
        /// The record that was fetched
        record_id: String,
    },

    /// Any non-success response or unusable reply from a provider
    #[error("{reason} from '{url}'{}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream {
        /// The URL that was requested
        url: String,
        /// HTTP status, absent when the request never got a response
        status: Option<u16>,
        /// Short description of the failure
        reason: String,
        /// Raw response body for diagnostics
        body: Option<String>,
    },
}

impl ResolveError {
    /// Creates an `InvalidInput` error for a blank DOI.
    #[must_use]
    pub fn blank_doi(input: &str) -> Self {
        Self::InvalidInput {
            input: input.to_string(),
            reason: "DOI must not be blank".to_string(),
            suggestion: "Pass a DOI such as 10.23728/b2share.1234".to_string(),
        }
    }

    /// Creates an `InvalidInput` error with a custom reason.
    #[must_use]
    pub fn invalid_input(input: &str, reason: &str) -> Self {
        Self::InvalidInput {
            input: input.to_string(),
            reason: reason.to_string(),
            suggestion: "Check the request parameters and try again".to_string(),
        }
    }

    /// Creates a `NoProviderMatched` error.
    #[must_use]
    pub fn no_provider(doi: &str, tried_count: usize) -> Self {
        Self::NoProviderMatched {
            doi: doi.to_string(),
            tried_count,
        }
    }

    /// Creates a `RedirectResolutionFailed` error.
    #[must_use]
    pub fn redirect_failed(doi: &str, reason: impl Into<String>) -> Self {
        Self::RedirectResolutionFailed {
            doi: doi.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidConfig` error.
    #[must_use]
    pub fn invalid_config(provider: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `MissingRecordId` error.
    #[must_use]
    pub fn missing_record_id(provider: &str) -> Self {
        Self::MissingRecordId {
            provider: provider.to_string(),
        }
    }

    /// Creates a `FetchTimeout` error.
    #[must_use]
    pub fn timeout(stage: &'static str, url: &str, elapsed: Duration) -> Self {
        Self::FetchTimeout {
            stage,
            url: url.to_string(),
            elapsed,
        }
    }

    /// Creates a `NoFileListingLink` error.
    #[must_use]
    pub fn no_file_listing(provider: &str, record_id: &str) -> Self {
        Self::NoFileListingLink {
            provider: provider.to_string(),
            record_id: record_id.to_string(),
        }
    }

    /// Creates an `Upstream` error for a non-success HTTP response.
    #[must_use]
    pub fn upstream_status(url: &str, status: u16, body: Option<String>) -> Self {
        Self::Upstream {
            url: url.to_string(),
            status: Some(status),
            reason: "provider returned an error response".to_string(),
            body,
        }
    }

    /// Creates an `Upstream` error for a request that got no usable response.
    #[must_use]
    pub fn upstream(url: &str, reason: impl Into<String>) -> Self {
        Self::Upstream {
            url: url.to_string(),
            status: None,
            reason: reason.into(),
            body: None,
        }
    }

    /// Returns the machine-readable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::NoProviderMatched { .. } => ErrorKind::NoProviderMatched,
            Self::RedirectResolutionFailed { .. } => ErrorKind::RedirectResolutionFailed,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::MissingRecordId { .. } => ErrorKind::MissingRecordId,
            Self::FetchTimeout { .. } => ErrorKind::FetchTimeout,
            Self::NoFileListingLink { .. } => ErrorKind::NoFileListingLink,
            Self::Upstream { .. } => ErrorKind::UpstreamError,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_blank_doi_message() {
        let err = ResolveError::blank_doi("  ");
        let msg = err.to_string();
        assert!(msg.contains("must not be blank"));
        assert!(msg.contains("Suggestion"));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_resolve_error_no_provider_message() {
        let err = ResolveError::no_provider("10.1234/test", 2);
        let msg = err.to_string();
        assert!(msg.contains("10.1234/test"));
        assert!(msg.contains("2 provider(s)"));
        assert_eq!(err.kind(), ErrorKind::NoProviderMatched);
    }

    #[test]
    fn test_resolve_error_timeout_message() {
        let err = ResolveError::timeout(
            "record fetch",
            "https://b2share.eudat.eu/api/records/abc",
            Duration::from_millis(250),
        );
        let msg = err.to_string();
        assert!(msg.contains("record fetch"));
        assert!(msg.contains("250ms"));
        assert_eq!(err.kind(), ErrorKind::FetchTimeout);
    }

    #[test]
    fn test_resolve_error_upstream_status_keeps_body() {
        let err = ResolveError::upstream_status(
            "https://zenodo.org/api/records/1",
            410,
            Some("{\"message\":\"gone\"}".to_string()),
        );
        assert!(err.to_string().contains("HTTP 410"));
        match err {
            ResolveError::Upstream { status, body, .. } => {
                assert_eq!(status, Some(410));
                assert_eq!(body.unwrap(), "{\"message\":\"gone\"}");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_error_upstream_without_status_omits_http() {
        let err = ResolveError::upstream("https://example.org", "connection refused");
        assert!(!err.to_string().contains("HTTP"));
        assert_eq!(err.kind(), ErrorKind::UpstreamError);
    }

    #[test]
    fn test_resolve_error_clone() {
        let err = ResolveError::redirect_failed("10.1/x", "dns failure");
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
        assert_eq!(cloned.kind(), ErrorKind::RedirectResolutionFailed);
    }
}
