//! Shared HTTP client construction policy.
//!
//! Provider, redirect and transfer-backend clients are all built here so they
//! stay consistent on timeouts, user-agent, compression and proxy handling.
//! Each client owns a connection pool that is safe to share between
//! concurrent requests.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::config::ConfigError;
use crate::user_agent;

/// Maximum redirect hops followed when resolving a DOI.
pub const MAX_REDIRECTS: usize = 10;

/// Connection settings for one HTTP client.
#[derive(Debug, Clone, Copy)]
pub struct HttpClientSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Upper bound for a whole request, applied by reqwest.
    pub request_timeout: Duration,
    /// Follow redirects (DOI lookups) or stop at the first response (API calls).
    pub follow_redirects: bool,
}

impl HttpClientSettings {
    /// Settings for JSON API calls.
    #[must_use]
    pub fn api(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
            follow_redirects: false,
        }
    }

    /// Settings for redirect lookups.
    #[must_use]
    pub fn redirecting(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
            follow_redirects: true,
        }
    }
}

/// Builds an HTTP client using shared project policy.
///
/// `component` is only used for error messages and logging, never in headers.
///
/// # Errors
///
/// Returns [`ConfigError::HttpClient`] when client construction fails.
pub fn build_http_client(
    component: &str,
    settings: HttpClientSettings,
) -> Result<Client, ConfigError> {
    match try_build_client(settings, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; retry with environment proxies only.
            warn!(
                component,
                "HTTP client hit system proxy panic; using env-proxy fallback builder"
            );
            try_build_client(settings, true).map_err(|failure| failure.into_config_error(component))
        }
        Err(failure) => Err(failure.into_config_error(component)),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

impl BuildClientFailure {
    fn into_config_error(self, component: &str) -> ConfigError {
        let reason = match self {
            Self::Panic => "HTTP client construction panicked".to_string(),
            Self::Build(error) => format!("HTTP client construction failed: {error}"),
        };
        ConfigError::HttpClient {
            component: component.to_string(),
            reason,
        }
    }
}

fn try_build_client(
    settings: HttpClientSettings,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(settings);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(settings: HttpClientSettings) -> ClientBuilder {
    let redirect = if settings.follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(user_agent::default_user_agent())
        .redirect(redirect)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    for (scheme, names) in [
        ("https", ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        ("http", ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
    ] {
        let Some(proxy) = first_non_empty_var(&names) else {
            continue;
        };
        let resolved = if scheme == "https" {
            Proxy::https(&proxy)
        } else {
            Proxy::http(&proxy)
        };
        if let Ok(resolved) = resolved {
            builder = builder.proxy(resolved);
        }
    }
    builder
}

fn first_non_empty_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_api_settings() {
        let settings = HttpClientSettings::api(Duration::from_secs(5), Duration::from_secs(10));
        assert!(!settings.follow_redirects);
        assert!(build_http_client("test", settings).is_ok());
    }

    #[test]
    fn test_build_http_client_redirecting_settings() {
        let settings =
            HttpClientSettings::redirecting(Duration::from_secs(5), Duration::from_secs(10));
        assert!(settings.follow_redirects);
        assert!(build_http_client("test", settings).is_ok());
    }
}
