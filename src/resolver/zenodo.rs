//! Zenodo provider: recognizes Zenodo record landing pages and lists the
//! record's files through the records API.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{ConfigError, ProviderConfig};
use crate::http_client::{HttpClientSettings, build_http_client};
use crate::storage::{RawFileEntry, RawFileListing};

use super::fetch::get_json;
use super::utils::{api_url, compile_static_regex, is_blank, match_landing_url};
use super::{Provider, ProviderMatch, ResolutionContext, ResolveError};

// Zenodo serves both /record/{id} (legacy) and /records/{id}
static LANDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)^(https?://[^/:]*zenodo[^/:]*:?\d*)/records?/(\d+(?:[/?#].*)?)$")
});

static FILES_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)^https?://[^/]+/api/records/([^/?#]+)/files/?(?:[?#].*)?$")
});

#[derive(Debug, Deserialize)]
struct ZenodoRecord {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    links: ZenodoRecordLinks,
}

#[derive(Debug, Default, Deserialize)]
struct ZenodoRecordLinks {
    #[serde(default)]
    files: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZenodoFileListing {
    #[serde(default)]
    entries: Vec<ZenodoFile>,
}

#[derive(Debug, Deserialize)]
struct ZenodoFile {
    key: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    links: ZenodoFileLinks,
}

#[derive(Debug, Default, Deserialize)]
struct ZenodoFileLinks {
    #[serde(default)]
    content: Option<Url>,
}

/// Provider for Zenodo repositories.
pub struct ZenodoProvider {
    client: Client,
    config: ProviderConfig,
}

impl ZenodoProvider {
    /// Creates a provider with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the HTTP client cannot be built.
    pub fn new(config: ProviderConfig, connect_timeout: Duration) -> Result<Self, ConfigError> {
        let client = build_http_client(
            &config.id,
            HttpClientSettings::api(connect_timeout, config.timeout()),
        )?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a provider around an existing [`Client`] (for tests).
    #[must_use]
    pub fn with_client(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

impl std::fmt::Debug for ZenodoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenodoProvider")
            .field("id", &self.config.id)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for ZenodoProvider {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    #[tracing::instrument(skip(self, ctx), fields(provider = %self.config.id, doi = %ctx.doi()))]
    async fn can_handle(
        &self,
        ctx: &ResolutionContext<'_>,
    ) -> Result<Option<ProviderMatch>, ResolveError> {
        let doi = ctx.doi();
        if is_blank(doi) {
            return Ok(None);
        }

        let Some(landing_url) = ctx.canonical_url().await? else {
            return Ok(None);
        };
        if landing_url == doi {
            return Ok(None);
        }

        let Some((server, record_id)) = match_landing_url(&LANDING_RE, landing_url) else {
            debug!(landing_url, "Not a Zenodo record");
            return Ok(None);
        };
        // Record ids are numeric; drop any sub-path such as /files/x
        let record_id = record_id
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let server = self.config.base_url.clone().unwrap_or(server);

        Ok(ProviderMatch::new(
            &self.config.id,
            &self.config.name,
            server,
            record_id,
        ))
    }

    #[tracing::instrument(skip(self, addressing), fields(provider = %self.config.id, record = %addressing.record_id))]
    async fn fetch(&self, addressing: &ProviderMatch) -> Result<RawFileListing, ResolveError> {
        if addressing.record_id.trim().is_empty() {
            return Err(ResolveError::missing_record_id(&self.config.id));
        }
        let timeout = self.config.timeout();
        let server = &addressing.server_base_url;

        let record_url = api_url(
            &self.config.id,
            server,
            &["api", "records", addressing.record_id.as_str()],
        )?;
        let record: ZenodoRecord =
            get_json(&self.client, record_url, "record fetch", timeout).await?;
        info!(record = ?record.id, "Got Zenodo record");

        let container = record
            .links
            .files
            .as_deref()
            .and_then(|link| FILES_LINK_RE.captures(link))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ResolveError::no_file_listing(&self.config.id, &addressing.record_id))?;

        let files_url = api_url(
            &self.config.id,
            server,
            &["api", "records", container.as_str(), "files"],
        )?;
        let listing: ZenodoFileListing =
            get_json(&self.client, files_url.clone(), "listing fetch", timeout).await?;

        let mut entries = Vec::with_capacity(listing.entries.len());
        for file in listing.entries {
            let download_url = match file.links.content {
                Some(url) => url,
                None => api_url(
                    &self.config.id,
                    server,
                    &["api", "records", container.as_str(), "files", file.key.as_str(), "content"],
                )?,
            };
            entries.push(RawFileEntry {
                name: file.key,
                size: file.size,
                checksum: file.checksum,
                download_url,
            });
        }
        info!(files = entries.len(), url = %files_url, "Listed Zenodo record files");

        Ok(RawFileListing { entries })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    async fn probe(doi: &str, landing: Option<&str>) -> Option<ProviderMatch> {
        let provider = ZenodoProvider::with_client(
            Client::new(),
            ProviderConfig::new("zenodo", ProviderKind::Zenodo, "Zenodo"),
        );
        let ctx = ResolutionContext::with_canonical_url(doi, landing.map(str::to_string));
        provider.can_handle(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_zenodo_accepts_records_and_legacy_record_paths() {
        let m = probe("10.5281/zenodo.7654321", Some("https://zenodo.org/records/7654321"))
            .await
            .unwrap();
        assert_eq!(m.server_base_url.as_str(), "https://zenodo.org/");
        assert_eq!(m.record_id, "7654321");

        let m = probe("10.5281/zenodo.1", Some("https://sandbox.zenodo.org/record/1/files/a.csv"))
            .await
            .unwrap();
        assert_eq!(m.server_base_url.host_str(), Some("sandbox.zenodo.org"));
        assert_eq!(m.record_id, "1");
    }

    #[tokio::test]
    async fn test_zenodo_rejects_non_numeric_records() {
        assert!(probe("10.1/x", Some("https://zenodo.org/records/abc")).await.is_none());
    }

    #[tokio::test]
    async fn test_zenodo_rejects_b2share_landing_page() {
        assert!(probe("10.1/x", Some("https://b2share.eudat.eu/records/abc")).await.is_none());
    }

    #[tokio::test]
    async fn test_zenodo_rejects_blank_and_self_redirect() {
        assert!(probe("", Some("https://zenodo.org/records/1")).await.is_none());
        let url = "https://zenodo.org/records/1";
        assert!(probe(url, Some(url)).await.is_none());
    }

    #[test]
    fn test_files_link_pattern() {
        let caps = FILES_LINK_RE
            .captures("https://zenodo.org/api/records/7654321/files")
            .unwrap();
        assert_eq!(&caps[1], "7654321");
        assert!(FILES_LINK_RE.is_match("http://127.0.0.1:9000/api/records/5/files/"));
        assert!(!FILES_LINK_RE.is_match("https://zenodo.org/api/files/bucket"));
    }
}
