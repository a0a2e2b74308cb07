//! B2Share provider: recognizes B2Share record landing pages and lists the
//! files in the record's bucket.
//!
//! Flow: `GET {server}/api/records/{id}` → `links.files` points at
//! `.../api/files/{bucket}` → `GET {server}/api/files/{bucket}`.

use std::collections::HashMap;
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

static LANDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)^(https?://[^/:]*b2share[^/:]*:?\d*)/records/(.+)$")
});

static FILES_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?i)^https?://[^/]+/api/files/([^/?#]+)/?(?:[?#].*)?$"));

// ==================== B2Share API Response Types ====================

#[derive(Debug, Deserialize)]
struct B2ShareRecord {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    links: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct B2ShareBucket {
    #[serde(default)]
    contents: Vec<B2ShareFile>,
}

#[derive(Debug, Deserialize)]
struct B2ShareFile {
    key: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    links: Option<B2ShareFileLinks>,
}

#[derive(Debug, Deserialize)]
struct B2ShareFileLinks {
    #[serde(rename = "self")]
    self_link: Option<Url>,
}

// ==================== B2ShareProvider ====================

/// Provider for EUDAT B2Share repositories.
pub struct B2ShareProvider {
    client: Client,
    config: ProviderConfig,
}

impl B2ShareProvider {
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

    fn file_entry(&self, bucket_url: &Url, file: B2ShareFile) -> Result<RawFileEntry, ResolveError> {
        let download_url = match file.links.and_then(|links| links.self_link) {
            Some(url) => url,
            None => {
                let mut url = bucket_url.clone();
                url.path_segments_mut()
                    .map_err(|()| {
                        ResolveError::invalid_config(&self.config.id, "bucket URL cannot carry a path")
                    })?
                    .push(&file.key);
                url
            }
        };
        Ok(RawFileEntry {
            name: file.key,
            size: file.size,
            checksum: file.checksum,
            download_url,
        })
    }
}

impl std::fmt::Debug for B2ShareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("B2ShareProvider")
            .field("id", &self.config.id)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for B2ShareProvider {
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
            debug!("No redirect for DOI");
            return Ok(None);
        };
        if landing_url == doi {
            debug!("DOI redirected to itself");
            return Ok(None);
        }

        let Some((server, record_id)) = match_landing_url(&LANDING_RE, landing_url) else {
            debug!(landing_url, "Not a B2Share record");
            return Ok(None);
        };
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

        let record_url = api_url(&self.config.id, server, &["api", "records", addressing.record_id.as_str()])?;
        let record: B2ShareRecord = get_json(&self.client, record_url, "record fetch", timeout).await?;
        info!(record = ?record.id, "Got B2Share record");

        let bucket = record
            .links
            .get("files")
            .and_then(serde_json::Value::as_str)
            .and_then(|link| FILES_LINK_RE.captures(link))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ResolveError::no_file_listing(&self.config.id, &addressing.record_id))?;
        debug!(bucket = %bucket, "Found B2Share file bucket");

        let bucket_url = api_url(&self.config.id, server, &["api", "files", bucket.as_str()])?;
        let listing: B2ShareBucket =
            get_json(&self.client, bucket_url.clone(), "listing fetch", timeout).await?;

        let entries = listing
            .contents
            .into_iter()
            .map(|file| self.file_entry(&bucket_url, file))
            .collect::<Result<Vec<_>, _>>()?;
        info!(files = entries.len(), "Listed B2Share bucket");

        Ok(RawFileListing { entries })
    }
}
