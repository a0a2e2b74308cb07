//! Submission of staged jobs to the file transfer backend.
//!
//! The backend is treated as an opaque job-submission API: the job is posted
//! as JSON and the response status family decides success. On failure the
//! response body is read once and attached to the error.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::bounded::{StageOutcome, race};
use crate::config::{ConfigError, TransferBackendConfig};
use crate::http_client::{HttpClientSettings, build_http_client};

use super::TransferError;
use super::model::Transfer;

/// Acknowledgement returned by the backend for an accepted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedJob {
    /// Backend job identifier.
    pub job_id: String,
}

/// Client for the transfer backend's job-submission endpoint.
pub struct FileTransferClient {
    client: Client,
    jobs_url: Url,
    timeout: Duration,
}

impl FileTransferClient {
    /// Creates a client from backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoint or HTTP client is unusable.
    pub fn new(
        config: &TransferBackendConfig,
        connect_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = build_http_client(
            "transfer",
            HttpClientSettings::api(connect_timeout, config.timeout()),
        )?;
        Self::with_client(client, &config.url, config.timeout())
    }

    /// Creates a client around an existing [`Client`] (for tests).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the jobs endpoint cannot be derived.
    pub fn with_client(
        client: Client,
        base_url: &Url,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let jobs_url = jobs_endpoint(base_url).ok_or_else(|| ConfigError::Invalid {
            field: "transfer.url".to_string(),
            reason: format!("cannot derive jobs endpoint from '{base_url}'"),
        })?;
        Ok(Self {
            client,
            jobs_url,
            timeout,
        })
    }

    /// The endpoint jobs are posted to.
    #[must_use]
    pub fn jobs_url(&self) -> &Url {
        &self.jobs_url
    }

    /// Submits a job on behalf of the holder of `access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Timeout`] when the backend does not answer in
    /// time and [`TransferError::Upstream`] for transport failures and
    /// non-2xx responses (with the raw body preserved).
    #[tracing::instrument(skip(self, transfer, access_token), fields(url = %self.jobs_url, files = transfer.files.len()))]
    pub async fn submit(
        &self,
        transfer: &Transfer,
        access_token: &str,
    ) -> Result<SubmittedJob, TransferError> {
        let url = self.jobs_url.as_str();
        let mut request = self
            .client
            .post(self.jobs_url.clone())
            .header(ACCEPT, "application/json")
            .json(transfer);
        if !access_token.trim().is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", access_token.trim()));
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match race(self.timeout, exchange).await {
            StageOutcome::Completed(reply) => reply,
            StageOutcome::TimedOut(elapsed) => {
                warn!(elapsed_ms = elapsed.as_millis(), "Job submission timed out");
                return Err(TransferError::Timeout {
                    url: url.to_string(),
                    elapsed,
                });
            }
            StageOutcome::Failed(error) if error.is_timeout() => {
                return Err(TransferError::Timeout {
                    url: url.to_string(),
                    elapsed: self.timeout,
                });
            }
            StageOutcome::Failed(error) => {
                warn!(error = %error, "Transfer backend unreachable");
                return Err(TransferError::Upstream {
                    url: url.to_string(),
                    status: None,
                    reason: format!("cannot reach transfer backend: {error}"),
                    body: None,
                });
            }
        };

        if !status.is_success() {
            warn!(status = status.as_u16(), "Transfer backend rejected job");
            return Err(TransferError::Upstream {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: "transfer backend rejected the job".to_string(),
                body: Some(body),
            });
        }

        debug!(status = status.as_u16(), "Transfer backend accepted job");
        let job: SubmittedJob =
            serde_json::from_str(&body).map_err(|error| TransferError::Upstream {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("unexpected submission response: {error}"),
                body: Some(body.clone()),
            })?;

        info!(job_id = %job.job_id, "Transfer job submitted");
        Ok(job)
    }
}

impl std::fmt::Debug for FileTransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransferClient")
            .field("jobs_url", &self.jobs_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn jobs_endpoint(base_url: &Url) -> Option<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("jobs").ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_endpoint_appends_to_base_path() {
        let base = Url::parse("https://fts3.example.org:8446").unwrap();
        assert_eq!(
            jobs_endpoint(&base).unwrap().as_str(),
            "https://fts3.example.org:8446/jobs"
        );

        let base = Url::parse("https://transfer.example.org/api").unwrap();
        assert_eq!(
            jobs_endpoint(&base).unwrap().as_str(),
            "https://transfer.example.org/api/jobs"
        );
    }

    #[test]
    fn test_with_client_exposes_jobs_url() {
        let base = Url::parse("https://fts3.example.org/").unwrap();
        let client =
            FileTransferClient::with_client(Client::new(), &base, Duration::from_secs(1)).unwrap();
        assert_eq!(client.jobs_url().as_str(), "https://fts3.example.org/jobs");
        assert!(format!("{client:?}").contains("fts3.example.org"));
    }
}
