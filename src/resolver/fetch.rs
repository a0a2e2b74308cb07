//! Timeout-bounded JSON fetches against provider APIs.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::bounded::{StageOutcome, race};

use super::ResolveError;

/// Fetches `url` and decodes the JSON body, bounded by `timeout`.
///
/// The whole exchange (request, status, body) is raced against the timer.
/// Unknown JSON fields are ignored by the target types.
///
/// # Errors
///
/// - [`ResolveError::FetchTimeout`] when the timer fires first
/// - [`ResolveError::Upstream`] for transport failures, non-2xx responses
///   (raw body attached) and bodies that do not match `T`
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    stage: &'static str,
    timeout: Duration,
) -> Result<T, ResolveError> {
    let url_str = url.to_string();
    debug!(url = %url_str, stage, "Fetching provider resource");

    let exchange = async {
        let response = client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    };

    let (status, body) = match race(timeout, exchange).await {
        StageOutcome::Completed(reply) => reply,
        StageOutcome::TimedOut(elapsed) => {
            warn!(url = %url_str, stage, elapsed_ms = elapsed.as_millis(), "Provider fetch timed out");
            return Err(ResolveError::timeout(stage, &url_str, elapsed));
        }
        StageOutcome::Failed(error) if error.is_timeout() => {
            warn!(url = %url_str, stage, "Provider client timed out");
            return Err(ResolveError::timeout(stage, &url_str, timeout));
        }
        StageOutcome::Failed(error) => {
            warn!(url = %url_str, stage, error = %error, "Provider unreachable");
            return Err(ResolveError::upstream(
                &url_str,
                format!("cannot reach provider during {stage}: {error}"),
            ));
        }
    };

    if !status.is_success() {
        debug!(url = %url_str, status = status.as_u16(), "Provider returned error status");
        return Err(ResolveError::upstream_status(
            &url_str,
            status.as_u16(),
            Some(body),
        ));
    }

    serde_json::from_str(&body).map_err(|error| ResolveError::Upstream {
        url: url_str,
        status: Some(status.as_u16()),
        reason: format!("unexpected {stage} response: {error}"),
        body: Some(body),
    })
}
