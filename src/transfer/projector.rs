//! Expands resolved storage content into a transfer job.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::storage::StorageContent;

use super::model::{Transfer, TransferParameters, TransferPayload};

/// Requested destinations and options for a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSpec {
    /// One base URL per destination storage; each file is placed under every base.
    pub destinations: Vec<String>,
    /// Only report hosts of destinations using this scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Ask the backend to verify checksums.
    #[serde(default)]
    pub verify_checksum: bool,
    /// Overwrite existing destination files.
    #[serde(default)]
    pub overwrite: bool,
    /// Backend retry count per file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    /// Backend job priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

impl DestinationSpec {
    /// Creates a spec with the given destination bases and default options.
    #[must_use]
    pub fn new<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            destinations: destinations.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn parameters(&self) -> TransferParameters {
        TransferParameters::with_options(
            self.verify_checksum,
            self.overwrite,
            self.retry,
            self.priority,
        )
    }
}

/// A projected job together with its derived destination hosts.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedTransfer {
    /// The job.
    pub transfer: Transfer,
    /// Distinct destination hosts, absent when a destination URL was malformed.
    pub destination_hosts: Option<Vec<String>>,
}

/// Builds one payload per storage element, with one destination per requested
/// base, then derives the distinct destination hosts.
///
/// Destination URLs are built textually and only parsed during host
/// derivation, so a malformed base surfaces through
/// [`Transfer::invalid_url`] rather than being silently dropped. The
/// reported string is the base exactly as requested, not the per-file URL.
#[must_use]
#[tracing::instrument(skip_all, fields(files = content.count(), destinations = spec.destinations.len()))]
pub fn project(content: &StorageContent, spec: &DestinationSpec) -> ProjectedTransfer {
    let mut transfer = Transfer::new(spec.parameters());

    for element in content {
        let destinations = spec
            .destinations
            .iter()
            .map(|base| destination_for(base, &element.name))
            .collect();
        transfer.files.push(TransferPayload {
            source_url: element.source_url.clone(),
            destinations,
            checksum: element.checksum.clone(),
            filesize: Some(element.size_bytes),
        });
    }

    let destination_hosts = transfer.all_destination_storages(spec.protocol.as_deref());
    if destination_hosts.is_none()
        && let Some(base) = requested_base(&transfer, spec)
    {
        transfer.record_invalid_url(base);
    }
    match &destination_hosts {
        Some(hosts) => info!(
            payloads = transfer.files.len(),
            hosts = hosts.len(),
            s3 = transfer.params.s3_destinations(),
            "Projected transfer job"
        ),
        None => debug!(
            invalid_url = transfer.invalid_url().unwrap_or_default(),
            "Projection aborted on invalid destination"
        ),
    }

    ProjectedTransfer {
        transfer,
        destination_hosts,
    }
}

/// Finds the requested base whose per-file URL failed to parse.
///
/// Payload destinations are built in the same order as `spec.destinations`,
/// so the position inside a payload identifies the base.
fn requested_base<'s>(transfer: &Transfer, spec: &'s DestinationSpec) -> Option<&'s str> {
    let invalid = transfer.invalid_url()?;
    transfer
        .files
        .iter()
        .find_map(|payload| payload.destinations.iter().position(|d| d == invalid))
        .and_then(|index| spec.destinations.get(index))
        .map(String::as_str)
}

/// Appends a file name to a destination base, percent-encoding each path segment.
#[must_use]
pub fn destination_for(base: &str, file_name: &str) -> String {
    let encoded = file_name
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    if base.ends_with('/') {
        format!("{base}{encoded}")
    } else {
        format!("{base}/{encoded}")
    }
}
