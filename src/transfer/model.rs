//! Transfer job model handed to the transfer backend.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// The supported destination storage systems.
///
/// The identifier doubles as the URL scheme used for destinations of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// dCache disk storage.
    Dcache,
    /// S3-compatible object storage.
    S3,
    /// FTP servers.
    Ftp,
}

impl Destination {
    /// Every supported destination.
    pub const ALL: [Self; 3] = [Self::Dcache, Self::S3, Self::Ftp];

    /// Returns the destination identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dcache => "dcache",
            Self::S3 => "s3",
            Self::Ftp => "ftp",
        }
    }

    /// Returns true if `scheme` names this destination, ignoring case.
    #[must_use]
    pub fn matches_scheme(self, scheme: &str) -> bool {
        scheme.eq_ignore_ascii_case(self.as_str())
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.matches_scheme(value.trim()))
            .ok_or_else(|| format!("unknown destination storage '{value}'"))
    }
}

/// One file to copy and where to copy it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferPayload {
    /// Where the file is read from.
    pub source_url: Url,
    /// One destination URL per requested destination storage.
    pub destinations: Vec<String>,
    /// Expected checksum, forwarded for verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Expected size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

/// Job-wide transfer options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferParameters {
    /// Ask the backend to verify checksums after copying.
    pub verify_checksum: bool,
    /// Overwrite files that already exist at the destination.
    pub overwrite: bool,
    /// Backend retry count per file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    /// Backend job priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    s3_destinations: bool,
}

impl TransferParameters {
    /// Creates parameters with the caller's options; the S3 flag starts unset.
    pub(crate) fn with_options(
        verify_checksum: bool,
        overwrite: bool,
        retry: Option<u32>,
        priority: Option<u8>,
    ) -> Self {
        Self {
            verify_checksum,
            overwrite,
            retry,
            priority,
            s3_destinations: false,
        }
    }

    /// Returns true once any destination targets object storage.
    #[must_use]
    pub fn s3_destinations(&self) -> bool {
        self.s3_destinations
    }

    /// Marks the job as targeting object storage. Never reset.
    pub(crate) fn mark_s3_destinations(&mut self) {
        self.s3_destinations = true;
    }
}

/// A transfer job: files to copy plus job-wide parameters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transfer {
    /// Files in source order.
    pub files: Vec<TransferPayload>,
    /// Job-wide parameters.
    pub params: TransferParameters,
    #[serde(skip)]
    invalid_url: Option<String>,
}

impl Transfer {
    /// Creates an empty job with the given parameters.
    #[must_use]
    pub fn new(params: TransferParameters) -> Self {
        Self {
            files: Vec::new(),
            params,
            invalid_url: None,
        }
    }

    /// The destination URL that failed to parse, if any.
    #[must_use]
    pub fn invalid_url(&self) -> Option<&str> {
        self.invalid_url.as_deref()
    }

    /// Replaces the recorded invalid URL with the string the caller supplied.
    pub(crate) fn record_invalid_url(&mut self, raw: impl Into<String>) {
        self.invalid_url = Some(raw.into());
    }

    /// Total number of destination URLs across all payloads.
    #[must_use]
    pub fn destination_count(&self) -> usize {
        self.files.iter().map(|p| p.destinations.len()).sum()
    }

    /// Collects the distinct destination hostnames across all payloads.
    ///
    /// Hosts are lower-cased and returned in first-seen order. When
    /// `protocol` is given (non-blank), destinations with another scheme are
    /// left out of the result but are still parsed, so they can still flag
    /// object storage and still abort on a malformed URL.
    ///
    /// Returns `None` on the first URL that does not parse; the raw string is
    /// then available from [`Transfer::invalid_url`]. No partial host list is
    /// ever returned.
    pub fn all_destination_storages(&mut self, protocol: Option<&str>) -> Option<Vec<String>> {
        let protocol = protocol.map(str::trim).filter(|p| !p.is_empty());
        self.invalid_url = None;
        let mut seen = HashSet::new();
        let mut hosts = Vec::new();

        for payload in &self.files {
            for destination in &payload.destinations {
                let Ok(parsed) = Url::parse(destination) else {
                    warn!(url = %destination, "Invalid destination URL");
                    self.invalid_url = Some(destination.clone());
                    return None;
                };

                let scheme = parsed.scheme().to_ascii_lowercase();
                if Destination::S3.matches_scheme(&scheme) {
                    self.params.mark_s3_destinations();
                }

                if let Some(protocol) = protocol
                    && !scheme.eq_ignore_ascii_case(protocol)
                {
                    continue;
                }

                let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) else {
                    warn!(url = %destination, "Destination URL has no host");
                    self.invalid_url = Some(destination.clone());
                    return None;
                };

                let host = host.to_ascii_lowercase();
                if seen.insert(host.clone()) {
                    debug!(host = %host, "New destination host");
                    hosts.push(host);
                }
            }
        }

        Some(hosts)
    }
}
