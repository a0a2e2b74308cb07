//! DOI Transfer Core Library
//!
//! This library resolves a dataset DOI into the files it references and
//! stages those files as a job on a file-transfer backend.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`resolver`] - Redirect lookup, provider selection and record fetch
//! - [`storage`] - Canonical description of a dataset's files
//! - [`transfer`] - Transfer job model, projection and backend submission
//! - [`pipeline`] - The end-to-end staging chain
//! - [`config`] - TOML configuration
//! - [`error`] - Machine-readable error kinds and reports

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bounded;
pub mod config;
pub mod error;
pub mod http_client;
pub mod pipeline;
pub mod resolver;
pub mod storage;
pub mod transfer;
mod user_agent;

// Re-export commonly used types
pub use bounded::{StageOutcome, race};
pub use config::{ConfigError, ProviderConfig, ProviderKind, StagingConfig};
pub use error::{ErrorKind, ErrorReport, PipelineError};
pub use pipeline::{ResolvedDataset, StagedJob, StagingPipeline};
pub use resolver::{
    DoiResolutionRequest, Provider, ProviderMatch, ProviderRegistry, ResolveError,
};
pub use storage::{StorageContent, StorageElement, normalize};
pub use transfer::{
    Destination, DestinationSpec, FileTransferClient, ProjectedTransfer, SubmittedJob, Transfer,
    TransferError, TransferParameters, TransferPayload,
};
