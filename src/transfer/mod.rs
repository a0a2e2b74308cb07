//! Transfer jobs: projection of resolved files onto destination storages and
//! submission to the transfer backend.
//!
//! - [`project`] - builds a [`Transfer`] from [`crate::storage::StorageContent`]
//! - [`Transfer::all_destination_storages`] - distinct destination hosts, fail-fast on bad URLs
//! - [`FileTransferClient`] - posts jobs to the backend

mod client;
mod error;
mod model;
mod projector;

pub use client::{FileTransferClient, SubmittedJob};
pub use error::TransferError;
pub use model::{Destination, Transfer, TransferParameters, TransferPayload};
pub use projector::{DestinationSpec, ProjectedTransfer, destination_for, project};
