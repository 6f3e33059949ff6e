#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for lobup
//!
//! This crate handles the two remote surfaces of an upload: the
//! device-management registry (JSON over HTTPS, bearer-authenticated) and
//! block-blob storage (pre-signed SAS URIs). Both are exposed through traits
//! so the pipeline can run against scripted fakes in tests.

mod blob;
mod client;
mod registry;
mod retry;

pub use blob::{block_list_xml, encode_block_id, BlobApi, BlobClient};
pub use client::{NetClient, NetConfig};
pub use registry::{AccessToken, FileEntryStatus, RegistryApi, RegistryClient};
pub use retry::RetryPolicy;

use lobup_errors::{Error, Retryability};

/// Classify any error for retry purposes
///
/// Network and registry failures carry their own classification; everything
/// else is treated as permanent.
#[must_use]
pub fn retryability(error: &Error) -> Retryability {
    match error.root() {
        Error::Network(e) => e.retryability(),
        Error::Registry(e) => e.retryability(),
        _ => Retryability::Abort,
    }
}

/// HTTP status carried by an error, if any
#[must_use]
pub fn error_status(error: &Error) -> Option<u16> {
    match error.root() {
        Error::Network(e) => e.status(),
        Error::Registry(lobup_errors::RegistryError::RequestFailed { status, .. }) => Some(*status),
        _ => None,
    }
}
