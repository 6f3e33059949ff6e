#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Upload pipeline for lobup
//!
//! Turns a prepared package archive into a committed application in the
//! device-management registry:
//!
//! 1. extract the manifest and encrypted payload ([`lobup_package`])
//! 2. create the application, content version and file entry
//! 3. wait for a storage URI ([`negotiate`])
//! 4. upload the payload as ordered blocks and commit them ([`uploader`])
//! 5. commit the file, wait for processing ([`waiter`]), commit the app
//!
//! The pipeline is generic over [`lobup_net::RegistryApi`] and
//! [`lobup_net::BlobApi`] and reports through [`lobup_events`].

pub mod chunk;
pub mod negotiate;
pub mod pipeline;
pub mod poll;
pub mod uploader;
pub mod waiter;

pub use chunk::{Chunk, ChunkPlan};
pub use negotiate::await_storage_uri;
pub use pipeline::{PipelineSettings, UploadOutcome, UploadPipeline, UploadRequest};
pub use poll::{Observation, PollPolicy, PollState};
pub use uploader::{ChunkPolicy, ChunkedUploader, ProgressBand, RenewalPolicy, UploadPolicy, UploadReport};
pub use waiter::{await_stage, poll_stage};

pub use tokio_util::sync::CancellationToken;

use lobup_errors::Error;
use std::time::Duration;

/// Sleep for `delay` unless cancelled first
pub(crate) async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), Error> {
    tokio::select! {
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
