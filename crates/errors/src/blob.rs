//! Object storage (block blob) error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BlobError {
    #[error("chunk {chunk_index} failed after {attempts} attempt(s){}: {message}", status_suffix(*.status))]
    ChunkUploadFailed {
        chunk_index: usize,
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    #[error("block list commit failed after {attempts} attempt(s){}: {message}", status_suffix(*.status))]
    BlockCommitFailed {
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    #[error("storage URI renewal failed: {message}")]
    RenewalFailed { message: String },

    #[error("invalid storage URI: {message}")]
    InvalidSasUri { message: String },
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl UserFacingError for BlobError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ChunkUploadFailed { .. } | Self::BlockCommitFailed { .. } => Some(
                "The upload must restart from the first chunk; the remote application may need manual cleanup.",
            ),
            Self::RenewalFailed { .. } => {
                Some("Set `upload.renewal_failure = \"continue\"` to keep uploading with the previous URI.")
            }
            Self::InvalidSasUri { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidSasUri { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ChunkUploadFailed { .. } => "storage.chunk_upload_failed",
            Self::BlockCommitFailed { .. } => "storage.block_commit_failed",
            Self::RenewalFailed { .. } => "storage.renewal_failed",
            Self::InvalidSasUri { .. } => "storage.invalid_sas_uri",
        };
        Some(code)
    }
}
