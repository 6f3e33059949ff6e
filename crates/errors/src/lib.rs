#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the lobup upload pipeline
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone so they can travel through events.

use std::borrow::Cow;

use thiserror::Error;

pub mod blob;
pub mod config;
pub mod network;
pub mod package;
pub mod processing;
pub mod registry;

// Re-export all error types at the root
pub use blob::BlobError;
pub use config::ConfigError;
pub use network::{NetworkError, Retryability};
pub use package::PackageError;
pub use processing::ProcessingError;
pub use registry::RegistryError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline stage failed; `stage` names the step that was running.
    #[error("{stage} failed: {source}")]
    Pipeline {
        stage: String,
        #[source]
        source: Box<Error>,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        #[cfg_attr(feature = "serde", serde(with = "io_kind_as_str"))]
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Attach the name of the pipeline stage that produced this error.
    ///
    /// Errors that already carry a stage, and cancellation, are returned untouched.
    #[must_use]
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        match self {
            Self::Pipeline { .. } | Self::Cancelled => self,
            other => Self::Pipeline {
                stage: stage.into(),
                source: Box::new(other),
            },
        }
    }

    /// The stage name recorded by [`Error::in_stage`], if any
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Pipeline { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Strip any stage wrapper and return the underlying error
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Self::Pipeline { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for lobup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Network(err) => err.user_message(),
            Error::Package(err) => err.user_message(),
            Error::Registry(err) => err.user_message(),
            Error::Blob(err) => err.user_message(),
            Error::Processing(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Pipeline { stage, source } => {
                Cow::Owned(format!("{stage}: {}", source.user_message()))
            }
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Network(err) => err.user_hint(),
            Error::Package(err) => err.user_hint(),
            Error::Registry(err) => err.user_hint(),
            Error::Blob(err) => err.user_hint(),
            Error::Processing(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Pipeline { source, .. } => source.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_retryable(),
            Error::Registry(err) => err.is_retryable(),
            Error::Blob(err) => err.is_retryable(),
            Error::Processing(err) => err.is_retryable(),
            Error::Pipeline { source, .. } => source.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Network(err) => err.user_code(),
            Error::Package(err) => err.user_code(),
            Error::Registry(err) => err.user_code(),
            Error::Blob(err) => err.user_code(),
            Error::Processing(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Pipeline { source, .. } => source.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Cancelled => Some("error.cancelled"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}

#[cfg(feature = "serde")]
mod io_kind_as_str {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(kind: &std::io::ErrorKind, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&format!("{kind:?}"))
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<std::io::ErrorKind, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // Best effort mapping; default to Other
        Ok(match s.as_str() {
            "NotFound" => std::io::ErrorKind::NotFound,
            "PermissionDenied" => std::io::ErrorKind::PermissionDenied,
            "ConnectionRefused" => std::io::ErrorKind::ConnectionRefused,
            "ConnectionReset" => std::io::ErrorKind::ConnectionReset,
            "AlreadyExists" => std::io::ErrorKind::AlreadyExists,
            "InvalidInput" => std::io::ErrorKind::InvalidInput,
            "InvalidData" => std::io::ErrorKind::InvalidData,
            "TimedOut" => std::io::ErrorKind::TimedOut,
            "UnexpectedEof" => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::Other,
        })
    }
}
