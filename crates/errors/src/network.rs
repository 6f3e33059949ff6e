//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Whether a failed request may be attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// Transient failure; a fresh attempt may succeed.
    Retry,
    /// Permanent failure; surface immediately.
    Abort,
}

impl Retryability {
    /// Classify an HTTP status code.
    ///
    /// 5xx, 408 and 429 are transient. Every other 4xx is permanent.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            408 | 429 => Self::Retry,
            400..=499 => Self::Abort,
            _ => Self::Retry,
        }
    }

    #[must_use]
    pub fn should_retry(self) -> bool {
        matches!(self, Self::Retry)
    }
}

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("client initialization failed: {0}")]
    ClientInit(String),

    #[error("unexpected response body: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    /// Retry classification for this failure
    #[must_use]
    pub fn retryability(&self) -> Retryability {
        match self {
            Self::Timeout { .. } | Self::RequestFailed(_) | Self::ConnectionRefused(_) => {
                Retryability::Retry
            }
            Self::HttpError { status, .. } => Retryability::from_status(*status),
            Self::InvalidUrl(_) | Self::ClientInit(_) | Self::InvalidResponse(_) => {
                Retryability::Abort
            }
        }
    }

    /// HTTP status carried by this error, if the server answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) | Self::RequestFailed(_) => {
                Some("Check your network connection and retry.")
            }
            Self::InvalidUrl(_) => Some("Check the registry base URL in the configuration."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        self.retryability().should_retry()
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::RequestFailed(_) => "network.request_failed",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::HttpError { .. } => "network.http_error",
            Self::ClientInit(_) => "network.client_init",
            Self::InvalidResponse(_) => "network.invalid_response",
        };
        Some(code)
    }
}
