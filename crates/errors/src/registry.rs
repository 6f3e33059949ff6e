//! Application registry API error types

use std::borrow::Cow;

use crate::network::Retryability;
use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum RegistryError {
    #[error("{operation} returned HTTP {status}: {body}")]
    RequestFailed {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} response is missing `{field}`")]
    MissingField { operation: String, field: String },

    #[error("{operation} response could not be decoded: {message}")]
    InvalidResponse { operation: String, message: String },
}

impl RegistryError {
    #[must_use]
    pub fn retryability(&self) -> Retryability {
        match self {
            Self::RequestFailed { status, .. } => Retryability::from_status(*status),
            Self::MissingField { .. } | Self::InvalidResponse { .. } => Retryability::Abort,
        }
    }
}

impl UserFacingError for RegistryError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::RequestFailed { status: 401 | 403, .. } => {
                Some("The access token was rejected; acquire a new token and retry.")
            }
            Self::RequestFailed { .. } => None,
            Self::MissingField { .. } | Self::InvalidResponse { .. } => {
                Some("The registry returned an unexpected payload; check the API version.")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        self.retryability().should_retry()
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::RequestFailed { .. } => "registry.request_failed",
            Self::MissingField { .. } => "registry.missing_field",
            Self::InvalidResponse { .. } => "registry.invalid_response",
        };
        Some(code)
    }
}
