//! Server-side processing (upload state polling) error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ProcessingError {
    /// The server reported `{stage}Failed`.
    #[error("{stage} failed on the server (state `{state}`)")]
    StageFailed { stage: String, state: String },

    /// The server reported `{stage}TimedOut`.
    #[error("{stage} timed out on the server (state `{state}`)")]
    StageTimedOut { stage: String, state: String },

    /// The attempt ceiling was reached while the last state was unrecognized.
    #[error("{stage} stuck in unrecognized state `{last_state}` after {attempts} polls")]
    UnknownState {
        stage: String,
        last_state: String,
        attempts: u32,
    },

    /// The attempt ceiling was reached while the stage was still pending.
    #[error("{stage} still pending after {attempts} polls; the remote application may already exist")]
    WaitExceeded { stage: String, attempts: u32 },

    /// The server answered in a way that contradicts the protocol.
    #[error("protocol invariant violated during {stage}: {message}")]
    InvariantViolation { stage: String, message: String },
}

impl UserFacingError for ProcessingError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::WaitExceeded { .. } | Self::UnknownState { .. } | Self::StageTimedOut { .. } => {
                Some("Inspect the application in the management portal; it may already exist in an uncommitted state.")
            }
            Self::InvariantViolation { .. } => Some("The service is misbehaving; retry later."),
            Self::StageFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::WaitExceeded { .. } | Self::StageTimedOut { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::StageFailed { .. } => "processing.stage_failed",
            Self::StageTimedOut { .. } => "processing.stage_timed_out",
            Self::UnknownState { .. } => "processing.unknown_state",
            Self::WaitExceeded { .. } => "processing.wait_exceeded",
            Self::InvariantViolation { .. } => "processing.invariant_violation",
        };
        Some(code)
    }
}
