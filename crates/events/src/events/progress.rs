use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coarse percentage checkpoints for a long-running operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    Started {
        id: String,
        operation: String,
    },

    /// Progress moved to `percent` (0-100) while in `phase`
    Updated {
        id: String,
        percent: u8,
        phase: String,
    },

    Completed {
        id: String,
        duration: Duration,
    },

    Failed {
        id: String,
        failure: super::FailureContext,
        percent: u8,
    },
}

impl ProgressEvent {
    pub fn started(id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Started {
            id: id.into(),
            operation: operation.into(),
        }
    }

    pub fn updated(id: impl Into<String>, percent: u8, phase: impl Into<String>) -> Self {
        Self::Updated {
            id: id.into(),
            percent: percent.min(100),
            phase: phase.into(),
        }
    }

    pub fn completed(id: impl Into<String>, duration: Duration) -> Self {
        Self::Completed {
            id: id.into(),
            duration,
        }
    }
}
