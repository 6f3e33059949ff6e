//! Upload state polling as an explicit state machine
//!
//! [`PollPolicy::transition`] is pure: given what the server reported on a
//! poll and how many polls have been made, it decides whether to stop or how
//! long to wait before the next poll. The async loop in `waiter` only
//! performs I/O and sleeps.

use lobup_config::PollingConfig;
use lobup_errors::{Error, ProcessingError};
use lobup_types::{StageOutcome, UploadStage};
use std::time::Duration;

/// Interval and attempt budget for one kind of wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after a recognized pending state or a transient transport error
    pub interval: Duration,
    /// Delay after an unrecognized state string
    pub unknown_interval: Duration,
    /// Hard ceiling on the number of polls
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Policy for storage URI negotiation and renewal
    #[must_use]
    pub fn negotiation(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.negotiation_interval_secs),
            unknown_interval: Duration::from_secs(config.negotiation_unknown_interval_secs),
            max_attempts: config.max_attempts,
        }
    }

    /// Policy for server-side processing after commit
    #[must_use]
    pub fn processing(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.processing_interval_secs),
            unknown_interval: Duration::from_secs(config.processing_unknown_interval_secs),
            max_attempts: config.max_attempts,
        }
    }

    /// Decide what follows poll number `attempt` (1-based)
    #[must_use]
    pub fn transition(&self, stage: UploadStage, observation: &Observation, attempt: u32) -> PollState {
        let exhausted = attempt >= self.max_attempts;
        match observation {
            Observation::State(raw) => match stage.classify(raw) {
                Some(StageOutcome::Success) => PollState::Succeeded,
                Some(StageOutcome::Failed) => PollState::Failed { state: raw.clone() },
                Some(StageOutcome::TimedOut) => PollState::TimedOut { state: raw.clone() },
                Some(StageOutcome::Pending) if exhausted => PollState::Exhausted,
                Some(StageOutcome::Pending) => PollState::Polling {
                    delay: self.interval,
                },
                None if exhausted => PollState::Unknown {
                    last_state: raw.clone(),
                },
                None => PollState::Polling {
                    delay: self.unknown_interval,
                },
            },
            Observation::Unavailable(_) if exhausted => PollState::Exhausted,
            Observation::Unavailable(_) => PollState::Polling {
                delay: self.interval,
            },
        }
    }
}

/// What one poll of the file entry produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The server answered with this `uploadState` (empty if absent)
    State(String),
    /// The poll failed with a transient error
    Unavailable(String),
}

/// Outcome of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Not finished; poll again after `delay`
    Polling { delay: Duration },
    Succeeded,
    /// The server reported `{stage}Failed`
    Failed { state: String },
    /// The server reported `{stage}TimedOut`
    TimedOut { state: String },
    /// Budget exhausted while the last state was unrecognized
    Unknown { last_state: String },
    /// Budget exhausted while the stage was still pending
    Exhausted,
}

impl PollState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling { .. })
    }

    /// Convert a terminal failure into its error; `None` for `Polling` and `Succeeded`
    #[must_use]
    pub fn into_error(self, stage: UploadStage, attempts: u32) -> Option<Error> {
        let stage = stage.as_str().to_string();
        let err = match self {
            Self::Polling { .. } | Self::Succeeded => return None,
            Self::Failed { state } => ProcessingError::StageFailed { stage, state },
            Self::TimedOut { state } => ProcessingError::StageTimedOut { stage, state },
            Self::Unknown { last_state } => ProcessingError::UnknownState {
                stage,
                last_state,
                attempts,
            },
            Self::Exhausted => ProcessingError::WaitExceeded { stage, attempts },
        };
        Some(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(10),
            unknown_interval: Duration::from_secs(15),
            max_attempts: 120,
        }
    }

    fn state(s: &str) -> Observation {
        Observation::State(s.to_string())
    }

    const STAGE: UploadStage = UploadStage::AzureStorageUriRequest;

    #[test]
    fn test_recognized_states() {
        let p = policy();
        assert_eq!(p.transition(STAGE, &state("azureStorageUriRequestSuccess"), 1), PollState::Succeeded);
        assert_eq!(
            p.transition(STAGE, &state("azureStorageUriRequestPending"), 1),
            PollState::Polling { delay: Duration::from_secs(10) }
        );
        assert!(matches!(
            p.transition(STAGE, &state("AZURESTORAGEURIREQUESTFAILED"), 1),
            PollState::Failed { .. }
        ));
        assert!(matches!(
            p.transition(STAGE, &state("azureStorageUriRequestTimedOut"), 3),
            PollState::TimedOut { .. }
        ));
    }

    #[test]
    fn test_unrecognized_uses_longer_interval() {
        assert_eq!(
            policy().transition(STAGE, &state("commitFileSuccess"), 5),
            PollState::Polling { delay: Duration::from_secs(15) }
        );
        assert_eq!(
            policy().transition(STAGE, &state(""), 5),
            PollState::Polling { delay: Duration::from_secs(15) }
        );
    }

    #[test]
    fn test_transport_errors_retry_at_normal_interval() {
        let obs = Observation::Unavailable("connection reset".into());
        assert_eq!(
            policy().transition(STAGE, &obs, 1),
            PollState::Polling { delay: Duration::from_secs(10) }
        );
        assert_eq!(policy().transition(STAGE, &obs, 120), PollState::Exhausted);
    }

    #[test]
    fn test_ceiling_terminates() {
        let p = policy();
        assert_eq!(
            p.transition(STAGE, &state("somethingNew"), 120),
            PollState::Unknown { last_state: "somethingNew".into() }
        );
        assert_eq!(
            p.transition(STAGE, &state("azureStorageUriRequestPending"), 120),
            PollState::Exhausted
        );
        // Terminal server states win even on the last attempt
        assert_eq!(
            p.transition(STAGE, &state("azureStorageUriRequestSuccess"), 120),
            PollState::Succeeded
        );
    }

    #[test]
    fn test_always_unknown_stops_at_exact_ceiling() {
        let p = PollPolicy { max_attempts: 7, ..policy() };
        let obs = state("mystery");
        let stopped_at = (1..=100)
            .find(|&attempt| p.transition(STAGE, &obs, attempt).is_terminal())
            .unwrap();
        assert_eq!(stopped_at, 7);
    }

    #[test]
    fn test_into_error() {
        let err = PollState::Unknown { last_state: "x".into() }
            .into_error(UploadStage::CommitFile, 120)
            .unwrap();
        assert!(matches!(
            err,
            Error::Processing(ProcessingError::UnknownState { attempts: 120, .. })
        ));
        assert!(PollState::Succeeded.into_error(UploadStage::CommitFile, 1).is_none());
    }
}
