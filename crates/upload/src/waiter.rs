//! Polling the file entry until a processing stage settles

use crate::poll::{Observation, PollPolicy, PollState};
use crate::sleep_or_cancel;
use lobup_errors::Error;
use lobup_events::{EventEmitter, UploadEvent};
use lobup_net::{retryability, FileEntryStatus, RegistryApi};
use lobup_types::{UploadStage, UploadTarget};
use tokio_util::sync::CancellationToken;

/// Poll until `stage` reaches a terminal state
///
/// Returns the file entry as observed on the successful poll. The first poll
/// is issued immediately.
///
/// # Errors
///
/// Returns the terminal `ProcessingError` for failed, timed-out, unknown or
/// exhausted waits, a non-retryable registry error as-is, or
/// `Error::Cancelled`.
pub async fn poll_stage<R, E>(
    registry: &R,
    target: &UploadTarget,
    stage: UploadStage,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    emitter: &E,
) -> Result<FileEntryStatus, Error>
where
    R: RegistryApi + ?Sized,
    E: EventEmitter,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        attempt += 1;

        let (observation, status) = match registry.get_file_entry(target).await {
            Ok(status) => {
                let state = status.upload_state.clone().unwrap_or_default();
                (Observation::State(state), Some(status))
            }
            Err(e) if retryability(&e).should_retry() => {
                tracing::debug!(%stage, attempt, error = %e, "transient poll failure");
                (Observation::Unavailable(e.to_string()), None)
            }
            Err(e) => return Err(e),
        };

        emitter.emit_upload(UploadEvent::PollObserved {
            stage,
            attempt,
            state: status.as_ref().and_then(|s| s.upload_state.clone()),
        });

        match policy.transition(stage, &observation, attempt) {
            PollState::Polling { delay } => {
                tracing::trace!(%stage, attempt, ?observation, ?delay, "still waiting");
                sleep_or_cancel(delay, cancel).await?;
            }
            PollState::Succeeded => {
                tracing::debug!(%stage, attempt, "stage succeeded");
                // Succeeded is only produced from an Observation::State, which always has a status
                return status.ok_or_else(|| Error::internal("success without a file entry"));
            }
            terminal => {
                tracing::warn!(%stage, attempt, ?terminal, "stage did not succeed");
                return Err(terminal
                    .into_error(stage, attempt)
                    .unwrap_or_else(|| Error::internal("poll ended without a result")));
            }
        }
    }
}

/// Wait for a server-side processing stage to succeed
///
/// # Errors
///
/// See [`poll_stage`].
pub async fn await_stage<R, E>(
    registry: &R,
    target: &UploadTarget,
    stage: UploadStage,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    emitter: &E,
) -> Result<(), Error>
where
    R: RegistryApi + ?Sized,
    E: EventEmitter,
{
    poll_stage(registry, target, stage, policy, cancel, emitter)
        .await
        .map(|_| ())
}
