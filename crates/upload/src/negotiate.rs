//! Storage URI negotiation

use crate::poll::PollPolicy;
use crate::waiter::poll_stage;
use lobup_errors::{Error, ProcessingError};
use lobup_events::EventEmitter;
use lobup_net::{FileEntryStatus, RegistryApi};
use lobup_types::{StorageSession, UploadStage, UploadTarget};
use tokio_util::sync::CancellationToken;

/// Poll the file entry until the service hands out a writable storage URI
///
/// # Errors
///
/// Returns `StageFailed`, `StageTimedOut`, `UnknownState` or `WaitExceeded`
/// for the `AzureStorageUriRequest` stage, and `InvariantViolation` when a
/// success state arrives without a URI.
pub async fn await_storage_uri<R, E>(
    registry: &R,
    target: &UploadTarget,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    emitter: &E,
) -> Result<StorageSession, Error>
where
    R: RegistryApi + ?Sized,
    E: EventEmitter,
{
    let stage = UploadStage::AzureStorageUriRequest;
    let status = poll_stage(registry, target, stage, policy, cancel, emitter).await?;
    session_from(stage, &status)
}

/// Build a session from a file entry that reported success
pub(crate) fn session_from(
    stage: UploadStage,
    status: &FileEntryStatus,
) -> Result<StorageSession, Error> {
    let uri = status.storage_uri().ok_or_else(|| ProcessingError::InvariantViolation {
        stage: stage.as_str().to_string(),
        message: format!(
            "state `{}` carries no azureStorageUri",
            status.upload_state.as_deref().unwrap_or_default()
        ),
    })?;
    tracing::info!(%stage, "storage URI issued");
    Ok(StorageSession::new(uri))
}
