use lobup_types::{PipelineStage, UploadStage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Events emitted while a package moves through the upload pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UploadEvent {
    /// A pipeline run began for `archive`
    RunStarted { run_id: String, archive: PathBuf },

    StageStarted { stage: PipelineStage },

    StageCompleted {
        stage: PipelineStage,
        duration: Duration,
    },

    /// Payload located and measured; upload is about to be planned
    PayloadPrepared {
        file_name: String,
        unencrypted_size: u64,
        encrypted_size: u64,
    },

    /// Registry created an object
    RemoteObjectCreated { kind: String, id: String },

    /// One `uploadState` observation from a polling loop
    PollObserved {
        stage: UploadStage,
        attempt: u32,
        state: Option<String>,
    },

    ChunkUploaded {
        index: usize,
        total: usize,
        bytes: u64,
        attempts: u32,
    },

    ChunkRetrying {
        index: usize,
        attempt: u32,
        max_attempts: u32,
        reason: String,
        backoff: Duration,
    },

    BlockListCommitted { blocks: usize },

    RenewalStarted { elapsed: Duration },

    RenewalSucceeded,

    /// Renewal failed; `continuing` is true when the stale URI stays in use
    RenewalFailed { error: String, continuing: bool },

    /// Best-effort removal of the scratch directory failed
    ScratchCleanupFailed { path: PathBuf, error: String },

    RunCompleted { app_id: String, duration: Duration },

    RunFailed {
        stage: Option<String>,
        failure: super::FailureContext,
    },
}
