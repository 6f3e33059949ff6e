//! Pipeline orchestration
//!
//! Runs every stage in order, reports a percentage checkpoint at each stage
//! boundary, tags failures with the stage that produced them, and always
//! removes the local scratch directory. Remote objects created before a
//! failure are left in place.

use crate::negotiate::await_storage_uri;
use crate::poll::PollPolicy;
use crate::uploader::{ChunkedUploader, ProgressBand, UploadPolicy, UploadReport};
use crate::waiter::await_stage;
use lobup_config::Config;
use lobup_errors::Error;
use lobup_events::{EventEmitter, EventSender, FailureContext, RunEmitter, UploadEvent};
use lobup_net::{BlobApi, RegistryApi};
use lobup_package::{ExtractedPackage, ScratchDir};
use lobup_types::{
    AppAttributes, AppId, ContentVersionId, FileId, PackageManifest, PipelineStage, UploadStage,
    UploadTarget,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Runtime policies for one pipeline, derived from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub upload: UploadPolicy,
    pub negotiation: PollPolicy,
    pub processing: PollPolicy,
    pub scratch_root: PathBuf,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            upload: UploadPolicy::from(config),
            negotiation: PollPolicy::negotiation(&config.polling),
            processing: PollPolicy::processing(&config.polling),
            scratch_root: config.scratch_root(),
        }
    }
}

/// What to upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub archive: PathBuf,
    pub attributes: AppAttributes,
}

/// Identifiers and statistics of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub app_id: AppId,
    pub content_version_id: ContentVersionId,
    pub file_id: FileId,
    pub file_name: String,
    pub encrypted_size: u64,
    pub chunks: usize,
    pub renewals: u32,
    pub duration: Duration,
}

/// Sequences the upload stages against a registry and a blob store
pub struct UploadPipeline<R, B> {
    registry: R,
    blob: B,
    settings: PipelineSettings,
    events: Option<EventSender>,
}

impl<R, B> UploadPipeline<R, B>
where
    R: RegistryApi,
    B: BlobApi,
{
    pub fn new(registry: R, blob: B, settings: PipelineSettings) -> Self {
        Self {
            registry,
            blob,
            settings,
            events: None,
        }
    }

    /// Send progress and upload events to `tx`
    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the whole pipeline for one archive
    ///
    /// # Errors
    ///
    /// Any stage failure is returned wrapped in `Error::Pipeline` naming the
    /// stage. Cancellation is returned as `Error::Cancelled`.
    pub async fn run(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, Error> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let emitter = RunEmitter::new(self.events.clone(), run_id.clone());
        let started = Instant::now();

        tracing::info!(run_id = %run_id, archive = %request.archive.display(), "upload started");
        emitter.emit_upload(UploadEvent::RunStarted {
            run_id: run_id.clone(),
            archive: request.archive.clone(),
        });
        emitter.emit_progress_started(run_id.clone(), "upload");

        let mut percent = 0u8;
        let result = self
            .execute(request, cancel, &emitter, &mut percent)
            .await
            .map(|mut outcome| {
                outcome.duration = started.elapsed();
                outcome
            });

        match &result {
            Ok(outcome) => {
                tracing::info!(app_id = %outcome.app_id, duration = ?outcome.duration, "upload completed");
                emitter.emit_progress_completed(run_id, outcome.duration);
                emitter.emit_upload(UploadEvent::RunCompleted {
                    app_id: outcome.app_id.to_string(),
                    duration: outcome.duration,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, stage = e.stage().unwrap_or("-"), "upload failed");
                emitter.emit_progress_failed(run_id, FailureContext::from_error(e), percent);
                emitter.emit_upload(UploadEvent::RunFailed {
                    stage: e.stage().map(str::to_string),
                    failure: FailureContext::from_error(e),
                });
            }
        }
        result
    }

    async fn execute(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
        emitter: &RunEmitter,
        percent: &mut u8,
    ) -> Result<UploadOutcome, Error> {
        let scratch_root = self.settings.scratch_root.clone();
        let package = stage(
            PipelineStage::ExtractMetadata,
            cancel,
            emitter,
            percent,
            lobup_package::extract(&request.archive, &scratch_root),
        )
        .await?;

        let ExtractedPackage {
            manifest,
            content_path,
            encrypted_size,
            scratch,
            ..
        } = package;
        emitter.emit_upload(UploadEvent::PayloadPrepared {
            file_name: manifest.file_name.clone(),
            unencrypted_size: manifest.unencrypted_size,
            encrypted_size,
        });

        let result = self
            .remote(request, &manifest, &content_path, encrypted_size, cancel, emitter, percent)
            .await;

        // Cleanup runs whatever happened above and never masks the primary result
        let cleanup_started = Instant::now();
        emitter.emit_upload(UploadEvent::StageStarted {
            stage: PipelineStage::Cleanup,
        });
        remove_scratch(scratch, emitter).await;
        emitter.emit_upload(UploadEvent::StageCompleted {
            stage: PipelineStage::Cleanup,
            duration: cleanup_started.elapsed(),
        });

        let (target, report) = result?;
        Ok(UploadOutcome {
            app_id: target.app_id,
            content_version_id: target.content_version_id,
            file_id: target.file_id,
            file_name: manifest.file_name,
            encrypted_size,
            chunks: report.chunks,
            renewals: report.renewals,
            duration: Duration::ZERO,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn remote(
        &self,
        request: &UploadRequest,
        manifest: &PackageManifest,
        content_path: &Path,
        encrypted_size: u64,
        cancel: &CancellationToken,
        emitter: &RunEmitter,
        percent: &mut u8,
    ) -> Result<(UploadTarget, UploadReport), Error> {
        let registry = &self.registry;

        let app_id = stage(
            PipelineStage::CreateApplication,
            cancel,
            emitter,
            percent,
            registry.create_application(&request.attributes, manifest),
        )
        .await?;
        created(emitter, "application", app_id.as_str());

        let content_version_id = stage(
            PipelineStage::CreateContentVersion,
            cancel,
            emitter,
            percent,
            registry.create_content_version(&app_id),
        )
        .await?;
        created(emitter, "content version", content_version_id.as_str());

        let file_id = stage(
            PipelineStage::CreateFileEntry,
            cancel,
            emitter,
            percent,
            registry.create_file_entry(&app_id, &content_version_id, manifest, encrypted_size),
        )
        .await?;
        created(emitter, "file entry", file_id.as_str());

        let target = UploadTarget::new(app_id, content_version_id, file_id);

        let session = stage(
            PipelineStage::NegotiateStorage,
            cancel,
            emitter,
            percent,
            await_storage_uri(registry, &target, &self.settings.negotiation, cancel, emitter),
        )
        .await?;

        let band = ProgressBand {
            start: PipelineStage::UploadChunks.start_percent(),
            end: PipelineStage::UploadChunks.end_percent(),
        };
        let uploader = ChunkedUploader::new(
            registry,
            &self.blob,
            &target,
            &self.settings.upload,
            cancel,
            emitter,
        )
        .with_progress(emitter.run_id().unwrap_or_default(), band);
        let report = stage(
            PipelineStage::UploadChunks,
            cancel,
            emitter,
            percent,
            uploader.upload(session, content_path),
        )
        .await?;

        stage(
            PipelineStage::CommitFile,
            cancel,
            emitter,
            percent,
            registry.commit_file(&target, &manifest.encryption_info()),
        )
        .await?;

        stage(
            PipelineStage::AwaitCommit,
            cancel,
            emitter,
            percent,
            await_stage(
                registry,
                &target,
                UploadStage::CommitFile,
                &self.settings.processing,
                cancel,
                emitter,
            ),
        )
        .await?;

        stage(
            PipelineStage::CommitApplication,
            cancel,
            emitter,
            percent,
            registry.commit_app(&target.app_id, &target.content_version_id),
        )
        .await?;

        Ok((target, report))
    }
}

/// Run one stage: cancellation check, boundary events, stage-tagged errors
async fn stage<T, F>(
    stage: PipelineStage,
    cancel: &CancellationToken,
    emitter: &RunEmitter,
    percent: &mut u8,
    work: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let run_id = emitter.run_id().unwrap_or_default().to_string();
    *percent = stage.start_percent();
    tracing::debug!(%stage, "stage started");
    emitter.emit_upload(UploadEvent::StageStarted { stage });
    emitter.emit_progress_updated(run_id.clone(), *percent, stage.as_str());

    let started = Instant::now();
    let value = work.await.map_err(|e| e.in_stage(stage.as_str()))?;

    *percent = stage.end_percent();
    emitter.emit_upload(UploadEvent::StageCompleted {
        stage,
        duration: started.elapsed(),
    });
    emitter.emit_progress_updated(run_id, *percent, stage.as_str());
    Ok(value)
}

fn created(emitter: &RunEmitter, kind: &str, id: &str) {
    tracing::info!(kind, id, "remote object created");
    emitter.emit_upload(UploadEvent::RemoteObjectCreated {
        kind: kind.to_string(),
        id: id.to_string(),
    });
}

async fn remove_scratch(scratch: ScratchDir, emitter: &RunEmitter) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.remove().await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
        emitter.emit_upload(UploadEvent::ScratchCleanupFailed {
            path,
            error: e.to_string(),
        });
    }
}
