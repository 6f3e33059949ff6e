//! Chunked block-blob upload with retry and mid-transfer URI renewal

use crate::chunk::{read_chunk, Chunk, ChunkPlan};
use crate::negotiate::session_from;
use crate::poll::PollPolicy;
use crate::sleep_or_cancel;
use crate::waiter::await_stage;
use bytes::Bytes;
use lobup_config::{Config, RenewalFailure, UploadConfig};
use lobup_errors::{BlobError, Error};
use lobup_events::{EventEmitter, UploadEvent};
use lobup_net::{error_status, retryability, BlobApi, RegistryApi, RetryPolicy};
use lobup_types::{StorageSession, UploadStage, UploadTarget};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Chunk sizing and per-attempt timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub large_file_threshold: u64,
    pub large_file_chunk_size: u64,
    pub chunk_size: u64,
    /// Timeout of the first attempt, less one minute
    pub timeout_base: Duration,
    /// Added to the timeout for every attempt
    pub timeout_step: Duration,
    /// Flat timeout for every attempt of the final chunk
    pub final_chunk_timeout: Duration,
}

impl ChunkPolicy {
    #[must_use]
    pub fn chunk_size_for(&self, file_size: u64) -> u64 {
        if file_size > self.large_file_threshold {
            self.large_file_chunk_size
        } else {
            self.chunk_size
        }
    }

    /// Timeout for attempt `attempt` (1-based) of a chunk
    #[must_use]
    pub fn attempt_timeout(&self, attempt: u32, is_last: bool) -> Duration {
        if is_last {
            self.final_chunk_timeout
        } else {
            self.timeout_base + self.timeout_step * attempt
        }
    }
}

impl From<&UploadConfig> for ChunkPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            large_file_threshold: config.large_file_threshold,
            large_file_chunk_size: config.large_file_chunk_size,
            chunk_size: config.chunk_size,
            timeout_base: Duration::from_secs(config.chunk_timeout_base_secs),
            timeout_step: Duration::from_secs(60),
            final_chunk_timeout: Duration::from_secs(config.final_chunk_timeout_secs),
        }
    }
}

/// When and how the storage URI is renewed during a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    /// Session age after which the URI is renewed before the next chunk
    pub threshold: Duration,
    pub on_failure: RenewalFailure,
    /// Wait for the `AzureStorageUriRenewal` stage
    pub poll: PollPolicy,
}

/// Everything the uploader needs to know about pacing and limits
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub chunks: ChunkPolicy,
    pub chunk_retry: RetryPolicy,
    pub commit_retry: RetryPolicy,
    pub renewal: RenewalPolicy,
}

impl From<&Config> for UploadPolicy {
    fn from(config: &Config) -> Self {
        Self {
            chunks: ChunkPolicy::from(&config.upload),
            chunk_retry: RetryPolicy::for_chunks(&config.upload),
            commit_retry: RetryPolicy::for_commit(&config.upload),
            renewal: RenewalPolicy {
                threshold: Duration::from_secs(config.upload.renewal_threshold_secs),
                on_failure: config.upload.renewal_failure,
                poll: PollPolicy::negotiation(&config.polling),
            },
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Result of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub chunks: usize,
    pub bytes: u64,
    /// Encoded block ids as committed
    pub block_ids: Vec<String>,
    /// Renewal round-trips attempted, successful or not
    pub renewals: u32,
}

/// Progress band the uploader reports into, in whole percent
#[derive(Debug, Clone, Copy)]
pub struct ProgressBand {
    pub start: u8,
    pub end: u8,
}

impl ProgressBand {
    fn at(self, done: usize, total: usize) -> u8 {
        if total == 0 {
            return self.end;
        }
        let span = usize::from(self.end.saturating_sub(self.start));
        let offset = span * done / total;
        self.start + u8::try_from(offset).unwrap_or(u8::MAX - self.start)
    }
}

/// Uploads one payload file to one blob
pub struct ChunkedUploader<'a, R: ?Sized, B: ?Sized, E> {
    registry: &'a R,
    blob: &'a B,
    target: &'a UploadTarget,
    policy: &'a UploadPolicy,
    cancel: &'a CancellationToken,
    emitter: &'a E,
    progress: Option<(String, ProgressBand)>,
}

impl<'a, R, B, E> ChunkedUploader<'a, R, B, E>
where
    R: RegistryApi + ?Sized,
    B: BlobApi + ?Sized,
    E: EventEmitter,
{
    pub fn new(
        registry: &'a R,
        blob: &'a B,
        target: &'a UploadTarget,
        policy: &'a UploadPolicy,
        cancel: &'a CancellationToken,
        emitter: &'a E,
    ) -> Self {
        Self {
            registry,
            blob,
            target,
            policy,
            cancel,
            emitter,
            progress: None,
        }
    }

    /// Emit interpolated progress updates for `run_id` after each chunk
    #[must_use]
    pub fn with_progress(mut self, run_id: impl Into<String>, band: ProgressBand) -> Self {
        self.progress = Some((run_id.into(), band));
        self
    }

    /// Upload `path` in chunks and commit the block list
    ///
    /// # Errors
    ///
    /// Returns `BlobError::ChunkUploadFailed` once a chunk exhausts its retry
    /// budget or hits a permanent failure, `BlobError::BlockCommitFailed` if
    /// the block list cannot be committed, `BlobError::RenewalFailed` when
    /// renewal fails under the abort policy, and `Error::Cancelled`.
    pub async fn upload(&self, session: StorageSession, path: &Path) -> Result<UploadReport, Error> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?
            .len();
        let plan = ChunkPlan::new(size, self.policy.chunks.chunk_size_for(size));
        tracing::info!(
            upload = %self.target,
            size,
            chunk_size = plan.chunk_size(),
            chunks = plan.len(),
            "uploading payload"
        );

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        let mut session = session;
        let mut renewals = 0u32;

        for chunk in plan.chunks() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let is_last = plan.is_last(chunk);
            if !is_last && session.age() >= self.policy.renewal.threshold {
                session = self.renew(session).await?;
                renewals += 1;
            }

            let data = read_chunk(&mut file, chunk, path).await?;
            let attempts = self.put_chunk(&session, chunk, data, is_last).await?;

            self.emitter.emit_upload(UploadEvent::ChunkUploaded {
                index: chunk.index,
                total: plan.len(),
                bytes: chunk.len,
                attempts,
            });
            if let Some((run_id, band)) = &self.progress {
                self.emitter.emit_progress_updated(
                    run_id.clone(),
                    band.at(chunk.index + 1, plan.len()),
                    format!("chunk {}/{}", chunk.index + 1, plan.len()),
                );
            }
        }

        let block_ids = plan.block_list();
        self.commit_blocks(&session, &block_ids).await?;

        Ok(UploadReport {
            chunks: plan.len(),
            bytes: size,
            block_ids,
            renewals,
        })
    }

    /// Upload one chunk with bounded retry; returns the number of attempts used
    async fn put_chunk(
        &self,
        session: &StorageSession,
        chunk: &Chunk,
        data: Bytes,
        is_last: bool,
    ) -> Result<u32, Error> {
        let retry = &self.policy.chunk_retry;
        let block_id = chunk.encoded_block_id();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let timeout = self.policy.chunks.attempt_timeout(attempt, is_last);
            let result = tokio::select! {
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                result = self.blob.put_block(session.sas_uri(), &block_id, data.clone(), timeout) => result,
            };

            let err = match result {
                Ok(()) => {
                    tracing::debug!(chunk = chunk.index, attempt, bytes = chunk.len, "chunk uploaded");
                    return Ok(attempt);
                }
                Err(e) => e,
            };

            if !retryability(&err).should_retry() || attempt >= retry.max_attempts {
                tracing::warn!(chunk = chunk.index, attempt, error = %err, "chunk upload failed");
                return Err(BlobError::ChunkUploadFailed {
                    chunk_index: chunk.index,
                    status: error_status(&err),
                    attempts: attempt,
                    message: err.to_string(),
                }
                .into());
            }

            let backoff = retry.backoff_delay(attempt);
            tracing::debug!(chunk = chunk.index, attempt, error = %err, ?backoff, "retrying chunk");
            self.emitter.emit_upload(UploadEvent::ChunkRetrying {
                index: chunk.index,
                attempt,
                max_attempts: retry.max_attempts,
                reason: err.to_string(),
                backoff,
            });
            sleep_or_cancel(backoff, self.cancel).await?;
        }
    }

    async fn commit_blocks(&self, session: &StorageSession, block_ids: &[String]) -> Result<(), Error> {
        let retry = &self.policy.commit_retry;
        let mut attempt = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            attempt += 1;
            match self.blob.put_block_list(session.sas_uri(), block_ids).await {
                Ok(()) => {
                    tracing::info!(blocks = block_ids.len(), attempt, "block list committed");
                    self.emitter.emit_upload(UploadEvent::BlockListCommitted {
                        blocks: block_ids.len(),
                    });
                    return Ok(());
                }
                Err(err) if retryability(&err).should_retry() && attempt < retry.max_attempts => {
                    let backoff = retry.backoff_delay(attempt);
                    tracing::debug!(attempt, error = %err, ?backoff, "retrying block list commit");
                    sleep_or_cancel(backoff, self.cancel).await?;
                }
                Err(err) => {
                    return Err(BlobError::BlockCommitFailed {
                        status: error_status(&err),
                        attempts: attempt,
                        message: err.to_string(),
                    }
                    .into());
                }
            }
        }
    }

    /// Renew the storage URI, applying the configured failure policy
    ///
    /// Under the continue policy a failed renewal yields the old URI with a
    /// restarted stopwatch, so renewal is next attempted one threshold later.
    async fn renew(&self, session: StorageSession) -> Result<StorageSession, Error> {
        let elapsed = session.age();
        tracing::info!(upload = %self.target, ?elapsed, "renewing storage URI");
        self.emitter
            .emit_upload(UploadEvent::RenewalStarted { elapsed });

        match self.renew_once().await {
            Ok(renewed) => {
                self.emitter.emit_upload(UploadEvent::RenewalSucceeded);
                Ok(renewed)
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                let continuing = self.policy.renewal.on_failure == RenewalFailure::Continue;
                tracing::warn!(error = %e, continuing, "storage URI renewal failed");
                self.emitter.emit_upload(UploadEvent::RenewalFailed {
                    error: e.to_string(),
                    continuing,
                });
                if continuing {
                    Ok(StorageSession::new(session.sas_uri()))
                } else {
                    Err(BlobError::RenewalFailed {
                        message: e.to_string(),
                    }
                    .into())
                }
            }
        }
    }

    async fn renew_once(&self) -> Result<StorageSession, Error> {
        let stage = UploadStage::AzureStorageUriRenewal;
        self.registry.renew_storage_uri(self.target).await?;
        await_stage(
            self.registry,
            self.target,
            stage,
            &self.policy.renewal.poll,
            self.cancel,
            self.emitter,
        )
        .await?;
        let status = self.registry.get_file_entry(self.target).await?;
        session_from(stage, &status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_timeouts_widen() {
        let policy = ChunkPolicy::from(&UploadConfig::default());
        assert_eq!(policy.attempt_timeout(1, false), Duration::from_secs(360));
        assert_eq!(policy.attempt_timeout(5, false), Duration::from_secs(600));
        assert_eq!(policy.attempt_timeout(1, true), Duration::from_secs(900));
        assert_eq!(policy.attempt_timeout(5, true), Duration::from_secs(900));
    }

    #[test]
    fn test_chunk_size_switches_for_large_files() {
        let policy = ChunkPolicy::from(&UploadConfig::default());
        assert_eq!(policy.chunk_size_for(14 * 1024 * 1024), 6 * 1024 * 1024);
        assert_eq!(policy.chunk_size_for(6 * 1024 * 1024 * 1024), 4 * 1024 * 1024);
    }

    #[test]
    fn test_progress_band_interpolates() {
        let band = ProgressBand { start: 25, end: 85 };
        assert_eq!(band.at(0, 3), 25);
        assert_eq!(band.at(1, 3), 45);
        assert_eq!(band.at(3, 3), 85);
        assert_eq!(band.at(0, 0), 85);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.chunk_retry.max_attempts, 5);
        assert!(policy.commit_retry.jitter_factor.abs() < f64::EPSILON);
        assert_eq!(policy.renewal.threshold, Duration::from_secs(420));
        assert_eq!(policy.renewal.on_failure, RenewalFailure::Continue);
    }
}
