//! Structured logging integration for events
//!
//! Converts pipeline events into tracing records with structured fields so
//! a JSON subscriber produces machine-readable run logs.

use lobup_events::{AppEvent, EventMessage, GeneralEvent, ProgressEvent, UploadEvent};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging
///
/// Logs always go to stderr so stdout stays reserved for command output.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,lobup=debug,lobup_upload=debug,lobup_net=debug,lobup_package=debug"
    } else {
        "warn,lobup=info,lobup_upload=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(debug_enabled)
            .with_env_filter(filter)
            .init();
    }
}

/// Log an event using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    match event {
        AppEvent::Upload(upload_event) => match upload_event {
            UploadEvent::RunStarted { run_id, archive } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    run_id = %run_id,
                    archive = %archive.display(),
                    "Upload run started"
                );
            }
            UploadEvent::StageStarted { stage } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    stage = %stage,
                    "Stage started"
                );
            }
            UploadEvent::StageCompleted { stage, duration } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    stage = %stage,
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "Stage completed"
                );
            }
            UploadEvent::PayloadPrepared {
                file_name,
                unencrypted_size,
                encrypted_size,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    file_name = %file_name,
                    unencrypted_size = unencrypted_size,
                    encrypted_size = encrypted_size,
                    "Payload prepared"
                );
            }
            UploadEvent::RemoteObjectCreated { kind, id } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    kind = %kind,
                    id = %id,
                    "Remote object created"
                );
            }
            UploadEvent::PollObserved {
                stage,
                attempt,
                state,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    stage = %stage,
                    attempt = attempt,
                    state = ?state,
                    "Upload state observed"
                );
            }
            UploadEvent::ChunkUploaded {
                index,
                total,
                bytes,
                attempts,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    index = index,
                    total = total,
                    bytes = bytes,
                    attempts = attempts,
                    "Chunk uploaded"
                );
            }
            UploadEvent::ChunkRetrying {
                index,
                attempt,
                max_attempts,
                reason,
                backoff,
            } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    index = index,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    reason = %reason,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "Retrying chunk"
                );
            }
            UploadEvent::RenewalFailed { error, continuing } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    error = %error,
                    continuing = continuing,
                    "Storage URI renewal failed"
                );
            }
            UploadEvent::ScratchCleanupFailed { path, error } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    path = %path.display(),
                    error = %error,
                    "Scratch cleanup failed"
                );
            }
            UploadEvent::RunCompleted { app_id, duration } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    app_id = %app_id,
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "Upload run completed"
                );
            }
            UploadEvent::RunFailed { stage, failure } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    stage = ?stage,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Upload run failed"
                );
            }
            other => log_at_level(meta.tracing_level(), meta, other),
        },

        AppEvent::Progress(ProgressEvent::Failed {
            id,
            failure,
            percent,
        }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                id = %id,
                percent = percent,
                code = ?failure.code,
                message = %failure.message,
                "Progress failed"
            );
        }

        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                message = %message,
                context = ?context,
                "Warning"
            );
        }

        AppEvent::General(GeneralEvent::Error { message, details }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                message = %message,
                details = ?details,
                "Error"
            );
        }

        // Fallback for all other events
        other => log_at_level(meta.tracing_level(), meta, other),
    }
}

fn log_at_level(
    level: tracing::Level,
    meta: &lobup_events::EventMeta,
    event: &impl std::fmt::Debug,
) {
    match level {
        tracing::Level::ERROR => {
            error!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
        }
        tracing::Level::WARN => {
            warn!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
        }
        tracing::Level::INFO => {
            info!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
        }
        tracing::Level::DEBUG => {
            debug!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
        }
        tracing::Level::TRACE => {
            trace!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
        }
    }
}
