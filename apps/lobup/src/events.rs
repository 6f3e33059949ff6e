//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::{style, Term};
use lobup_events::{AppEvent, EventMessage, GeneralEvent, ProgressEvent, UploadEvent};

/// Renders pipeline events as status lines on stderr
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    /// In JSON mode events only go to the log
    quiet: bool,
    last_percent: u8,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, json_mode: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            quiet: json_mode,
            last_percent: 0,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: &EventMessage) {
        log_event_with_tracing(message);
        if self.quiet {
            return;
        }

        match &message.event {
            AppEvent::Upload(event) => self.handle_upload_event(event),
            AppEvent::Progress(ProgressEvent::Updated { percent, .. }) => {
                self.last_percent = *percent;
            }
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                let text = match context {
                    Some(context) => format!("{message} ({context})"),
                    None => message.clone(),
                };
                self.show_warning(&text);
            }
            AppEvent::General(GeneralEvent::Error { message, .. }) => self.show_error(message),
            _ => {}
        }
    }

    fn handle_upload_event(&mut self, event: &UploadEvent) {
        match event {
            UploadEvent::StageStarted { stage } => {
                self.show_status(&format!("[{:>3}%] {stage}", self.last_percent));
            }
            UploadEvent::PayloadPrepared {
                file_name,
                encrypted_size,
                ..
            } => {
                self.show_status(&format!(
                    "       {file_name} ({})",
                    format_bytes(*encrypted_size)
                ));
            }
            UploadEvent::RemoteObjectCreated { kind, id } => {
                self.show_status(&format!("       created {kind} {id}"));
            }
            UploadEvent::ChunkUploaded {
                index,
                total,
                bytes,
                ..
            } => {
                self.show_status(&format!(
                    "       block {}/{total} ({})",
                    index + 1,
                    format_bytes(*bytes)
                ));
            }
            UploadEvent::ChunkRetrying {
                index,
                attempt,
                max_attempts,
                reason,
                ..
            } => {
                self.show_warning(&format!(
                    "block {} attempt {attempt}/{max_attempts} failed: {reason}",
                    index + 1
                ));
            }
            UploadEvent::RenewalStarted { .. } => {
                self.show_status("       renewing storage URI");
            }
            UploadEvent::RenewalFailed { error, continuing } => {
                if *continuing {
                    self.show_warning(&format!(
                        "storage URI renewal failed, continuing with the current URI: {error}"
                    ));
                } else {
                    self.show_error(&format!("storage URI renewal failed: {error}"));
                }
            }
            UploadEvent::ScratchCleanupFailed { path, error } => {
                self.show_warning(&format!(
                    "could not remove {}: {error}",
                    path.display()
                ));
            }
            UploadEvent::RunFailed { stage, failure } => {
                let stage = stage.as_deref().unwrap_or("upload");
                self.show_error(&format!("{stage} failed: {}", failure.message));
            }
            _ => {}
        }
    }

    fn show_status(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn show_warning(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("warning:").yellow().bold())
        } else {
            format!("warning: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_error(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("error:").red().bold())
        } else {
            format!("error: {message}")
        };
        let _ = self.term.write_line(&line);
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(6 * 1024 * 1024), "6.0 MiB");
        assert_eq!(format_bytes(1536), "1.5 KiB");
    }
}
