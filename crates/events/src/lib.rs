#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for lobup
//!
//! Library crates report progress and noteworthy outcomes through typed
//! events sent over an unbounded channel. The receiving side (the CLI, or an
//! embedding application) decides how to render or log them. A dropped
//! receiver never fails the sender.

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, FailureContext, GeneralEvent, ProgressEvent, UploadEvent,
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// An event together with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    #[must_use]
    pub fn new(meta: EventMeta, event: AppEvent) -> Self {
        Self { meta, event }
    }

    /// Wrap an event with freshly generated metadata
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let meta = EventMeta::new(event.log_level(), event.event_source());
        Self { meta, event }
    }
}

pub type EventSender = UnboundedSender<EventMessage>;

pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implemented for the raw `EventSender` and for any context struct that
/// carries one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Correlation id stamped on every event from this emitter
    fn correlation_id(&self) -> Option<&str> {
        None
    }

    /// Deliver an event with explicit metadata
    fn emit_with_meta(&self, meta: EventMeta, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(EventMessage::new(meta, event));
        }
    }

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        let mut meta = EventMeta::new(event.log_level(), event.event_source());
        if let Some(id) = self.correlation_id() {
            meta = meta.with_correlation_id(id);
        }
        self.emit_with_meta(meta, event);
    }

    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    fn emit_upload(&self, event: UploadEvent) {
        self.emit(AppEvent::Upload(event));
    }

    fn emit_progress_started(&self, id: impl Into<String>, operation: impl Into<String>) {
        self.emit(AppEvent::Progress(ProgressEvent::started(id, operation)));
    }

    fn emit_progress_updated(&self, id: impl Into<String>, percent: u8, phase: impl Into<String>) {
        self.emit(AppEvent::Progress(ProgressEvent::updated(id, percent, phase)));
    }

    fn emit_progress_completed(&self, id: impl Into<String>, duration: std::time::Duration) {
        self.emit(AppEvent::Progress(ProgressEvent::completed(id, duration)));
    }

    fn emit_progress_failed(&self, id: impl Into<String>, failure: FailureContext, percent: u8) {
        self.emit(AppEvent::Progress(ProgressEvent::Failed {
            id: id.into(),
            failure,
            percent,
        }));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// Emitter bound to one pipeline run
///
/// Carries an optional sender so callers that do not care about events can
/// pass `None`.
#[derive(Debug, Clone, Default)]
pub struct RunEmitter {
    tx: Option<EventSender>,
    run_id: Option<String>,
}

impl RunEmitter {
    #[must_use]
    pub fn new(tx: Option<EventSender>, run_id: impl Into<String>) -> Self {
        Self {
            tx,
            run_id: Some(run_id.into()),
        }
    }

    /// Emitter that drops every event
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }
}

impl EventEmitter for RunEmitter {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }
}
