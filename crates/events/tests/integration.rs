//! Integration tests for events

#[cfg(test)]
mod tests {
    use lobup_events::*;
    use lobup_types::PipelineStage;

    #[tokio::test]
    async fn test_event_emitter_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event,
            AppEvent::General(GeneralEvent::Error { .. })
        ));
        assert_eq!(first.meta.level, EventLevel::Error);

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second.event,
            AppEvent::General(GeneralEvent::DebugLog { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[tokio::test]
    async fn test_run_emitter_stamps_correlation_id() {
        let (tx, mut rx) = channel();
        let emitter = RunEmitter::new(Some(tx), "run-42");

        emitter.emit_upload(UploadEvent::StageStarted {
            stage: PipelineStage::UploadChunks,
        });

        let message = rx.recv().await.unwrap();
        assert_eq!(message.meta.correlation_id.as_deref(), Some("run-42"));
        assert_eq!(message.meta.source, EventSource::UPLOAD);
    }

    #[test]
    fn test_silent_emitter_is_noop() {
        let emitter = RunEmitter::silent();
        emitter.emit_progress_updated("run", 50, "upload chunks");
        assert!(emitter.run_id().is_none());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Progress(ProgressEvent::updated("run", 150, "cleanup"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "progress");
        assert_eq!(json["event"]["type"], "Updated");
        // Percent is clamped
        assert_eq!(json["event"]["percent"], 100);
    }
}
