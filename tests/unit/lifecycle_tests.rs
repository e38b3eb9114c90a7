use crossbeam::channel::{Receiver, Sender, unbounded};
use directive_sequencer::{
    BlockingPolicy, CompletionChannel, Directive, DirectiveRouter, Sequencer, SequencerConfig,
    SequencerError, SubmitOutcome,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the worker thread name for every handled directive.
    struct ThreadRecordingRouter {
        handled: Sender<(String, Option<String>)>,
    }

    impl ThreadRecordingRouter {
        fn new() -> (Arc<Self>, Receiver<(String, Option<String>)>) {
            let (handled, rx) = unbounded();
            (Arc::new(Self { handled }), rx)
        }
    }

    impl DirectiveRouter for ThreadRecordingRouter {
        fn pre_handle(&self, _directive: Arc<Directive>, _channel: CompletionChannel) -> bool {
            true
        }

        fn handle(&self, directive: &Arc<Directive>) -> Option<BlockingPolicy> {
            let name = std::thread::current().name().map(str::to_owned);
            let _ = self.handled.send((directive.message_id().to_owned(), name));
            Some(BlockingPolicy::None)
        }

        fn cancel(&self, _directive: &Arc<Directive>) {}
    }

    fn new_directive(session: &str) -> Arc<Directive> {
        Arc::new(Directive::new(
            "Speaker",
            "SetVolume",
            Uuid::new_v4().to_string(),
            session,
        ))
    }

    #[test]
    fn test_worker_thread_uses_configured_name() {
        let (router, handled) = ThreadRecordingRouter::new();
        let config = SequencerConfig::from_json(
            r#"{ "worker_name": "dialog-worker", "worker_stack_size": 262144 }"#,
        )
        .unwrap();
        let sequencer = Sequencer::builder(router).config(config).build().unwrap();
        sequencer.set_active_session("turn-1");

        let directive = new_directive("turn-1");
        assert!(sequencer.submit(directive.clone()));

        let (id, thread_name) = handled.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(id, directive.message_id());
        assert_eq!(thread_name.as_deref(), Some("dialog-worker"));
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = SequencerConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, SequencerError::Config(_)));
        assert!(err.to_string().starts_with("invalid sequencer configuration"));
    }

    #[test]
    fn test_directive_from_wire_is_sequenced() {
        let (router, handled) = ThreadRecordingRouter::new();
        let sequencer = Sequencer::new(router).unwrap();
        sequencer.set_active_session("turn-7");

        let text = json!({
            "namespace": "Speaker",
            "name": "SetVolume",
            "messageId": "wire-1",
            "dialogRequestId": "turn-7",
            "payload": { "volume": 40 }
        })
        .to_string();
        let directive = Arc::new(Directive::from_json(&text).unwrap());
        assert_eq!(directive.payload()["volume"], 40);

        assert_eq!(
            sequencer.try_submit(directive).unwrap(),
            SubmitOutcome::Queued
        );
        let (id, _) = handled.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(id, "wire-1");
    }

    #[test]
    fn test_snapshot_serializes() {
        let (router, _handled) = ThreadRecordingRouter::new();
        let sequencer = Sequencer::new(router).unwrap();
        sequencer.set_active_session("turn-2");

        let value = serde_json::to_value(sequencer.snapshot()).unwrap();
        assert_eq!(value["dialog_request_id"], "turn-2");
        assert_eq!(value["handling_queue"], json!([]));
        assert_eq!(value["is_shutting_down"], false);

        sequencer.shutdown();
        let value = serde_json::to_value(sequencer.snapshot()).unwrap();
        assert_eq!(value["is_shutting_down"], true);
        assert_eq!(value["dialog_request_id"], "");
    }

    #[test]
    fn test_blocking_policy_wire_names() {
        assert_eq!(
            serde_json::to_string(&BlockingPolicy::Blocking).unwrap(),
            "\"BLOCKING\""
        );
        assert_eq!(
            serde_json::from_str::<BlockingPolicy>("\"NONE\"").unwrap(),
            BlockingPolicy::None
        );
        assert!(BlockingPolicy::Blocking.is_blocking());
        assert!(!BlockingPolicy::default().is_blocking());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SequencerError::ShuttingDown.to_string(),
            "sequencer has been shut down"
        );
        let rejected = SequencerError::Rejected {
            message_id: "m-9".into(),
        };
        assert_eq!(
            rejected.to_string(),
            "directive m-9 was not accepted by any handler"
        );
    }
}
