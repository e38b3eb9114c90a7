use directive_sequencer::{BlockingPolicy, CompletionChannel, Directive, DirectiveRouter, Sequencer};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Handled(String),
        Cancelled(String),
    }

    /// Router whose handlers finish on the tokio runtime after `delay`.
    struct AsyncRouter {
        runtime: tokio::runtime::Handle,
        delay: Duration,
        failing: HashSet<String>,
        channels: Mutex<HashMap<String, CompletionChannel>>,
        events: mpsc::UnboundedSender<Event>,
    }

    impl AsyncRouter {
        fn new(delay: Duration, failing: &[&str]) -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
            let (events, rx) = mpsc::unbounded_channel();
            let router = Arc::new(Self {
                runtime: tokio::runtime::Handle::current(),
                delay,
                failing: failing.iter().map(|id| (*id).to_owned()).collect(),
                channels: Mutex::new(HashMap::new()),
                events,
            });
            (router, rx)
        }
    }

    impl DirectiveRouter for AsyncRouter {
        fn pre_handle(&self, directive: Arc<Directive>, channel: CompletionChannel) -> bool {
            self.channels
                .lock()
                .insert(directive.message_id().to_owned(), channel);
            true
        }

        fn handle(&self, directive: &Arc<Directive>) -> Option<BlockingPolicy> {
            let id = directive.message_id().to_owned();
            let _ = self.events.send(Event::Handled(id.clone()));

            let channel = self.channels.lock().get(&id).cloned()?;
            let fail = self.failing.contains(&id);
            let delay = self.delay;
            self.runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                if fail {
                    channel.fail("handler error");
                } else {
                    channel.complete();
                }
            });
            Some(BlockingPolicy::Blocking)
        }

        fn cancel(&self, directive: &Arc<Directive>) {
            let _ = self
                .events
                .send(Event::Cancelled(directive.message_id().to_owned()));
        }
    }

    fn directive(id: &str) -> Arc<Directive> {
        Arc::new(Directive::new("Test", "Run", id, "turn"))
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for router event")
            .expect("router dropped")
    }

    async fn shutdown(sequencer: Sequencer) {
        tokio::task::spawn_blocking(move || drop(sequencer))
            .await
            .expect("shutdown panicked");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_completions_drive_queue_in_order() {
        let (router, mut events) = AsyncRouter::new(Duration::from_millis(5), &[]);
        let sequencer = Sequencer::new(router.clone()).unwrap();
        sequencer.set_active_session("turn");

        let ids: Vec<String> = (0..10).map(|n| format!("m{n}")).collect();
        for id in &ids {
            assert!(sequencer.submit(directive(id)));
        }

        for id in &ids {
            assert_eq!(next_event(&mut events).await, Event::Handled(id.clone()));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        let snapshot = sequencer.snapshot();
        assert!(snapshot.is_idle());
        assert!(!snapshot.is_handling);

        shutdown(sequencer).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_failure_cancels_rest_of_turn() {
        let (router, mut events) = AsyncRouter::new(Duration::from_millis(20), &["m1"]);
        let sequencer = Sequencer::new(router.clone()).unwrap();
        sequencer.set_active_session("turn");

        for id in ["m0", "m1", "m2", "m3"] {
            assert!(sequencer.submit(directive(id)));
        }

        assert_eq!(next_event(&mut events).await, Event::Handled("m0".into()));
        assert_eq!(next_event(&mut events).await, Event::Handled("m1".into()));
        assert_eq!(next_event(&mut events).await, Event::Cancelled("m2".into()));
        assert_eq!(next_event(&mut events).await, Event::Cancelled("m3".into()));
        assert_eq!(sequencer.active_session(), "");

        shutdown(sequencer).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_completion_after_shutdown_is_ignored() {
        let (router, mut events) = AsyncRouter::new(Duration::from_millis(200), &[]);
        let sequencer = Sequencer::new(router.clone()).unwrap();
        sequencer.set_active_session("turn");

        assert!(sequencer.submit(directive("slow")));
        assert_eq!(next_event(&mut events).await, Event::Handled("slow".into()));

        shutdown(sequencer).await;
        assert_eq!(next_event(&mut events).await, Event::Cancelled("slow".into()));

        // The spawned handler reports after the Sequencer is gone.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(events.try_recv().is_err());
    }
}
