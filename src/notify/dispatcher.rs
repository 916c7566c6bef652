//! Notification Dispatcher (§2 component 8, §4.10): filters events against
//! the enabled category set, batches Detect names into at most one flush
//! per minute, and fans everything else straight to the configured
//! transport.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::event::Event;
use super::transport::Notifier;
use crate::config::NotificationCategory;

const DETECT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

pub struct Dispatcher {
    enabled: HashSet<NotificationCategory>,
    transport: Option<Arc<dyn Notifier>>,
    detect_batch: Mutex<Vec<String>>,
}

impl Dispatcher {
    pub fn new(enabled: HashSet<NotificationCategory>, transport: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            enabled,
            transport,
            detect_batch: Mutex::new(Vec::new()),
        }
    }

    fn is_enabled(&self, category: NotificationCategory) -> bool {
        self.enabled.contains(&category)
    }

    /// Dispatches a non-Detect event immediately; Detect events are
    /// queued into the batch instead (flushed separately on a timer).
    pub async fn dispatch(&self, event: Event) {
        if let Event::Detect { names } = event {
            if !names.is_empty() {
                self.detect_batch.lock().await.extend(names);
            }
            return;
        }

        if !self.is_enabled(event.category()) {
            return;
        }
        self.send(&event).await;
    }

    async fn send(&self, event: &Event) {
        let Some(transport) = &self.transport else {
            return;
        };
        let (title, message) = event.render();
        transport.notify(&title, &message).await;
    }

    /// Flushes any names accumulated since the last flush as a single
    /// Detect event. A no-op when the batch is empty, matching the
    /// idempotence property ("empty flush of Detect... emits nothing").
    async fn flush_detect(&self) {
        let names = {
            let mut batch = self.detect_batch.lock().await;
            if batch.is_empty() {
                return;
            }
            std::mem::take(&mut *batch)
        };

        if !self.is_enabled(NotificationCategory::Detect) {
            return;
        }
        self.send(&Event::Detect { names }).await;
    }

    /// Runs the 60-second flush ticker for the Detect batch. Intended to
    /// be spawned once as its own task for the process lifetime.
    pub async fn run_detect_flusher(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(DETECT_FLUSH_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.flush_detect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier {
        calls: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn notify<'a>(
            &'a self,
            _title: &'a str,
            _message: &'a str,
        ) -> super::super::transport::NotifyFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn disabled_category_is_not_dispatched() {
        let notifier = Arc::new(CountingNotifier {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::new(HashSet::from([NotificationCategory::Update]), Some(notifier.clone()));

        dispatcher
            .dispatch(Event::ActionCommitted {
                name: "web".into(),
                kind: crate::scheduler::ActionKind::Restart,
            })
            .await;

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enabled_category_is_dispatched() {
        let notifier = Arc::new(CountingNotifier {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::new(HashSet::from([NotificationCategory::Update]), Some(notifier.clone()));

        dispatcher
            .dispatch(Event::ActionCommitted {
                name: "web".into(),
                kind: crate::scheduler::ActionKind::Update,
            })
            .await;

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detect_events_batch_until_flushed() {
        let notifier = Arc::new(CountingNotifier {
            calls: AtomicUsize::new(0),
        });
        let dispatcher = Dispatcher::new(HashSet::from([NotificationCategory::Detect]), Some(notifier.clone()));

        dispatcher
            .dispatch(Event::Detect { names: vec!["web".to_string()] })
            .await;
        dispatcher
            .dispatch(Event::Detect { names: vec!["db".to_string()] })
            .await;
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 0);

        dispatcher.flush_detect().await;
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);

        dispatcher.flush_detect().await;
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1, "empty flush is a no-op");
    }
}
