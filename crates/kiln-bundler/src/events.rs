//! Bundle lifecycle events delivered over subscriber channels.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::manifest::BundleManifest;

/// Lifecycle of one compilation run.
#[derive(Debug, Clone)]
pub enum BundleEvent {
    /// Compilation is about to start.
    Started,
    /// Compilation finished and output was written.
    Completed {
        duration_ms: u64,
        manifest: BundleManifest,
    },
    /// Compilation failed.
    Failed { error: String },
}

/// Fan-out of [`BundleEvent`]s to any number of subscribers.
///
/// Each subscriber gets its own unbounded channel; subscribers that dropped
/// their receiver are pruned on the next emit.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<BundleEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<BundleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber, dropping closed ones.
    pub fn emit(&self, event: BundleEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let hub = EventHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.emit(BundleEvent::Started);

        assert!(matches!(first.recv().await, Some(BundleEvent::Started)));
        assert!(matches!(second.recv().await, Some(BundleEvent::Started)));
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned() {
        let hub = EventHub::new();
        let rx = hub.subscribe();
        let _live = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(rx);
        hub.emit(BundleEvent::Started);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn failed_event_carries_the_message() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        hub.emit(BundleEvent::Failed {
            error: "missing entry".to_string(),
        });

        match rx.recv().await {
            Some(BundleEvent::Failed { error }) => assert_eq!(error, "missing entry"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
