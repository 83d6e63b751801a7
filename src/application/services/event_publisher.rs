//! Bounded, fire-and-forget publishing of click events.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::click_event::ClickEvent;
use crate::infrastructure::broker::MessageBroker;

/// Why an event did not make it onto the broker.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Click event {event_id} dropped: {reason}")]
    Dropped { event_id: String, reason: String },
}

/// Enqueues click events with a hard upper bound on time spent.
///
/// Accuracy gives way to availability here: an event that cannot be
/// enqueued within `enqueue_timeout` is dropped, counted and logged. There
/// is no synchronous retry.
pub struct EventPublisher {
    broker: Arc<dyn MessageBroker>,
    enqueue_timeout: Duration,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>, enqueue_timeout: Duration) -> Self {
        Self {
            broker,
            enqueue_timeout,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Encodes and enqueues one event.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Dropped`] on encoding failure, broker error or
    /// when the enqueue does not finish within the timeout.
    pub async fn publish(&self, event: &ClickEvent) -> Result<(), PublishError> {
        let payload = match event.encode() {
            Ok(payload) => payload,
            Err(e) => return Err(self.drop_event(event, format!("encoding failed: {}", e))),
        };

        match tokio::time::timeout(self.enqueue_timeout, self.broker.send(payload)).await {
            Ok(Ok(())) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("click_events_published_total").increment(1);
                debug!(code = %event.code, event_id = %event.event_id, "click event published");
                Ok(())
            }
            Ok(Err(e)) => Err(self.drop_event(event, e.to_string())),
            Err(_) => Err(self.drop_event(
                event,
                format!("enqueue timed out after {:?}", self.enqueue_timeout),
            )),
        }
    }

    /// Publishes on a separate task so the caller neither waits for nor can
    /// cancel the enqueue.
    pub fn publish_detached(self: &Arc<Self>, event: ClickEvent) -> JoinHandle<()> {
        let publisher = Arc::clone(self);
        tokio::spawn(async move {
            // Already counted and logged.
            let _ = publisher.publish(&event).await;
        })
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn drop_event(&self, event: &ClickEvent, reason: String) -> PublishError {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("click_events_dropped_total").increment(1);
        warn!(
            code = %event.code,
            event_id = %event.event_id,
            "click event dropped: {}",
            reason
        );

        PublishError::Dropped {
            event_id: event.event_id.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::broker::{BrokerError, MemoryBroker, MockMessageBroker};
    use std::time::Instant;

    #[tokio::test]
    async fn test_publish_enqueues_encoded_event() {
        let broker = Arc::new(MemoryBroker::new(8));
        let publisher = EventPublisher::new(broker.clone(), Duration::from_millis(100));
        let event = ClickEvent::new("abc1234");

        publisher.publish(&event).await.unwrap();

        let delivery = broker
            .receive(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ClickEvent::decode(&delivery.payload).unwrap(), event);
        assert_eq!(publisher.published_count(), 1);
        assert_eq!(publisher.dropped_count(), 0);
    }

    #[tokio::test]
    async fn test_broker_error_drops_event() {
        let mut broker = MockMessageBroker::new();
        broker
            .expect_send()
            .times(1)
            .returning(|_| Err(BrokerError::Unavailable("down".to_string())));

        let publisher = EventPublisher::new(Arc::new(broker), Duration::from_millis(100));
        let result = publisher.publish(&ClickEvent::new("abc1234")).await;

        assert!(matches!(result, Err(PublishError::Dropped { .. })));
        assert_eq!(publisher.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_stalled_broker_is_bounded_by_timeout() {
        let broker = Arc::new(MemoryBroker::new(8));
        broker.set_stalled(true);
        let publisher = EventPublisher::new(broker, Duration::from_millis(50));

        let started = Instant::now();
        let result = publisher.publish(&ClickEvent::new("abc1234")).await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(publisher.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_detached_runs_to_completion() {
        let broker = Arc::new(MemoryBroker::new(8));
        let publisher = Arc::new(EventPublisher::new(broker.clone(), Duration::from_millis(100)));

        publisher
            .publish_detached(ClickEvent::new("abc1234"))
            .await
            .unwrap();

        assert_eq!(publisher.published_count(), 1);
        assert_eq!(broker.queued_count(), 1);
    }
}
