//! Idempotent consumption of click events into the stats store.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::StatsRepository;
use crate::infrastructure::broker::{BrokerError, Delivery, MessageBroker};

/// Tunables for [`StatsAggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// How long a processed `event_id` is remembered.
    pub dedup_window: Duration,
    pub dedup_capacity: u64,
    /// Inline retries of one stats write before giving the delivery back.
    pub write_retries: usize,
    /// Deliveries at or past this attempt go to the dead-letter path on failure.
    pub max_delivery_attempts: u32,
    pub receive_wait: Duration,
    /// Pause after a broker error in [`StatsAggregator::run`].
    pub error_backoff: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(3600),
            dedup_capacity: 1_000_000,
            write_retries: 3,
            max_delivery_attempts: 5,
            receive_wait: Duration::from_secs(1),
            error_backoff: Duration::from_millis(500),
        }
    }
}

/// What became of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Counted and acknowledged.
    Applied,
    /// Already counted within the dedup window; acknowledged only.
    Deduplicated,
    /// Stats write failed; handed back to the broker for redelivery.
    Requeued,
    /// Malformed, or failed on its last allowed attempt.
    DeadLettered,
}

/// Turns at-least-once deliveries into exactly-once counting within the
/// dedup window.
///
/// An `event_id` is claimed in the window before the stats write and the
/// claim is released if the write fails, so a redelivered event is skipped
/// only after it was actually counted.
pub struct StatsAggregator<S: StatsRepository + ?Sized> {
    broker: Arc<dyn MessageBroker>,
    stats: Arc<S>,
    seen: Cache<String, ()>,
    settings: AggregatorSettings,
}

impl<S: StatsRepository + ?Sized> StatsAggregator<S> {
    pub fn new(broker: Arc<dyn MessageBroker>, stats: Arc<S>, settings: AggregatorSettings) -> Self {
        let seen = Cache::builder()
            .max_capacity(settings.dedup_capacity)
            .time_to_live(settings.dedup_window)
            .build();

        Self {
            broker,
            stats,
            seen,
            settings,
        }
    }

    /// Consumes deliveries until `shutdown` flips to `true` or its sender is
    /// dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Stats aggregator started");

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                received = self.broker.receive(self.settings.receive_wait) => match received {
                    Ok(Some(delivery)) => {
                        if let Err(e) = self.process(delivery).await {
                            warn!("Broker error while settling delivery: {}", e);
                            tokio::time::sleep(self.settings.error_backoff).await;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Broker receive failed: {}", e);
                        tokio::time::sleep(self.settings.error_backoff).await;
                    }
                },
            }
        }

        info!("Stats aggregator stopped");
    }

    /// Processes whatever is queued right now and returns how many
    /// deliveries were handled.
    pub async fn drain(&self) -> Result<usize, BrokerError> {
        let mut handled = 0;

        while let Some(delivery) = self.broker.receive(self.settings.receive_wait).await? {
            self.process(delivery).await?;
            handled += 1;
        }

        Ok(handled)
    }

    /// Settles one delivery.
    ///
    /// # Errors
    ///
    /// Returns a [`BrokerError`] only if acknowledging, requeueing or
    /// dead-lettering failed; the delivery then stays with the broker.
    pub async fn process(&self, delivery: Delivery) -> Result<ProcessOutcome, BrokerError> {
        let event = match ClickEvent::decode(&delivery.payload) {
            Ok(event) => event,
            Err(e) => {
                error!(id = %delivery.id, "Undecodable click event: {}", e);
                self.broker.dead_letter(&delivery, &e.to_string()).await?;
                metrics::counter!("click_events_dead_lettered_total").increment(1);
                return Ok(ProcessOutcome::DeadLettered);
            }
        };

        let claimed = self
            .seen
            .entry(event.event_id.clone())
            .or_insert(())
            .await
            .is_fresh();

        if !claimed {
            debug!(event_id = %event.event_id, "duplicate click event skipped");
            self.broker.ack(&delivery).await?;
            metrics::counter!("click_events_deduplicated_total").increment(1);
            return Ok(ProcessOutcome::Deduplicated);
        }

        match self.apply(&event).await {
            Ok(()) => {
                metrics::counter!("click_events_applied_total").increment(1);
                if let Err(e) = self.broker.ack(&delivery).await {
                    // Counted already; a redelivery will be deduplicated.
                    warn!(id = %delivery.id, "Ack after apply failed: {}", e);
                }
                Ok(ProcessOutcome::Applied)
            }
            Err(e) => {
                self.seen.invalidate(&event.event_id).await;

                if delivery.attempt >= self.settings.max_delivery_attempts {
                    error!(
                        id = %delivery.id,
                        event_id = %event.event_id,
                        attempt = delivery.attempt,
                        "Click event dead-lettered: {}",
                        e
                    );
                    self.broker.dead_letter(&delivery, &e.to_string()).await?;
                    metrics::counter!("click_events_dead_lettered_total").increment(1);
                    Ok(ProcessOutcome::DeadLettered)
                } else {
                    warn!(
                        id = %delivery.id,
                        attempt = delivery.attempt,
                        "Stats write failed, requeueing: {}",
                        e
                    );
                    self.broker.nack(&delivery).await?;
                    metrics::counter!("click_events_requeued_total").increment(1);
                    Ok(ProcessOutcome::Requeued)
                }
            }
        }
    }

    async fn apply(&self, event: &ClickEvent) -> Result<(), crate::error::AppError> {
        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_millis(200))
            .map(jitter)
            .take(self.settings.write_retries);

        Retry::spawn(strategy, || {
            self.stats.record_click(&event.code, event.timestamp)
        })
        .await
    }
}
