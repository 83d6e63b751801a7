//! Message broker trait and error types.

use async_trait::async_trait;
use std::time::Duration;

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Broker operation error: {0}")]
    OperationError(String),

    #[error("Broker closed")]
    Closed,
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// One delivery of a message to a consumer.
///
/// The same message may be delivered more than once; `attempt` counts
/// deliveries starting at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: String,
    pub payload: Vec<u8>,
    pub attempt: u32,
}

/// Durable at-least-once channel between the redirect path and the stats
/// aggregator.
///
/// A received message stays pending until it is acknowledged or moved to the
/// dead-letter path. Unacknowledged messages are redelivered.
///
/// # Implementations
///
/// - [`crate::infrastructure::broker::RedisStreamBroker`] - Redis Streams consumer group
/// - [`crate::infrastructure::broker::MemoryBroker`] - In-process bounded queue
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Enqueues one message.
    async fn send(&self, payload: Vec<u8>) -> BrokerResult<()>;

    /// Waits up to `wait` for the next delivery, `Ok(None)` when idle.
    async fn receive(&self, wait: Duration) -> BrokerResult<Option<Delivery>>;

    /// Marks the delivery as processed; it will not be redelivered.
    async fn ack(&self, delivery: &Delivery) -> BrokerResult<()>;

    /// Gives the delivery back for redelivery.
    async fn nack(&self, delivery: &Delivery) -> BrokerResult<()>;

    /// Moves a delivery that cannot be processed out of the main queue.
    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> BrokerResult<()>;

    async fn health_check(&self) -> bool;
}
