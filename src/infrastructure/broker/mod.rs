//! Message broker carrying click events to the stats aggregator.
//!
//! - [`RedisStreamBroker`] - Redis Streams with a consumer group
//! - [`MemoryBroker`] - Bounded in-process queue for single-node use and tests

mod memory_broker;
mod redis_stream_broker;
mod service;

pub use memory_broker::{DeadLetter, MemoryBroker};
pub use redis_stream_broker::{RedisStreamBroker, RedisStreamSettings};
pub use service::{BrokerError, BrokerResult, Delivery, MessageBroker};

#[cfg(test)]
pub use service::MockMessageBroker;
