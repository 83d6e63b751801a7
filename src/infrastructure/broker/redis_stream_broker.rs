//! Redis Streams broker using a consumer group.

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::streams::{
    StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadOptions, StreamReadReply,
};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::service::{BrokerError, BrokerResult, Delivery, MessageBroker};

const PAYLOAD_FIELD: &str = "payload";
const RECLAIM_BATCH: usize = 16;

/// Stream and consumer-group coordinates.
#[derive(Debug, Clone)]
pub struct RedisStreamSettings {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    /// Pending entries idle at least this long are taken over on receive.
    pub claim_idle: Duration,
}

impl RedisStreamSettings {
    pub fn dead_letter_stream(&self) -> String {
        format!("{}:dead", self.stream)
    }
}

/// [`MessageBroker`] over one Redis stream.
///
/// `send` is `XADD`, `receive` is `XREADGROUP` on `>` after first reclaiming
/// entries other consumers left pending for longer than `claim_idle`. An
/// entry stays in the group's pending list until `XACK`, so `nack` only has
/// to leave it there for the idle reclaim to pick it up again.
pub struct RedisStreamBroker {
    writer: ConnectionManager,
    reader: ConnectionManager,
    settings: RedisStreamSettings,
    reclaimed: Mutex<VecDeque<Delivery>>,
}

impl RedisStreamBroker {
    /// Connects and makes sure the consumer group exists.
    ///
    /// Reads use their own connection so a blocking `XREADGROUP` never
    /// delays concurrent sends.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Unavailable`] if Redis cannot be reached or the
    /// group cannot be created.
    pub async fn connect(redis_url: &str, settings: RedisStreamSettings) -> BrokerResult<Self> {
        info!("Connecting to Redis stream broker");

        let client = Client::open(redis_url).map_err(|e| {
            BrokerError::Unavailable(format!("Failed to create Redis client: {}", e))
        })?;

        let writer = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| BrokerError::Unavailable(format!("Failed to connect to Redis: {}", e)))?;
        let reader = ConnectionManager::new(client)
            .await
            .map_err(|e| BrokerError::Unavailable(format!("Failed to connect to Redis: {}", e)))?;

        let broker = Self {
            writer,
            reader,
            settings,
            reclaimed: Mutex::new(VecDeque::new()),
        };
        broker.ensure_group().await?;

        info!(
            "✓ Connected to Redis stream {} (group {}, consumer {})",
            broker.settings.stream, broker.settings.group, broker.settings.consumer
        );

        Ok(broker)
    }

    async fn ensure_group(&self) -> BrokerResult<()> {
        let mut conn = self.writer.clone();

        match conn
            .xgroup_create_mkstream::<_, _, _, ()>(&self.settings.stream, &self.settings.group, "0")
            .await
        {
            Ok(()) => {
                info!("Created consumer group {}", self.settings.group);
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(BrokerError::Unavailable(format!(
                "Failed to create consumer group: {}",
                e
            ))),
        }
    }

    /// Takes over entries whose consumer stopped acknowledging them.
    async fn reclaim_idle(&self) -> BrokerResult<()> {
        let mut conn = self.reader.clone();
        let min_idle = self.settings.claim_idle.as_millis() as usize;

        let pending: StreamPendingCountReply = conn
            .xpending_count(
                &self.settings.stream,
                &self.settings.group,
                "-",
                "+",
                RECLAIM_BATCH,
            )
            .await
            .map_err(operation_error)?;

        let idle: Vec<_> = pending
            .ids
            .into_iter()
            .filter(|p| p.last_delivered_ms >= min_idle)
            .collect();

        if idle.is_empty() {
            return Ok(());
        }

        let ids: Vec<&str> = idle.iter().map(|p| p.id.as_str()).collect();
        let claimed: StreamClaimReply = conn
            .xclaim(
                &self.settings.stream,
                &self.settings.group,
                &self.settings.consumer,
                min_idle,
                &ids,
            )
            .await
            .map_err(operation_error)?;

        let mut claimed_deliveries = Vec::with_capacity(claimed.ids.len());
        for entry in claimed.ids {
            let previous = idle
                .iter()
                .find(|p| p.id == entry.id)
                .map_or(1, |p| p.times_delivered as u32);

            let delivery = to_delivery(entry, previous + 1);
            debug!(id = %delivery.id, attempt = delivery.attempt, "reclaimed idle entry");
            claimed_deliveries.push(delivery);
        }

        self.reclaimed.lock().extend(claimed_deliveries);
        Ok(())
    }
}

fn operation_error(e: redis::RedisError) -> BrokerError {
    if e.is_connection_dropped() || e.is_io_error() || e.is_timeout() {
        BrokerError::Unavailable(e.to_string())
    } else {
        BrokerError::OperationError(e.to_string())
    }
}

/// Converts a stream entry into a [`Delivery`].
///
/// An entry without a payload still becomes a delivery, with an empty
/// payload. The consumer cannot decode it and dead-letters it, which acks
/// the entry instead of leaving it in the pending list for good.
fn to_delivery(entry: StreamId, attempt: u32) -> Delivery {
    let payload: Vec<u8> = entry.get(PAYLOAD_FIELD).unwrap_or_else(|| {
        warn!(id = %entry.id, "stream entry without payload");
        Vec::new()
    });

    Delivery {
        id: entry.id,
        payload,
        attempt,
    }
}

#[async_trait]
impl MessageBroker for RedisStreamBroker {
    async fn send(&self, payload: Vec<u8>) -> BrokerResult<()> {
        let mut conn = self.writer.clone();

        conn.xadd::<_, _, _, _, String>(&self.settings.stream, "*", &[(PAYLOAD_FIELD, payload)])
            .await
            .map_err(operation_error)?;

        Ok(())
    }

    async fn receive(&self, wait: Duration) -> BrokerResult<Option<Delivery>> {
        let reclaimed = self.reclaimed.lock().pop_front();
        if reclaimed.is_some() {
            return Ok(reclaimed);
        }

        self.reclaim_idle().await?;
        let reclaimed = self.reclaimed.lock().pop_front();
        if reclaimed.is_some() {
            return Ok(reclaimed);
        }

        let options = StreamReadOptions::default()
            .group(&self.settings.group, &self.settings.consumer)
            .count(1)
            .block(wait.as_millis().max(1) as usize);

        let mut conn = self.reader.clone();
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.settings.stream], &[">"], &options)
            .await
            .map_err(operation_error)?;

        let entry = reply
            .into_iter()
            .flat_map(|r| r.keys)
            .flat_map(|k| k.ids)
            .next();

        Ok(entry.map(|entry| to_delivery(entry, 1)))
    }

    async fn ack(&self, delivery: &Delivery) -> BrokerResult<()> {
        let mut conn = self.writer.clone();

        conn.xack::<_, _, _, i64>(&self.settings.stream, &self.settings.group, &[&delivery.id])
            .await
            .map_err(operation_error)?;

        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> BrokerResult<()> {
        debug!(
            id = %delivery.id,
            "left pending, redelivered after {:?} idle",
            self.settings.claim_idle
        );
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> BrokerResult<()> {
        let mut conn = self.writer.clone();
        let attempt = delivery.attempt.to_string();

        conn.xadd::<_, _, _, _, String>(
            self.settings.dead_letter_stream(),
            "*",
            &[
                (PAYLOAD_FIELD, delivery.payload.as_slice()),
                ("source_id", delivery.id.as_bytes()),
                ("attempt", attempt.as_bytes()),
                ("reason", reason.as_bytes()),
            ],
        )
        .await
        .map_err(operation_error)?;

        self.ack(delivery).await
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.writer.clone();
        conn.ping::<()>().await.is_ok()
    }
}
