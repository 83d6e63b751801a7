//! In-process broker backed by a bounded tokio channel.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::{debug, warn};

use super::service::{BrokerError, BrokerResult, Delivery, MessageBroker};

/// A delivery moved to the dead-letter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub delivery: Delivery,
    pub reason: String,
}

/// Single-process broker with the same delivery contract as the Redis one.
///
/// Received messages are tracked as pending until acked; `nack` puts them
/// back on the queue with the attempt count bumped. Two switches simulate
/// broker trouble: [`MemoryBroker::set_available`] makes sends fail fast and
/// [`MemoryBroker::set_stalled`] makes them hang.
pub struct MemoryBroker {
    sender: mpsc::Sender<Delivery>,
    receiver: AsyncMutex<mpsc::Receiver<Delivery>>,
    pending: DashMap<String, Delivery>,
    dead_letters: Mutex<Vec<DeadLetter>>,
    next_id: AtomicU64,
    available: AtomicBool,
    stalled: AtomicBool,
}

impl MemoryBroker {
    /// Creates a broker holding at most `capacity` queued messages.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Queue bound; a full queue makes `send` wait, which the
    ///   publisher's enqueue timeout turns into a drop. Zero is raised to one.
    ///
    /// # Examples
    ///
    /// ```
    /// use url_shortener_core::infrastructure::broker::MemoryBroker;
    ///
    /// let broker = MemoryBroker::new(1_000);
    /// assert_eq!(broker.queued_count(), 0);
    /// assert_eq!(broker.pending_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        Self {
            sender,
            receiver: AsyncMutex::new(receiver),
            pending: DashMap::new(),
            dead_letters: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
            stalled: AtomicBool::new(false),
        }
    }

    /// Switches the broker on or off.
    ///
    /// While off, `send` fails at once with [`BrokerError::Unavailable`].
    /// Receiving, acking and dead-lettering keep working so consumers can
    /// drain what is already queued.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes every later `send` hang without ever completing.
    ///
    /// Models a broker that accepts connections but stops answering. Callers
    /// only get out through their own timeout.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Messages received but not yet acked or dead-lettered.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Messages waiting to be received.
    pub fn queued_count(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Snapshot of every dead-lettered delivery, oldest first, with the
    /// reason given by the consumer.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().clone()
    }

    /// Requeues every pending delivery, as a restarted consumer would see them.
    pub async fn redeliver_pending(&self) -> BrokerResult<usize> {
        let ids: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut requeued = 0;

        for id in ids {
            if let Some((_, delivery)) = self.pending.remove(&id) {
                self.requeue(delivery).await?;
                requeued += 1;
            }
        }

        Ok(requeued)
    }

    async fn requeue(&self, mut delivery: Delivery) -> BrokerResult<()> {
        delivery.attempt += 1;
        self.sender
            .send(delivery)
            .await
            .map_err(|_| BrokerError::Closed)
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn send(&self, payload: Vec<u8>) -> BrokerResult<()> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(BrokerError::Unavailable(
                "memory broker switched off".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.sender
            .send(Delivery {
                id,
                payload,
                attempt: 1,
            })
            .await
            .map_err(|_| BrokerError::Closed)
    }

    async fn receive(&self, wait: Duration) -> BrokerResult<Option<Delivery>> {
        let mut receiver = self.receiver.lock().await;

        match tokio::time::timeout(wait, receiver.recv()).await {
            Ok(Some(delivery)) => {
                self.pending.insert(delivery.id.clone(), delivery.clone());
                Ok(Some(delivery))
            }
            Ok(None) => Err(BrokerError::Closed),
            Err(_) => Ok(None),
        }
    }

    async fn ack(&self, delivery: &Delivery) -> BrokerResult<()> {
        if self.pending.remove(&delivery.id).is_none() {
            debug!(id = %delivery.id, "ack for unknown delivery");
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> BrokerResult<()> {
        match self.pending.remove(&delivery.id) {
            Some((_, pending)) => self.requeue(pending).await,
            None => {
                debug!(id = %delivery.id, "nack for unknown delivery");
                Ok(())
            }
        }
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> BrokerResult<()> {
        self.pending.remove(&delivery.id);
        warn!(id = %delivery.id, attempt = delivery.attempt, reason, "message dead-lettered");

        self.dead_letters.lock().push(DeadLetter {
            delivery: delivery.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.available.load(Ordering::SeqCst) && !self.stalled.load(Ordering::SeqCst)
    }
}
