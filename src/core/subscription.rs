use crate::core::pubsub::ReliablePubSub;
use crate::domain::model::{ConsumeMode, Message, MessageId};
use crate::domain::ports::MessageStore;
use crate::utils::error::{Result, RpsError};
use std::time::Duration;

/// Handle on one consumer's delivery list. Created by
/// [`ReliablePubSub::subscribe`].
pub struct Subscription<S: MessageStore> {
    pubsub: ReliablePubSub<S>,
    queue: String,
    consumer: String,
}

impl<S: MessageStore> Subscription<S> {
    pub(crate) fn new(pubsub: ReliablePubSub<S>, queue: String, consumer: String) -> Self {
        Self {
            pubsub,
            queue,
            consumer,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Waits for the next message. Ids whose payload already expired are
    /// dropped and the pop is retried, so `Some` always carries a payload.
    pub async fn consume(&self, mode: ConsumeMode) -> Result<Option<Message>> {
        let store = &self.pubsub.store;
        let keys = &self.pubsub.keys;
        let pending = keys.pending(&self.queue, &self.consumer);

        loop {
            let popped = match mode {
                ConsumeMode::Blocking { timeout } => store.blpop(&pending, timeout).await?,
                ConsumeMode::NonBlocking => store.lpop(&pending).await?,
            };

            let Some(raw) = popped else {
                return Ok(None);
            };

            // 損壞的項目已經被 pop 掉，下一次 consume 不會再遇到
            let id: MessageId = raw.parse().map_err(|_| {
                tracing::warn!("Dropped corrupt entry {:?} from '{}'", raw, pending);
                RpsError::CorruptEntry {
                    key: pending.clone(),
                    value: raw.clone(),
                }
            })?;

            match store.get(&keys.message(&self.queue, id)).await? {
                Some(payload) => {
                    return Ok(Some(Message {
                        id,
                        queue: self.queue.clone(),
                        payload,
                    }));
                }
                None => {
                    tracing::debug!(
                        "Skipping expired message {} for '{}' on '{}'",
                        id,
                        self.consumer,
                        self.queue
                    );
                }
            }
        }
    }

    pub async fn try_consume(&self) -> Result<Option<Message>> {
        self.consume(ConsumeMode::NonBlocking).await
    }

    pub async fn consume_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        self.consume(ConsumeMode::Blocking {
            timeout: Some(timeout),
        })
        .await
    }

    /// Pending ids in this consumer's list.
    pub async fn backlog(&self) -> Result<u64> {
        self.pubsub.backlog(&self.queue, &self.consumer).await
    }

    /// Removes the consumer from the queue and deletes its delivery list.
    /// Every process sharing this consumer id loses the undelivered
    /// messages, so persistent or shared consumers should just drop the
    /// handle instead.
    pub async fn unsubscribe(self) -> Result<()> {
        let keys = &self.pubsub.keys;
        let store = &self.pubsub.store;

        store
            .srem(&keys.consumers(&self.queue), &self.consumer)
            .await?;
        store
            .del(&[keys.pending(&self.queue, &self.consumer)])
            .await?;

        tracing::debug!(
            "Consumer '{}' unsubscribed from '{}'",
            self.consumer,
            self.queue
        );
        Ok(())
    }
}
