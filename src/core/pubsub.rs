use crate::core::subscription::Subscription;
use crate::domain::keys::Keyspace;
use crate::domain::model::{ConsumerBacklog, MessageId, PublishReceipt};
use crate::domain::ports::{ConfigProvider, MessageStore};
use crate::utils::error::{Result, RpsError};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Publish/subscribe over a `MessageStore` with per-consumer delivery lists.
///
/// `publish` stores the payload once under a fresh id and pushes that id to
/// the list of every consumer subscribed at that moment. Consumers sharing
/// an id share a list, so each message reaches one of them; distinct ids
/// each get their own copy.
pub struct ReliablePubSub<S: MessageStore> {
    pub(crate) store: Arc<S>,
    pub(crate) keys: Keyspace,
    default_ttl: Duration,
}

impl<S: MessageStore> Clone for ReliablePubSub<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            default_ttl: self.default_ttl,
        }
    }
}

impl<S: MessageStore> ReliablePubSub<S> {
    pub fn new(store: S, namespace: &str) -> Result<Self> {
        Ok(Self::with_keyspace(Arc::new(store), Keyspace::new(namespace)?))
    }

    /// Namespace and default TTL taken from any configuration source.
    pub fn from_config<C: ConfigProvider>(store: S, config: &C) -> Result<Self> {
        Ok(Self::new(store, config.namespace())?.with_default_ttl(config.default_ttl()))
    }

    /// Shares one store between several namespaces.
    pub fn with_keyspace(store: Arc<S>, keys: Keyspace) -> Self {
        Self {
            store,
            keys,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Registers `consumer` on `queue`. Subscribing again is a no-op apart
    /// from returning a new handle onto the same delivery list.
    pub async fn subscribe(&self, queue: &str, consumer: &str) -> Result<Subscription<S>> {
        Keyspace::check_queue(queue)?;
        Keyspace::check_consumer(consumer)?;

        self.store
            .sadd(&self.keys.consumers(queue), consumer)
            .await?;
        tracing::debug!(
            "Consumer '{}' subscribed to '{}.{}'",
            consumer,
            self.namespace(),
            queue
        );

        Ok(Subscription::new(
            self.clone(),
            queue.to_string(),
            consumer.to_string(),
        ))
    }

    /// Unsubscribes without holding a handle. See
    /// [`Subscription::unsubscribe`].
    pub async fn unsubscribe(&self, queue: &str, consumer: &str) -> Result<()> {
        Keyspace::check_queue(queue)?;
        Keyspace::check_consumer(consumer)?;
        Subscription::new(self.clone(), queue.to_string(), consumer.to_string())
            .unsubscribe()
            .await
    }

    pub async fn publish_default(&self, queue: &str, payload: &[u8]) -> Result<PublishReceipt> {
        self.publish(queue, payload, self.default_ttl).await
    }

    pub async fn publish(
        &self,
        queue: &str,
        payload: &[u8],
        ttl: Duration,
    ) -> Result<PublishReceipt> {
        Keyspace::check_queue(queue)?;
        if ttl.is_zero() {
            return Err(RpsError::ConfigError {
                message: "message TTL must be greater than zero".to_string(),
            });
        }

        let id = MessageId(self.store.incr(&self.keys.next_id()).await?);
        self.store
            .set_ex(&self.keys.message(queue, id), payload, ttl)
            .await?;

        // 只有目前已訂閱的 consumer 會收到這則訊息
        let consumers = self.store.smembers(&self.keys.consumers(queue)).await?;
        let id_value = id.to_string();
        for consumer in &consumers {
            self.store
                .rpush(&self.keys.pending(queue, consumer), &id_value)
                .await?;
        }

        tracing::debug!(
            "Published message {} to '{}' ({} bytes, {} consumers)",
            id,
            queue,
            payload.len(),
            consumers.len()
        );

        Ok(PublishReceipt {
            id,
            recipients: consumers.len(),
        })
    }

    pub async fn consumers(&self, queue: &str) -> Result<Vec<String>> {
        Keyspace::check_queue(queue)?;
        let mut consumers = self.store.smembers(&self.keys.consumers(queue)).await?;
        consumers.sort();
        Ok(consumers)
    }

    /// Pending ids waiting in one consumer's list. Ids of expired messages
    /// are counted until a consume skips them.
    pub async fn backlog(&self, queue: &str, consumer: &str) -> Result<u64> {
        Keyspace::check_queue(queue)?;
        Keyspace::check_consumer(consumer)?;
        self.store.llen(&self.keys.pending(queue, consumer)).await
    }

    pub async fn queue_status(&self, queue: &str) -> Result<Vec<ConsumerBacklog>> {
        let mut status = Vec::new();
        for consumer in self.consumers(queue).await? {
            let pending = self.backlog(queue, &consumer).await?;
            status.push(ConsumerBacklog { consumer, pending });
        }
        Ok(status)
    }

    /// Deletes every key of the namespace, including the id counter.
    pub async fn purge(&self) -> Result<u64> {
        let keys = self.store.scan_keys(&self.keys.pattern()).await?;
        let deleted = self.store.del(&keys).await?;
        tracing::info!(
            "Purged {} keys from namespace '{}'",
            deleted,
            self.namespace()
        );
        Ok(deleted)
    }
}
