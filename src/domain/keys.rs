use crate::domain::model::MessageId;
use crate::utils::error::Result;
use crate::utils::validation::{validate_key_segment, validate_namespace};

/// Builds the Redis keys of one namespace:
///
/// ```text
/// <ns>.nextid                       INT   sequential message id counter
/// <ns>.<queue>.consumers            SET   consumers subscribed to the queue
/// <ns>.<queue>.messages.<id>        STR   payload of one message
/// <ns>.<queue>.<consumer>.messages  LIST  pending ids of one consumer
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    namespace: String,
}

impl Keyspace {
    pub fn new(namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn next_id(&self) -> String {
        format!("{}.nextid", self.namespace)
    }

    pub fn consumers(&self, queue: &str) -> String {
        format!("{}.{}.consumers", self.namespace, queue)
    }

    pub fn message(&self, queue: &str, id: MessageId) -> String {
        format!("{}.{}.messages.{}", self.namespace, queue, id)
    }

    pub fn pending(&self, queue: &str, consumer: &str) -> String {
        format!("{}.{}.{}.messages", self.namespace, queue, consumer)
    }

    /// Glob matching every key of the namespace.
    pub fn pattern(&self) -> String {
        format!("{}.*", self.namespace)
    }

    pub fn check_queue(queue: &str) -> Result<()> {
        validate_key_segment("queue", queue)
    }

    pub fn check_consumer(consumer: &str) -> Result<()> {
        validate_key_segment("consumer", consumer)
    }
}
