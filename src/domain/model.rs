use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// Namespace-wide sequential message id, allocated by `INCR <ns>.nextid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(MessageId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub queue: String,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn payload_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub id: MessageId,
    /// Number of consumer lists the id was pushed to.
    pub recipients: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeMode {
    /// Wait for a message. `None` waits indefinitely.
    Blocking { timeout: Option<Duration> },
    /// Return immediately when the consumer's list is empty.
    NonBlocking,
}

impl Default for ConsumeMode {
    fn default() -> Self {
        ConsumeMode::Blocking { timeout: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerBacklog {
    pub consumer: String,
    pub pending: u64,
}
