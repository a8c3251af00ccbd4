pub mod pubsub;
pub mod subscription;

pub use crate::domain::model::{ConsumeMode, Message, MessageId, PublishReceipt};
pub use crate::domain::ports::{ConfigProvider, MessageStore};
pub use crate::utils::error::Result;
