pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{MemoryStore, RedisStore};
pub use config::{toml_config::TomlConfig, Settings};
pub use core::{pubsub::ReliablePubSub, subscription::Subscription};
pub use domain::keys::Keyspace;
pub use domain::model::{ConsumeMode, Message, MessageId, PublishReceipt};
pub use domain::ports::{ConfigProvider, MessageStore};
pub use utils::error::{Result, RpsError};
