use clap::{Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check that the Redis server answers
    Ping,

    /// Publish one message to every consumer subscribed to a queue
    Publish {
        queue: String,
        message: String,

        /// Seconds the payload stays readable (defaults to the namespace TTL)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Register a consumer on a queue so it starts receiving messages
    Subscribe { queue: String, consumer: String },

    /// Read messages for a consumer and print one per line
    Consume {
        queue: String,
        consumer: String,

        /// Return immediately when no message is waiting
        #[arg(long)]
        no_block: bool,

        /// Seconds to wait for each message; 0 waits forever
        #[arg(long)]
        timeout: Option<u64>,

        /// Number of messages to read; 0 keeps reading until interrupted
        #[arg(long, default_value = "1")]
        count: usize,

        /// Print each message as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Remove a consumer from a queue and delete its undelivered messages
    Unsubscribe { queue: String, consumer: String },

    /// Show the consumers of a queue and their pending message counts
    Status {
        queue: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete every key in the namespace
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}
