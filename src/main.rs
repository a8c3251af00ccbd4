use clap::Parser;
use rrps::config::cli::{Command, LogFormat};
use rrps::utils::error::ErrorSeverity;
use rrps::utils::logger;
use rrps::{
    CliConfig, ConfigProvider, ConsumeMode, Message, RedisStore, ReliablePubSub, RpsError,
    Settings,
};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    match config.log_format {
        LogFormat::Compact => logger::init_cli_logger(config.verbose),
        LogFormat::Json => logger::init_json_logger(config.verbose),
    }

    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(config: CliConfig) -> Result<(), RpsError> {
    let settings = Settings::from_cli(&config)?;
    tracing::debug!("Effective settings: {:?}", settings);

    let store = RedisStore::connect(&settings.redis_url()).await?;
    let pubsub = ReliablePubSub::from_config(store, &settings)?;

    match config.command {
        Command::Ping => {
            pubsub.ping().await?;
            println!("PONG");
        }

        Command::Publish {
            queue,
            message,
            ttl,
        } => {
            let ttl = ttl.map(Duration::from_secs).unwrap_or(pubsub.default_ttl());
            let receipt = pubsub.publish(&queue, message.as_bytes(), ttl).await?;
            if receipt.recipients == 0 {
                tracing::warn!(
                    "⚠️ Queue '{}' has no consumers, message {} will not be delivered",
                    queue,
                    receipt.id
                );
            }
            tracing::info!(
                "📤 Published message {} to '{}' ({} consumers)",
                receipt.id,
                queue,
                receipt.recipients
            );
            println!("{}", receipt.id);
        }

        Command::Subscribe { queue, consumer } => {
            pubsub.subscribe(&queue, &consumer).await?;
            println!("✅ '{}' subscribed to '{}'", consumer, queue);
        }

        Command::Consume {
            queue,
            consumer,
            no_block,
            timeout,
            count,
            json,
        } => {
            let mode = if no_block {
                ConsumeMode::NonBlocking
            } else if let Some(secs) = timeout {
                ConsumeMode::Blocking {
                    timeout: (secs > 0).then(|| Duration::from_secs(secs)),
                }
            } else {
                settings.consume_mode
            };

            let subscription = pubsub.subscribe(&queue, &consumer).await?;
            tracing::info!("📥 Consuming '{}' as '{}' ({:?})", queue, consumer, mode);

            let mut received = 0usize;
            while count == 0 || received < count {
                let next = tokio::select! {
                    result = subscription.consume(mode) => result?,
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupted after {} messages", received);
                        break;
                    }
                };

                let Some(message) = next else {
                    tracing::info!("No message available for '{}'", consumer);
                    break;
                };
                print_message(&message, json);
                received += 1;
            }
        }

        Command::Unsubscribe { queue, consumer } => {
            pubsub.unsubscribe(&queue, &consumer).await?;
            println!("✅ '{}' unsubscribed from '{}'", consumer, queue);
        }

        Command::Status { queue, json } => {
            let status = pubsub.queue_status(&queue).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else if status.is_empty() {
                println!("Queue '{}' has no consumers", queue);
            } else {
                println!("{:<32} {:>10}", "CONSUMER", "PENDING");
                for entry in &status {
                    println!("{:<32} {:>10}", entry.consumer, entry.pending);
                }
            }
        }

        Command::Purge { yes } => {
            if !yes {
                return Err(RpsError::ConfigError {
                    message: format!(
                        "refusing to purge namespace '{}' without --yes",
                        pubsub.namespace()
                    ),
                });
            }
            let deleted = pubsub.purge().await?;
            println!("🧹 Deleted {} keys from '{}'", deleted, pubsub.namespace());
        }
    }

    Ok(())
}

fn print_message(message: &Message, json: bool) {
    if json {
        let value = serde_json::json!({
            "id": message.id,
            "queue": message.queue,
            "payload": message.payload_str(),
        });
        println!("{}", value);
    } else {
        println!("{}", message.payload_str());
    }
}
