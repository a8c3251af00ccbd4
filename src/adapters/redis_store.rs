use crate::domain::ports::MessageStore;
use crate::utils::error::{Result, RpsError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::time::Duration;
use tokio::sync::Mutex;

/// Idle connections kept around for blocking pops.
const MAX_IDLE_BLOCKING: usize = 4;
const SCAN_BATCH: usize = 200;

/// `MessageStore` backed by a Redis server.
///
/// Regular commands share one multiplexed connection. `BLPOP` holds its
/// connection until a message arrives, so each blocking pop checks out a
/// dedicated connection from a small idle pool instead.
pub struct RedisStore {
    client: Client,
    connection: MultiplexedConnection,
    blocking: Mutex<Vec<MultiplexedConnection>>,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        tracing::debug!("Connected to Redis at {}", redact_url(url));

        Ok(Self {
            client,
            connection,
            blocking: Mutex::new(Vec::new()),
        })
    }

    fn con(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    async fn checkout_blocking(&self) -> Result<MultiplexedConnection> {
        if let Some(con) = self.blocking.lock().await.pop() {
            return Ok(con);
        }
        tracing::debug!("Opening dedicated connection for blocking pop");
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn checkin_blocking(&self, con: MultiplexedConnection) {
        let mut idle = self.blocking.lock().await;
        if idle.len() < MAX_IDLE_BLOCKING {
            idle.push(con);
        }
    }
}

#[async_trait]
impl MessageStore for RedisStore {
    async fn ping(&self) -> Result<()> {
        let reply: String = redis::cmd("PING").query_async(&mut self.con()).await?;
        if reply != "PONG" {
            return Err(RpsError::store(format!("unexpected PING reply: {}", reply)));
        }
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        let value: u64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut self.con())
            .await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let seconds = ttl_seconds(ttl)?;
        let _: () = redis::cmd("SETEX")
            .arg(key)
            .arg(seconds)
            .arg(value)
            .query_async(&mut self.con())
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.con())
            .await?;
        Ok(value)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let _: i64 = redis::cmd("SADD")
            .arg(key)
            .arg(member)
            .query_async(&mut self.con())
            .await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let _: i64 = redis::cmd("SREM")
            .arg(key)
            .arg(member)
            .query_async(&mut self.con())
            .await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut self.con())
            .await?;
        Ok(members)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let _: i64 = redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut self.con())
            .await?;
        Ok(())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = redis::cmd("LPOP")
            .arg(key)
            .query_async(&mut self.con())
            .await?;
        Ok(value)
    }

    async fn blpop(&self, key: &str, timeout: Option<Duration>) -> Result<Option<String>> {
        // BLPOP 0 等於無限等待，零逾時要改成非阻塞
        let seconds = match timeout {
            Some(t) if t.is_zero() => return self.lpop(key).await,
            Some(t) => blpop_timeout_secs(t),
            None => 0.0,
        };

        let mut con = self.checkout_blocking().await?;
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(key)
            .arg(seconds)
            .query_async(&mut con)
            .await?;
        self.checkin_blocking(con).await;

        Ok(popped.map(|(_, value)| value))
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let len: u64 = redis::cmd("LLEN")
            .arg(key)
            .query_async(&mut self.con())
            .await?;
        Ok(len)
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let deleted: u64 = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut self.con())
            .await?;
        Ok(deleted)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut con = self.con();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut con)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN 可能重複回傳同一個 key
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

/// Whole seconds for `SETEX`, rounding partial seconds up.
pub(crate) fn ttl_seconds(ttl: Duration) -> Result<u64> {
    let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    if seconds == 0 {
        return Err(RpsError::InvalidConfigValueError {
            field: "ttl".to_string(),
            value: format!("{:?}", ttl),
            reason: "TTL must be at least one second".to_string(),
        });
    }
    Ok(seconds)
}

/// Seconds for `BLPOP`, rounded up to whole milliseconds. Redis truncates
/// anything below 1 ms to 0, which would block forever.
pub(crate) fn blpop_timeout_secs(timeout: Duration) -> f64 {
    let millis = timeout.as_nanos().div_ceil(1_000_000);
    millis as f64 / 1000.0
}

/// Hides the password of a connection URL before it reaches the logs.
pub fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
