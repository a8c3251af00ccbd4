use crate::domain::ports::MessageStore;
use crate::utils::error::{Result, RpsError};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::redis_store::ttl_seconds;

#[derive(Debug)]
enum Value {
    Str {
        data: Vec<u8>,
        expires_at: Option<Instant>,
    },
    Set(BTreeSet<String>),
    List(VecDeque<String>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str { .. } => "string",
            Value::Set(_) => "set",
            Value::List(_) => "list",
        }
    }
}

/// In-process `MessageStore` with Redis semantics: string TTLs, sets,
/// lists and blocking pops. Expiry follows the tokio clock, so tests can
/// drive it with `tokio::time::pause`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    pushed: Notify,
}

fn wrong_type(key: &str, found: &Value) -> RpsError {
    RpsError::store(format!(
        "WRONGTYPE operation against key '{}' holding a {}",
        key,
        found.type_name()
    ))
}

/// Drops `key` if it is a string whose TTL has passed.
fn purge_expired(entries: &mut HashMap<String, Value>, key: &str) {
    let expired = matches!(
        entries.get(key),
        Some(Value::Str { expires_at: Some(at), .. }) if *at <= Instant::now()
    );
    if expired {
        entries.remove(key);
    }
}

/// Translates a Redis glob (`*`, `?`, `[...]`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    if c == '\\' || c == '[' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push(']');
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');

    Regex::new(&out).map_err(|e| RpsError::store(format!("invalid pattern '{}': {}", pattern, e)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        let popped = match entries.get_mut(key) {
            None => return Ok(None),
            Some(Value::List(list)) => list.pop_front(),
            Some(other) => return Err(wrong_type(key, other)),
        };
        // 與 Redis 相同：空 list 直接刪除 key
        if matches!(entries.get(key), Some(Value::List(list)) if list.is_empty()) {
            entries.remove(key);
        }
        Ok(popped)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key);

        let entry = entries.entry(key.to_string()).or_insert_with(|| Value::Str {
            data: b"0".to_vec(),
            expires_at: None,
        });
        match entry {
            Value::Str { data, .. } => {
                let current: u64 = std::str::from_utf8(data)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| {
                        RpsError::store(format!("value of '{}' is not an integer", key))
                    })?;
                let next = current.checked_add(1).ok_or_else(|| {
                    RpsError::store(format!("increment of '{}' would overflow", key))
                })?;
                *data = next.to_string().into_bytes();
                Ok(next)
            }
            other => Err(wrong_type(key, other)),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let seconds = ttl_seconds(ttl)?;
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(seconds))
            .ok_or_else(|| RpsError::store(format!("invalid expire time in SETEX for '{}'", key)))?;

        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Value::Str {
                data: value.to_vec(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, key);

        match entries.get(key) {
            None => Ok(None),
            Some(Value::Str { data, .. }) => Ok(Some(data.clone())),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(BTreeSet::new()))
        {
            Value::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            other => Err(wrong_type(key, other)),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let now_empty = match entries.get_mut(key) {
            None => return Ok(()),
            Some(Value::Set(set)) => {
                set.remove(member);
                set.is_empty()
            }
            Some(other) => return Err(wrong_type(key, other)),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut entries = self.entries.lock().await;
            match entries
                .entry(key.to_string())
                .or_insert_with(|| Value::List(VecDeque::new()))
            {
                Value::List(list) => list.push_back(value.to_string()),
                other => return Err(wrong_type(key, other)),
            }
        }
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        self.pop_front(key).await
    }

    async fn blpop(&self, key: &str, timeout: Option<Duration>) -> Result<Option<String>> {
        // 超出時鐘範圍的逾時視為無限等待
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            // notified() 必須在檢查之前建立，否則會漏掉這段期間的 push
            let notified = self.pushed.notified();

            if let Some(value) = self.pop_front(key).await? {
                return Ok(Some(value));
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(None);
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len() as u64),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let mut deleted = 0;
        for key in keys {
            purge_expired(&mut entries, key);
            if entries.remove(key).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = glob_to_regex(pattern)?;
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, value| {
            !matches!(value, Value::Str { expires_at: Some(at), .. } if *at <= now)
        });

        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
