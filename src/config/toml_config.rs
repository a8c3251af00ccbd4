use crate::core::pubsub::DEFAULT_TTL;
use crate::core::{ConfigProvider, ConsumeMode};
use crate::utils::error::{Result, RpsError};
use crate::utils::validation::{
    validate_namespace, validate_non_empty_string, validate_positive_number, validate_range,
    validate_redis_url, validate_required_field, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub namespace: NamespaceConfig,
    pub consumer: Option<ConsumerConfig>,
}

/// Either a full `url`, or `host`/`port`/`db` parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub name: Option<String>,
    pub default_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub block: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "redis://{}:{}/{}",
            self.host.as_deref().unwrap_or(DEFAULT_REDIS_HOST),
            self.port.unwrap_or(DEFAULT_REDIS_PORT),
            self.db.unwrap_or(0)
        )
    }
}

impl ConsumerConfig {
    /// `timeout_seconds = 0` (or unset) blocks indefinitely.
    pub fn consume_mode(&self) -> ConsumeMode {
        if !self.block.unwrap_or(true) {
            return ConsumeMode::NonBlocking;
        }
        let timeout = self
            .timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        ConsumeMode::Blocking { timeout }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RpsError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RpsError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${REDIS_PASSWORD})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RpsError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        self.validate_redis()?;

        let name = validate_required_field("namespace.name", &self.namespace.name)?;
        validate_namespace(name)?;

        if let Some(ttl) = self.namespace.default_ttl_seconds {
            validate_positive_number("namespace.default_ttl_seconds", ttl, 1)?;
        }

        Ok(())
    }

    /// Checks the `[redis]` section alone; the namespace may still come
    /// from the command line.
    pub fn validate_redis(&self) -> Result<()> {
        if self.redis.url.is_some() && (self.redis.host.is_some() || self.redis.port.is_some()) {
            return Err(RpsError::ConfigError {
                message: "redis.url cannot be combined with redis.host / redis.port".to_string(),
            });
        }
        if let Some(host) = &self.redis.host {
            validate_non_empty_string("redis.host", host)?;
        }
        if let Some(port) = self.redis.port {
            validate_range("redis.port", port, 1, u16::MAX)?;
        }
        validate_redis_url("redis.url", &self.redis.url())
    }

    pub fn consume_mode(&self) -> ConsumeMode {
        self.consumer
            .as_ref()
            .map(ConsumerConfig::consume_mode)
            .unwrap_or_default()
    }
}

impl ConfigProvider for TomlConfig {
    fn redis_url(&self) -> String {
        self.redis.url()
    }

    fn namespace(&self) -> &str {
        self.namespace.name.as_deref().unwrap_or_default()
    }

    fn default_ttl(&self) -> Duration {
        self.namespace
            .default_ttl_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
