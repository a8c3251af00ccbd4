#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::pubsub::DEFAULT_TTL;
use crate::core::{ConfigProvider, ConsumeMode};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_namespace, validate_positive_number, validate_redis_url, Validate,
};
use std::time::Duration;
use toml_config::{RedisConfig, TomlConfig};

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_NAMESPACE: &str = "rrps";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "rrps")]
#[command(about = "Reliable publish/subscribe message delivery over Redis")]
pub struct CliConfig {
    /// Redis connection URL [default: redis://127.0.0.1:6379/0]
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    /// Namespace holding all keys [default: rrps]
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Default message TTL in seconds [default: 3600]
    #[arg(long, global = true)]
    pub default_ttl: Option<u64>,

    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = cli::LogFormat::Compact)]
    pub log_format: cli::LogFormat,

    #[command(subcommand)]
    pub command: cli::Command,
}

/// Effective settings: command line flags over the TOML file over defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub redis_url: String,
    pub namespace: String,
    pub default_ttl: Duration,
    pub consume_mode: ConsumeMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: RedisConfig::default().url(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl: DEFAULT_TTL,
            consume_mode: ConsumeMode::default(),
        }
    }
}

impl Settings {
    pub fn merge(
        file: Option<&TomlConfig>,
        redis_url: Option<&str>,
        namespace: Option<&str>,
        default_ttl: Option<u64>,
    ) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(file) = file {
            file.validate_redis()?;
            settings.redis_url = file.redis_url();
            if let Some(name) = &file.namespace.name {
                settings.namespace = name.clone();
            }
            if let Some(ttl) = file.namespace.default_ttl_seconds {
                validate_positive_number("namespace.default_ttl_seconds", ttl, 1)?;
                settings.default_ttl = Duration::from_secs(ttl);
            }
            settings.consume_mode = file.consume_mode();
        }

        if let Some(url) = redis_url {
            settings.redis_url = url.to_string();
        }
        if let Some(name) = namespace {
            settings.namespace = name.to_string();
        }
        if let Some(ttl) = default_ttl {
            validate_positive_number("--default-ttl", ttl, 1)?;
            settings.default_ttl = Duration::from_secs(ttl);
        }

        settings.validate()?;
        Ok(settings)
    }

    #[cfg(feature = "cli")]
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path);
                Some(TomlConfig::from_file(path)?)
            }
            None => None,
        };

        Self::merge(
            file.as_ref(),
            cli.redis_url.as_deref(),
            cli.namespace.as_deref(),
            cli.default_ttl,
        )
    }
}

impl ConfigProvider for Settings {
    fn redis_url(&self) -> String {
        self.redis_url.clone()
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_redis_url("redis_url", &self.redis_url)?;
        validate_namespace(&self.namespace)
    }
}
