use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpsError {
    #[error("Redis command failed: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid {kind} name '{value}': {reason}")]
    InvalidName {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("Corrupt entry in {key}: {value:?} is not a message id")]
    CorruptEntry { key: String, value: String },

    #[error("Store error: {message}")]
    StoreError { message: String },
}

pub type Result<T> = std::result::Result<T, RpsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RpsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RpsError::RedisError(_) => ErrorCategory::Connection,
            RpsError::IoError(_) => ErrorCategory::System,
            RpsError::ConfigError { .. }
            | RpsError::MissingConfigError { .. }
            | RpsError::InvalidConfigValueError { .. }
            | RpsError::InvalidName { .. } => ErrorCategory::Configuration,
            RpsError::CorruptEntry { .. }
            | RpsError::StoreError { .. }
            | RpsError::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 連線問題通常重試即可
            RpsError::RedisError(e) if e.is_connection_refusal() || e.is_timeout() => {
                ErrorSeverity::Medium
            }
            RpsError::RedisError(e) if e.is_io_error() || e.is_connection_dropped() => {
                ErrorSeverity::Medium
            }
            RpsError::RedisError(_) => ErrorSeverity::High,
            RpsError::CorruptEntry { .. } => ErrorSeverity::Low,
            RpsError::ConfigError { .. }
            | RpsError::MissingConfigError { .. }
            | RpsError::InvalidConfigValueError { .. }
            | RpsError::InvalidName { .. }
            | RpsError::StoreError { .. }
            | RpsError::SerializationError(_) => ErrorSeverity::High,
            RpsError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Connection => {
                "Check that the Redis server is running and that --redis-url points to it"
            }
            ErrorCategory::Configuration => {
                "Check the command line arguments and the TOML configuration file"
            }
            ErrorCategory::Data => {
                "Inspect the namespace keys; `rrps purge --yes` resets a broken namespace"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RpsError::RedisError(e) if e.is_connection_refusal() => {
                "Cannot connect to the Redis server".to_string()
            }
            RpsError::RedisError(e) => format!("Redis reported an error: {}", e),
            RpsError::MissingConfigError { field } => {
                format!("Required setting '{}' is missing", field)
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        RpsError::StoreError {
            message: message.into(),
        }
    }
}
