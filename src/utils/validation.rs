use crate::utils::error::{Result, RpsError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

// 反斜線是 glob 的跳脫字元，`shop\` 的 pattern 會變成 `shop.*`
const GLOB_CHARS: [char; 5] = ['*', '?', '[', ']', '\\'];

pub fn validate_redis_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(RpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "redis" | "rediss" => {
                if url.host_str().map_or(true, str::is_empty) {
                    return Err(RpsError::InvalidConfigValueError {
                        field: field_name.to_string(),
                        value: url_str.to_string(),
                        reason: "URL has no host".to_string(),
                    });
                }
                Ok(())
            }
            "redis+unix" | "unix" => Ok(()),
            scheme => Err(RpsError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(RpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(RpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| RpsError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(RpsError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// A namespace prefixes every key, so `shop` must not be able to see (or
/// purge) the keys of `shop.eu`.
pub fn validate_namespace(value: &str) -> Result<()> {
    validate_key_segment("namespace", value)
}

/// Checks a name that becomes a single dot-separated key segment.
pub fn validate_key_segment(kind: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        Some("must not be empty".to_string())
    } else if value.chars().any(char::is_whitespace) {
        Some("must not contain whitespace".to_string())
    } else if let Some(c) = value.chars().find(|c| GLOB_CHARS.contains(c)) {
        Some(format!("must not contain '{}'", c))
    } else if value.contains('.') {
        Some("must not contain '.'".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RpsError::InvalidName {
            kind,
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
