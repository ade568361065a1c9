//! Environment configuration helpers
//!
//! Values are read from the process environment (populated from `.env` by
//! the binary). An unset or blank variable means "use the default"; a set
//! but unparsable variable is an error, never silently ignored.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("missing required environment variable {0}")]
    Missing(String),
}

impl ConfigError {
    pub fn invalid(key: &str, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            key: key.to_string(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Raw value; `None` when unset or blank.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse `key` with `FromStr`, falling back to `default` when unset.
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

/// Milliseconds as a `Duration`.
pub fn env_duration_ms(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match env_opt(key) {
        Some(raw) => parse_value::<u64>(key, &raw).map(Duration::from_millis),
        None => Ok(default),
    }
}

/// Milliseconds where `0` disables the limit.
pub fn env_opt_duration_ms(
    key: &str,
    default: Option<Duration>,
) -> Result<Option<Duration>, ConfigError> {
    match env_opt(key) {
        Some(raw) => parse_value::<u64>(key, &raw)
            .map(|ms| (ms > 0).then(|| Duration::from_millis(ms))),
        None => Ok(default),
    }
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn env_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match env_opt(key) {
        Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::invalid(key, raw, "expected a boolean")),
        None => Ok(default),
    }
}

/// Comma-separated list; empty entries are dropped.
pub fn env_list(key: &str) -> Vec<String> {
    env_opt(key)
        .map(|raw| split_list(&raw))
        .unwrap_or_default()
}

pub fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::invalid(key, raw, e))
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<usize>("LIMIT", "5"), Ok(5));
        let err = parse_value::<usize>("LIMIT", "five").unwrap_err();
        assert!(matches!(&err, ConfigError::Invalid { key, .. } if key == "LIMIT"));
        assert!(err.to_string().contains("LIMIT"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("http://localhost:5173, https://app.example ,,"),
            vec!["http://localhost:5173", "https://app.example"]
        );
    }

    #[test]
    fn test_unset_keys_use_defaults() {
        let key = "PLATFORM_CONFIG_TEST_UNSET_KEY";
        assert_eq!(env_opt(key), None);
        assert_eq!(env_parse(key, 7u32), Ok(7));
        assert_eq!(env_duration_ms(key, Duration::from_secs(1)), Ok(Duration::from_secs(1)));
        assert_eq!(env_opt_duration_ms(key, None), Ok(None));
        assert_eq!(env_bool(key, true), Ok(true));
        assert!(env_list(key).is_empty());
    }
}
