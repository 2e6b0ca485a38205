use serde::{Deserialize, Serialize};

/// Main configuration structure for Veritor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Model identifier used for generation
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Maximum rewrite iterations per thread (copied into each thread at
    /// creation time)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Minutes before a thread awaiting user input is considered stale
    #[serde(default = "default_awaiting_input_timeout_minutes")]
    pub awaiting_input_timeout_minutes: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_model_id() -> String {
    "anthropic.claude-3-5-haiku-20241022-v1:0".to_string()
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_awaiting_input_timeout_minutes() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            max_iterations: default_max_iterations(),
            awaiting_input_timeout_minutes: default_awaiting_input_timeout_minutes(),
            logging: LoggingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Retry policy configuration for collaborator calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.awaiting_input_timeout_minutes, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.retry.initial_backoff_ms <= config.retry.max_backoff_ms);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"max_iterations": 2}"#).unwrap();
        assert_eq!(config.max_iterations, 2);
        assert_eq!(config.model_id, default_model_id());
        assert_eq!(config.retry.max_retries, 3);
    }
}
