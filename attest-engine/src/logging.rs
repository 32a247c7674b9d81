//! Logging utilities and configuration for the attest engine.
//!
//! The engine logs through `tracing`; this module provides a configuration
//! knob set for performance-sensitive deployments and a convenience
//! initializer for binaries and tests.

use tracing::Level;

/// Logging configuration for the engine.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for engine components
    pub base_level: Level,
    /// Whether to log per-case execution details
    pub log_case_details: bool,
    /// Whether to log backend operations (queries, sampling)
    pub log_backend_operations: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_case_details: false,
            log_backend_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_case_details: true,
            log_backend_operations: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_case_details: false,
            log_backend_operations: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Truncates a field value to the configured maximum length.
    pub fn truncate_field<'a>(&self, value: &'a str) -> &'a str {
        match value.char_indices().nth(self.max_field_length) {
            Some((idx, _)) => &value[..idx],
            None => value,
        }
    }
}

/// Installs a global `tracing` subscriber honoring `RUST_LOG` when set and
/// the config's base level otherwise.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("attest_engine={}", config.base_level))
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(LogConfig::verbose().base_level, Level::DEBUG);
        assert_eq!(LogConfig::production().base_level, Level::WARN);
        assert_eq!(LogConfig::balanced().base_level, Level::INFO);
        assert!(LogConfig::verbose().log_case_details);
        assert!(!LogConfig::production().log_backend_operations);
    }

    #[test]
    fn test_truncate_field() {
        let config = LogConfig {
            max_field_length: 4,
            ..LogConfig::default()
        };
        assert_eq!(config.truncate_field("abcdef"), "abcd");
        assert_eq!(config.truncate_field("ab"), "ab");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LogConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
