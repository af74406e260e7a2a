//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use apibridge_core::{ApiDefinition, ConfigStore, GlobalConfig};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// ```json
/// {
///   "global": {"proxy": "", "timeout": 30, "defaultAPI": "local_test"},
///   "apis": [{"name": "local_test", "endpoint": "http://localhost:8999"}],
///   "rules": ["COMMAND,/call,local_test,/hello,POST", "DEFAULT,local_test"],
///   "logging": {"level": "debug"}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GatewayConfig {
    /// Settings shared by every API.
    #[serde(default)]
    pub global: GlobalConfig,

    /// External API definitions.
    #[serde(default)]
    pub apis: Vec<ApiDefinition>,

    /// Rule strings, evaluated in order.
    #[serde(default)]
    pub rules: Vec<String>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Builds the immutable store used by the gateway.
    pub fn to_store(&self) -> ConfigStore {
        ConfigStore::new(self.global.clone(), self.apis.clone(), &self.rules)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides, e.g. `{"apibridge_transport": "debug"}`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            filters: BTreeMap::new(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_document() {
        let config: GatewayConfig = serde_json::from_value(json!({
            "apis": [{"name": "a", "endpoint": "http://localhost"}],
            "rules": ["DEFAULT,a"]
        }))
        .unwrap();
        assert_eq!(config.apis.len(), 1);
        assert_eq!(config.global.timeout_secs, 30.0);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stderr);
    }

    #[test]
    fn test_logging_section() {
        let logging: LoggingConfig = serde_json::from_value(json!({
            "level": "debug",
            "format": "pretty",
            "output": "file",
            "file_path": "logs/apibridge.log",
            "filters": {"apibridge_transport": "trace"},
            "span_events": {"new": true, "close": true}
        }))
        .unwrap();
        assert_eq!(logging.level.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(logging.format, LogFormat::Pretty);
        assert_eq!(logging.filters["apibridge_transport"], LogLevel::Trace);
        assert!(logging.span_events.new && !logging.span_events.enter);
    }

    #[test]
    fn test_to_store() {
        let config: GatewayConfig = serde_json::from_value(json!({
            "global": {"defaultAPI": "a"},
            "apis": [{"name": "a", "endpoint": "http://localhost"}],
            "rules": ["KEYWORD,hi,", "DEFAULT,a"]
        }))
        .unwrap();
        let store = config.to_store();
        assert_eq!(store.api_count(), 1);
        assert_eq!(store.rules().len(), 2);
    }
}
