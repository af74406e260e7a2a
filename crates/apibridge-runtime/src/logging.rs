//! Logging setup for the gateway.
//!
//! The `logging` section of the configuration document drives a single
//! `tracing-subscriber` fmt layer. `RUST_LOG`, when set, replaces the
//! configured base level; per-module `filters` are added on top of either.
//!
//! ```rust,ignore
//! use apibridge_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::from_config(&config.logging)
//!     .directive("apibridge_transport=trace")
//!     .try_init()?;
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// File name used when the configured log path names a directory only.
const DEFAULT_LOG_FILE: &str = "apibridge.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Subscriber settings, seeded from a [`LoggingConfig`].
#[derive(Debug)]
pub struct LoggingBuilder {
    level: Level,
    directives: Vec<String>,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    span_events: FmtSpan,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::from_config(&LoggingConfig::default())
    }
}

impl LoggingBuilder {
    /// Takes every setting from the `logging` section.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.to_tracing_level(),
            directives: config
                .filters
                .iter()
                .map(|(module, level)| format!("{module}={level}"))
                .collect(),
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            span_events: fmt_span(&config.span_events),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
        }
    }

    /// Overrides the base level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `apibridge_core=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Installs the subscriber.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already installed.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();
        let (writer, fallback_to_stderr) = self.writer();

        tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(filter)
            .try_init()?;

        if fallback_to_stderr {
            tracing::warn!("File output requested without a file path, logging to stderr");
        }
        #[cfg(not(feature = "json-log"))]
        if self.format == LogFormat::Json {
            tracing::warn!("JSON log format requires the `json-log` feature, using full format");
        }
        Ok(())
    }

    fn build_filter(&self) -> EnvFilter {
        let base = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_ascii_lowercase()));

        self.directives
            .iter()
            .filter_map(|d| d.parse::<Directive>().ok())
            .fold(base, EnvFilter::add_directive)
    }

    /// Returns the writer and whether a file output had to fall back.
    fn writer(&self) -> (BoxMakeWriter, bool) {
        match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), false),
            (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), false),
            (LogOutput::File, Some(path)) => {
                let name = path
                    .file_name()
                    .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
                let appender = tracing_appender::rolling::never(log_dir(path), name);
                (BoxMakeWriter::new(appender), false)
            }
            (LogOutput::File, None) => (BoxMakeWriter::new(std::io::stderr), true),
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.output != LogOutput::File)
            .with_span_events(self.span_events.clone())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            _ => layer.boxed(),
        }
    }
}

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// Directory part of a log file path, `.` when it has none.
fn log_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            thread_ids: true,
            file_location: true,
            span_events: SpanEventConfig {
                new: true,
                close: true,
                ..Default::default()
            },
            ..Default::default()
        };
        config
            .filters
            .insert("apibridge_transport".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert_eq!(builder.span_events, FmtSpan::NEW | FmtSpan::CLOSE);
        assert!(builder.thread_ids && builder.file_location);
        assert_eq!(builder.directives, vec!["apibridge_transport=trace"]);
    }

    #[test]
    fn test_overrides() {
        let builder = LoggingBuilder::default()
            .with_level(Level::WARN)
            .directive("apibridge_core=trace");
        assert_eq!(builder.level, Level::WARN);
        assert_eq!(builder.directives, vec!["apibridge_core=trace"]);
        assert_eq!(builder.output, LogOutput::Stderr);
    }

    #[test]
    fn test_span_flags() {
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);
        let all = SpanEventConfig {
            new: true,
            enter: true,
            exit: true,
            close: true,
        };
        assert_eq!(fmt_span(&all), FmtSpan::FULL);
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let config = LoggingConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        let (_, fallback) = LoggingBuilder::from_config(&config).writer();
        assert!(fallback);

        let config = LoggingConfig {
            output: LogOutput::File,
            file_path: Some(std::env::temp_dir().join("apibridge-test.log")),
            ..Default::default()
        };
        let (_, fallback) = LoggingBuilder::from_config(&config).writer();
        assert!(!fallback);
    }

    #[test]
    fn test_log_dir() {
        assert_eq!(log_dir(Path::new("apibridge.log")), Path::new("."));
        assert_eq!(log_dir(Path::new("logs/apibridge.log")), Path::new("logs"));
    }
}
