//! Response extraction and formatting.
//!
//! A successful body goes through two steps:
//!
//! - **extraction** picks a sub-value using the API's `extract` settings,
//!   trying the exact status (`"200"`), then the status class (`"2xx"`), then
//!   the `default` path. Paths look like `$.data.result` and walk nested
//!   objects; a missing segment keeps the whole body.
//! - **rendering** fills `format_template`. Object values replace `{{key}}`
//!   for each of their keys; any other value replaces `{{result}}`. Without a
//!   template the value is pretty-printed as JSON.
//!
//! Failures skip both steps and render as `错误: <message>`.

use serde_json::Value;
use tracing::warn;

use crate::api::{ExtractConfig, ResponseConfig};
use crate::dispatch::{DispatchOutcome, ERROR_FIELD};

/// Prefix of every user-visible failure.
pub const ERROR_PREFIX: &str = "错误: ";

/// Root marker of an extraction path.
pub const PATH_ROOT: &str = "$.";

/// Template token replaced by non-object values.
pub const RESULT_TOKEN: &str = "{{result}}";

/// Formats dispatch outcomes for one API.
#[derive(Debug, Clone, Copy)]
pub struct ResponseFormatter<'a> {
    config: &'a ResponseConfig,
}

impl<'a> ResponseFormatter<'a> {
    /// Creates a formatter for the given response settings.
    pub fn new(config: &'a ResponseConfig) -> Self {
        Self { config }
    }

    /// Renders an outcome as display text.
    pub fn format(&self, outcome: &DispatchOutcome) -> String {
        if !outcome.success {
            return format_error(&outcome.body);
        }

        let status = outcome.status.unwrap_or(200);
        let extracted = self.extract(&outcome.body, status);
        let rendered = self.render(&extracted);

        match self.config.fallback.as_deref() {
            Some(fallback)
                if !fallback.is_empty() && (extracted.is_null() || rendered.trim().is_empty()) =>
            {
                fallback.to_string()
            }
            _ => rendered,
        }
    }

    /// Extracts the display value from a successful body.
    pub fn extract(&self, data: &Value, status: u16) -> Value {
        match self.config.extract.as_ref().and_then(|c| select_path(c, status)) {
            Some(path) => extract_by_path(data, path),
            None => data.clone(),
        }
    }

    /// Renders a value with the configured template.
    pub fn render(&self, value: &Value) -> String {
        render_template(self.config.format_template.as_deref(), value)
    }
}

/// Returns the status class token of a status code (`404` -> `"4xx"`).
pub fn status_class(status: u16) -> String {
    format!("{}xx", status / 100)
}

/// Picks the extraction path for a status: exact code, then class, then
/// `default`.
pub fn select_path(config: &ExtractConfig, status: u16) -> Option<&str> {
    config
        .by_status
        .get(&status.to_string())
        .or_else(|| config.by_status.get(&status_class(status)))
        .or(config.default.as_ref())
        .map(String::as_str)
        .filter(|p| !p.is_empty())
}

/// Walks a `$.a.b` path through nested objects.
///
/// Returns a copy of the addressed value, or of `data` itself when the path is
/// malformed or any segment is missing.
pub fn extract_by_path(data: &Value, path: &str) -> Value {
    let Some(rest) = path.strip_prefix(PATH_ROOT) else {
        warn!(path = %path, "Extraction path does not start with '$.', using whole response");
        return data.clone();
    };

    let mut current = data;
    for segment in rest.split('.').filter(|s| !s.is_empty()) {
        match current.as_object().and_then(|obj| obj.get(segment)) {
            Some(next) => current = next,
            None => {
                warn!(path = %path, segment = %segment, "Extraction path mismatch, using whole response");
                return data.clone();
            }
        }
    }

    current.clone()
}

/// Renders a value with an optional template.
///
/// An empty template counts as no template.
pub fn render_template(template: Option<&str>, value: &Value) -> String {
    let Some(template) = template.filter(|t| !t.is_empty()) else {
        return serde_json::to_string_pretty(value).unwrap_or_else(|_| value_to_text(value));
    };

    match value {
        Value::Object(map) => {
            let mut rendered = template.to_string();
            for (key, field) in map {
                let token = format!("{{{{{key}}}}}");
                if rendered.contains(&token) {
                    rendered = rendered.replace(&token, &value_to_text(field));
                }
            }
            rendered
        }
        other => template.replace(RESULT_TOKEN, &value_to_text(other)),
    }
}

/// Renders a failure payload.
///
/// Uses the payload's `error` field when present, otherwise the whole payload
/// pretty-printed.
pub fn format_error(payload: &Value) -> String {
    if let Some(message) = payload.get(ERROR_FIELD) {
        return format!("{ERROR_PREFIX}{}", value_to_text(message));
    }

    match serde_json::to_string_pretty(payload) {
        Ok(pretty) => format!("{ERROR_PREFIX}{pretty}"),
        Err(_) => format!("{ERROR_PREFIX}{}", value_to_text(payload)),
    }
}

/// Plain text form of a value: strings unquoted, everything else as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
