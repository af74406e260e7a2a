//! Dispatch abstraction.
//!
//! The core never talks to the network itself. A [`Dispatch`] implementation
//! (see `apibridge-transport`) executes a [`ResolvedRequest`] and reports a
//! [`DispatchOutcome`]. Failures are values, never errors: the formatter
//! renders them for the user.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::request::ResolvedRequest;

/// Field of a failure payload carrying the human-readable message.
pub const ERROR_FIELD: &str = "error";
/// Field of an HTTP failure payload carrying the status code.
pub const STATUS_FIELD: &str = "status_code";
/// Field of an HTTP failure payload carrying the parsed response body.
pub const RESPONSE_FIELD: &str = "response";

/// Maximum number of characters of a response body quoted in an HTTP error.
pub const EXCERPT_CHARS: usize = 120;

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// Whether the call succeeded (transport ok and status < 400).
    pub success: bool,
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Parsed response body on success, failure payload otherwise.
    pub body: Value,
}

impl DispatchOutcome {
    /// A successful response.
    pub fn success(status: u16, body: Value) -> Self {
        Self {
            success: true,
            status: Some(status),
            body,
        }
    }

    /// A response with status >= 400.
    ///
    /// The body is kept as context and the start of it is quoted in the
    /// error message.
    pub fn http_error(status: u16, body: Value) -> Self {
        let mut message = format!("request failed with HTTP status {status}");
        if let Some(excerpt) = excerpt(&body) {
            message.push_str(": ");
            message.push_str(&excerpt);
        }

        Self {
            success: false,
            status: Some(status),
            body: json!({
                STATUS_FIELD: status,
                ERROR_FIELD: message,
                RESPONSE_FIELD: body,
            }),
        }
    }

    /// A failure without a response (build error, unknown API, transport).
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: None,
            body: json!({ ERROR_FIELD: message.into() }),
        }
    }
}

/// Compact one-line form of a response body, cut at [`EXCERPT_CHARS`].
fn excerpt(body: &Value) -> Option<String> {
    let text = match body {
        Value::Null => return None,
        Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    };
    if text.is_empty() {
        return None;
    }

    let mut chars = text.chars();
    let mut cut: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        cut.push('…');
    }
    Some(cut)
}

/// Executes resolved requests.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Executes one request. Must not panic or propagate transport failures.
    async fn dispatch(&self, request: ResolvedRequest) -> DispatchOutcome;
}

#[async_trait]
impl<T: Dispatch + ?Sized> Dispatch for Arc<T> {
    async fn dispatch(&self, request: ResolvedRequest) -> DispatchOutcome {
        (**self).dispatch(request).await
    }
}

/// Boxed dispatcher.
pub type BoxedDispatch = Arc<dyn Dispatch>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Echo;

    #[async_trait]
    impl Dispatch for Echo {
        async fn dispatch(&self, request: ResolvedRequest) -> DispatchOutcome {
            DispatchOutcome::success(200, json!({"url": request.url, "method": request.method}))
        }
    }

    fn request() -> ResolvedRequest {
        ResolvedRequest {
            url: "http://localhost/echo".into(),
            method: "GET".into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[test]
    fn test_http_error_keeps_context() {
        let outcome = DispatchOutcome::http_error(404, json!({"detail": "nope"}));
        assert!(!outcome.success);
        assert_eq!(outcome.status, Some(404));
        assert_eq!(outcome.body[STATUS_FIELD], 404);
        assert_eq!(outcome.body[RESPONSE_FIELD]["detail"], "nope");
        assert_eq!(
            outcome.body[ERROR_FIELD],
            r#"request failed with HTTP status 404: {"detail":"nope"}"#
        );
    }

    #[test]
    fn test_http_error_excerpt() {
        let outcome = DispatchOutcome::http_error(502, Value::Null);
        assert_eq!(outcome.body[ERROR_FIELD], "request failed with HTTP status 502");

        let outcome = DispatchOutcome::http_error(500, json!("  Internal\n  error "));
        assert_eq!(
            outcome.body[ERROR_FIELD],
            "request failed with HTTP status 500: Internal error"
        );

        let long = "错".repeat(EXCERPT_CHARS + 10);
        let outcome = DispatchOutcome::http_error(503, json!(long));
        let message = outcome.body[ERROR_FIELD].as_str().unwrap();
        let quoted = message.split_once(": ").unwrap().1;
        assert_eq!(quoted.chars().count(), EXCERPT_CHARS + 1);
        assert!(quoted.ends_with('…'));
    }

    #[test]
    fn test_failure_has_no_status() {
        let outcome = DispatchOutcome::failure("connection refused");
        assert!(!outcome.success);
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.body, json!({"error": "connection refused"}));
    }

    #[test]
    fn test_boxed_dispatch_delegates() {
        let dispatcher: BoxedDispatch = Arc::new(Echo);
        let outcome = tokio_test::block_on(dispatcher.dispatch(request()));
        assert!(outcome.success);
        assert_eq!(outcome.body["url"], "http://localhost/echo");
    }

    #[tokio::test]
    async fn test_arc_of_concrete_dispatcher() {
        let dispatcher = Arc::new(Echo);
        let outcome = Dispatch::dispatch(&dispatcher, request()).await;
        assert_eq!(outcome.status, Some(200));
        assert_eq!(outcome.body["method"], "GET");
    }
}
