//! reqwest-backed dispatcher.

use std::time::Duration;

use apibridge_core::{
    Dispatch, DispatchOutcome, GlobalConfig, RequestBody, ResolvedRequest, TransportError,
    TransportResult,
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, Proxy};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Executes resolved requests over HTTP.
///
/// One pooled [`Client`] is shared by every call; cloning the dispatcher is
/// cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    timeout: Duration,
}

impl HttpDispatcher {
    /// Creates a dispatcher from the global settings (timeout and proxy).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] for an unusable proxy URL and
    /// [`TransportError::ClientBuild`] if the client cannot be created.
    pub fn new(global: &GlobalConfig) -> TransportResult<Self> {
        let timeout = global.timeout();
        let mut builder = ClientBuilder::new().timeout(timeout);

        if let Some(proxy) = global.proxy() {
            let proxy = Proxy::all(proxy)
                .map_err(|e| TransportError::InvalidConfig(format!("proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        info!(
            timeout_ms = timeout.as_millis() as u64,
            proxy = global.proxy().unwrap_or("none"),
            "HTTP dispatcher ready"
        );

        Ok(Self { client, timeout })
    }

    /// Creates a dispatcher with the given timeout and no proxy.
    pub fn with_timeout(timeout: Duration) -> TransportResult<Self> {
        Self::new(&GlobalConfig {
            timeout_secs: timeout.as_secs_f64(),
            ..Default::default()
        })
    }

    /// Returns the per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, request: ResolvedRequest) -> Result<(u16, Value), String> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| format!("invalid HTTP method '{}'", request.method))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(map)) => builder.json(&map),
            Some(RequestBody::Text(text)) => builder.body(text),
            None => builder,
        };

        let response = builder.send().await.map_err(describe_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(describe_error)?;

        Ok((status, parse_body(&bytes)))
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn dispatch(&self, request: ResolvedRequest) -> DispatchOutcome {
        let method = request.method.clone();
        let url = request.url.clone();
        debug!(method = %method, url = %url, "Sending request");

        let result = tokio::time::timeout(self.timeout, self.execute(request)).await;

        match result {
            Ok(Ok((status, body))) if status >= 400 => {
                warn!(method = %method, url = %url, status, "Request failed with HTTP error");
                DispatchOutcome::http_error(status, body)
            }
            Ok(Ok((status, body))) => {
                debug!(method = %method, url = %url, status, "Request succeeded");
                DispatchOutcome::success(status, body)
            }
            Ok(Err(message)) => {
                warn!(method = %method, url = %url, error = %message, "Request failed");
                DispatchOutcome::failure(message)
            }
            Err(_) => {
                warn!(method = %method, url = %url, "Request timed out");
                DispatchOutcome::failure(format!(
                    "request timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                ))
            }
        }
    }
}

/// Parses a response body as JSON, falling back to text.
fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn describe_error(error: reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        format!("request failed: {error}")
    }
}
