//! Message gateway orchestration.
//!
//! The [`Gateway`] is the host-facing entry point: one plain-text message in,
//! `None` or one rendered reply out.
//!
//! ```text
//! message ─▶ RuleSet ─▶ RequestBuilder ─▶ Dispatch ─▶ ResponseFormatter ─▶ reply
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use apibridge_runtime::Gateway;
//!
//! // Load (or bootstrap) <data_dir>/config.json, initialise logging
//! let gateway = Gateway::builder().data_dir("./data").build()?;
//!
//! if let Some(reply) = gateway.handle_message("/call 天气").await {
//!     println!("{reply}");
//! }
//! ```
//!
//! # Reloading
//!
//! The configuration is held as an immutable snapshot behind an `Arc`.
//! [`Gateway::reload`] and [`Gateway::reload_config`] swap the whole snapshot;
//! messages already being handled finish on the snapshot they started with.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use apibridge_core::{
    BoxedDispatch, ConfigStore, Dispatch, DispatchOutcome, RequestBuilder, ResponseConfig,
    ResponseFormatter,
};
use apibridge_transport::HttpDispatcher;
use parking_lot::RwLock;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{ConfigLoader, GatewayConfig, bootstrap_config, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Configuration and dispatcher in use at one point in time.
struct Snapshot {
    store: Arc<ConfigStore>,
    dispatcher: BoxedDispatch,
}

/// Counters and sizes reported by [`Gateway::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Number of registered APIs.
    pub apis: usize,
    /// Number of compiled rules.
    pub rules: usize,
    /// Messages received.
    pub received: u64,
    /// Messages that matched a rule.
    pub matched: u64,
    /// Matched messages whose dispatch failed.
    pub failed: u64,
}

/// Routes chat messages to external APIs.
pub struct Gateway {
    snapshot: RwLock<Arc<Snapshot>>,
    received: AtomicU64,
    matched: AtomicU64,
    failed: AtomicU64,
}

impl Gateway {
    /// Creates a gateway from a store and any dispatcher.
    pub fn new(store: ConfigStore, dispatcher: impl Dispatch + 'static) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot {
                store: Arc::new(store),
                dispatcher: Arc::new(dispatcher),
            })),
            received: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Creates a gateway builder for file-based configuration.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Validates a configuration and creates a gateway with an HTTP dispatcher.
    ///
    /// Validation warnings are logged; document-level problems are errors.
    pub fn from_config(config: &GatewayConfig) -> RuntimeResult<Self> {
        let (store, dispatcher) = Self::prepare(config)?;
        let gateway = Self::new(store, dispatcher);

        let stats = gateway.stats();
        info!(
            apis = stats.apis,
            rules = stats.rules,
            "Gateway initialized from configuration"
        );

        Ok(gateway)
    }

    fn prepare(config: &GatewayConfig) -> RuntimeResult<(ConfigStore, HttpDispatcher)> {
        for warning in validate_config(config)? {
            warn!(scope = %warning.scope, "Configuration problem: {}", warning.message);
        }

        let dispatcher = HttpDispatcher::new(&config.global)?;
        Ok((config.to_store(), dispatcher))
    }

    /// Replaces the store and dispatcher.
    pub fn reload(&self, store: ConfigStore, dispatcher: impl Dispatch + 'static) {
        let snapshot = Arc::new(Snapshot {
            store: Arc::new(store),
            dispatcher: Arc::new(dispatcher),
        });
        *self.snapshot.write() = snapshot;

        let stats = self.stats();
        info!(apis = stats.apis, rules = stats.rules, "Gateway reloaded");
    }

    /// Validates a configuration and swaps it in.
    ///
    /// On error the current snapshot stays in place.
    pub fn reload_config(&self, config: &GatewayConfig) -> RuntimeResult<()> {
        let (store, dispatcher) = Self::prepare(config)?;
        self.reload(store, dispatcher);
        Ok(())
    }

    /// Returns the configuration store currently in use.
    pub fn store(&self) -> Arc<ConfigStore> {
        Arc::clone(&self.current().store)
    }

    /// Returns sizes of the current snapshot and message counters.
    pub fn stats(&self) -> GatewayStats {
        let snapshot = self.current();
        GatewayStats {
            apis: snapshot.store.api_count(),
            rules: snapshot.store.rules().len(),
            received: self.received.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Handles one message.
    ///
    /// Returns `None` when no rule matches. Otherwise the matched API is
    /// called and its response rendered; failures render as `错误: ...`.
    pub async fn handle_message(&self, message: &str) -> Option<String> {
        self.received.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.current();

        let params = snapshot.store.rules().match_message(message)?;
        let api_name = params.api_name().to_string();
        if api_name.is_empty() {
            debug!("Matched rule has no API name, ignoring message");
            return None;
        }
        self.matched.fetch_add(1, Ordering::Relaxed);

        let span = info_span!("handle_message", api = %api_name);
        async {
            let api = snapshot.store.api(&api_name);
            let outcome = match api {
                None => {
                    warn!("API not configured");
                    DispatchOutcome::failure(format!("API not configured: {api_name}"))
                }
                Some(api) => match RequestBuilder::new(api).build(&params) {
                    Ok(request) => snapshot.dispatcher.dispatch(request).await,
                    Err(e) => {
                        warn!(error = %e, "Failed to build request");
                        DispatchOutcome::failure(e.to_string())
                    }
                },
            };

            if !outcome.success {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }

            let default_response = ResponseConfig::default();
            let response = api.map_or(&default_response, |api| &api.response);
            let reply = ResponseFormatter::new(response).format(&outcome);

            debug!(success = outcome.success, status = ?outcome.status, "Message handled");
            Some(reply)
        }
        .instrument(span)
        .await
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for a file-configured [`Gateway`].
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Gateway::builder()
///     .config_file("config/apibridge.json")
///     .profile("production")
///     .build()?;
/// ```
pub struct GatewayBuilder {
    loader: ConfigLoader,
    config_file: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    init_logging: bool,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayBuilder {
    /// Creates a builder that searches default locations.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            config_file: None,
            data_dir: None,
            init_logging: true,
        }
    }

    /// Loads a specific configuration file.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Uses `<dir>/config.json`, writing a sample there if it is absent.
    ///
    /// Ignored when [`config_file`](Self::config_file) is set.
    pub fn data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Disables `APIBRIDGE_*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Controls whether logging is initialised from the `logging` section
    /// (default: true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Loads the configuration and builds the gateway.
    pub fn build(self) -> RuntimeResult<Gateway> {
        let init_logging = self.init_logging;
        let config = self.load()?;
        if init_logging {
            logging::init_from_config(&config.logging);
        }
        Gateway::from_config(&config)
    }

    /// Loads the configuration without building a gateway.
    pub fn load(self) -> RuntimeResult<GatewayConfig> {
        let mut loader = self.loader;
        if let Some(path) = &self.config_file {
            loader = loader.file(path);
        } else if let Some(dir) = &self.data_dir {
            loader = loader.file(bootstrap_config(dir)?);
        }
        Ok(loader.load()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use apibridge_core::{GlobalConfig, RequestBody, ResolvedRequest};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    /// Records requests and answers with a canned outcome.
    struct MockDispatcher {
        outcome: DispatchOutcome,
        requests: Arc<Mutex<Vec<ResolvedRequest>>>,
    }

    impl MockDispatcher {
        fn new(outcome: DispatchOutcome) -> (Self, Arc<Mutex<Vec<ResolvedRequest>>>) {
            let requests = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    outcome,
                    requests: Arc::clone(&requests),
                },
                requests,
            )
        }
    }

    #[async_trait]
    impl Dispatch for MockDispatcher {
        async fn dispatch(&self, request: ResolvedRequest) -> DispatchOutcome {
            self.requests.lock().push(request);
            self.outcome.clone()
        }
    }

    fn config(value: Value) -> GatewayConfig {
        serde_json::from_value(value).unwrap()
    }

    fn local_test() -> GatewayConfig {
        config(json!({
            "global": {"timeout": 5, "defaultAPI": "local_test"},
            "apis": [{
                "name": "local_test",
                "endpoint": "http://localhost:8999",
                "headers": {"Content-Type": "application/json"},
                "methods": {"/hello": "POST", "DEFAULT": "GET"},
                "preprocess": {"enabled": true, "template": {"body": {"query": "content"}}},
                "response": {
                    "extract": {
                        "default": "$.data",
                        "by_status": {"200": "$.data.result", "4xx": "$.error.message"}
                    },
                    "fallback": "API调用失败",
                    "format_template": "结果: {{result}}"
                }
            }],
            "rules": [
                "COMMAND,/call,local_test,/hello,POST",
                "REGEX,^请求\\s+(.+)$,local_test,/hello/{$1},PUT",
                "KEYWORD,测试,ghost",
                "COMMAND,/broken,local_test,/x,BAD METHOD"
            ]
        }))
    }

    fn gateway(outcome: DispatchOutcome) -> (Gateway, Arc<Mutex<Vec<ResolvedRequest>>>) {
        let (dispatcher, requests) = MockDispatcher::new(outcome);
        (Gateway::new(local_test().to_store(), dispatcher), requests)
    }

    #[tokio::test]
    async fn test_command_round_trip() {
        let (gateway, requests) =
            gateway(DispatchOutcome::success(200, json!({"data": {"result": 42}})));

        let reply = gateway.handle_message("/call 天气").await;
        assert_eq!(reply.as_deref(), Some("结果: 42"));

        let requests = requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://localhost:8999/hello");
        assert_eq!(requests[0].method, "POST");
        let Some(RequestBody::Json(body)) = &requests[0].body else {
            panic!("expected JSON body");
        };
        assert_eq!(body["query"], "天气");
    }

    #[tokio::test]
    async fn test_regex_path_placeholder() {
        let (gateway, requests) = gateway(DispatchOutcome::success(201, json!({"data": "ok"})));

        let reply = gateway.handle_message("请求 北京").await;
        assert_eq!(reply.as_deref(), Some("结果: ok"));
        assert_eq!(requests.lock()[0].url, "http://localhost:8999/hello/北京");
        assert_eq!(requests.lock()[0].method, "PUT");
    }

    #[tokio::test]
    async fn test_unmatched_message_is_silent() {
        let (gateway, requests) = gateway(DispatchOutcome::success(200, json!({})));

        assert_eq!(gateway.handle_message("hello").await, None);
        assert_eq!(gateway.handle_message("   ").await, None);
        assert!(requests.lock().is_empty());

        let stats = gateway.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.matched, 0);
    }

    #[tokio::test]
    async fn test_unknown_api_reports_error() {
        let (gateway, requests) = gateway(DispatchOutcome::success(200, json!({})));

        let reply = gateway.handle_message("这是测试").await;
        assert_eq!(reply.as_deref(), Some("错误: API not configured: ghost"));
        assert!(requests.lock().is_empty());
        assert_eq!(gateway.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_build_error_reports_error() {
        let (gateway, requests) = gateway(DispatchOutcome::success(200, json!({})));

        let reply = gateway.handle_message("/broken").await.unwrap();
        assert!(reply.starts_with("错误: "));
        assert!(requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_rendered() {
        let (gateway, _) = gateway(DispatchOutcome::http_error(404, json!({"detail": "x"})));

        let reply = gateway.handle_message("/call").await;
        assert_eq!(
            reply.as_deref(),
            Some(r#"错误: request failed with HTTP status 404: {"detail":"x"}"#)
        );
    }

    #[tokio::test]
    async fn test_fallback_on_null_result() {
        let (gateway, _) = gateway(DispatchOutcome::success(200, json!({"data": {"result": null}})));
        let reply = gateway.handle_message("/call").await;
        assert_eq!(reply.as_deref(), Some("API调用失败"));
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let (gateway, _) = gateway(DispatchOutcome::success(200, json!({"data": {"result": 1}})));
        let before = gateway.store();
        assert_eq!(gateway.stats().rules, 4);

        let (dispatcher, requests) =
            MockDispatcher::new(DispatchOutcome::success(200, json!("pong")));
        let store = ConfigStore::new(
            GlobalConfig::default(),
            vec![apibridge_core::ApiDefinition::new("echo", "http://echo")],
            ["DEFAULT,echo"],
        );
        gateway.reload(store, dispatcher);

        // Old snapshot handles stay valid.
        assert_eq!(before.rules().len(), 4);
        assert_eq!(gateway.stats().rules, 1);

        let reply = gateway.handle_message("anything").await;
        assert_eq!(reply.as_deref(), Some("\"pong\""));
        assert_eq!(requests.lock()[0].url, "http://echo/");
    }

    #[test]
    fn test_reload_config_rejects_invalid_document() {
        let (gateway, _) = gateway(DispatchOutcome::success(200, json!({})));
        let result = gateway.reload_config(&GatewayConfig::default());
        assert!(result.is_err());
        assert_eq!(gateway.stats().apis, 1);
    }

    #[test]
    fn test_from_config() {
        let gateway = Gateway::from_config(&local_test()).unwrap();
        let stats = gateway.stats();
        assert_eq!(stats.apis, 1);
        assert_eq!(stats.rules, 4);
    }

    #[test]
    fn test_builder_bootstraps_data_dir() {
        let dir = std::env::temp_dir().join(format!("apibridge-gateway-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let gateway = Gateway::builder()
            .data_dir(&dir)
            .without_env()
            .init_logging(false)
            .build()
            .unwrap();
        assert_eq!(gateway.stats().rules, 4);
        assert!(dir.join("config.json").exists());
    }
}
