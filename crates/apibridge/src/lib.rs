//! # APIBridge
//!
//! Route chat messages to external HTTP APIs through ordered rules.
//!
//! ## Overview
//!
//! A message is tested against an ordered list of rules. The first rule that
//! matches names an API, an optional request path and an optional method.
//! The request is built from the API definition, sent, and the response is
//! reduced to one line of text for the chat.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐     ┌──────────────────────────────────────┐     ┌───────────┐
//! │   Host   │────▶│ Gateway                              │────▶│ HTTP API  │
//! │  (chat)  │◀────│ rules ▶ request ▶ dispatch ▶ format  │◀────│           │
//! └──────────┘     └──────────────────────────────────────┘     └───────────┘
//! ```
//!
//! - **core**: rules, matching, request building, response formatting
//! - **transport**: the reqwest-backed HTTP dispatcher
//! - **runtime**: configuration, logging and the [`Gateway`](runtime::Gateway)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apibridge::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Gateway::builder().data_dir("./data").build()?;
//!
//!     if let Some(reply) = gateway.handle_message("/call 天气").await {
//!         println!("{reply}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: accept TOML configuration files
//! - `yaml-config`: accept YAML configuration files
//! - `json-log`: enable the JSON log format

pub use apibridge_core as core;
pub use apibridge_runtime as runtime;
pub use apibridge_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use apibridge::prelude::*;
/// ```
pub mod prelude {
    // Gateway - main entry point
    pub use apibridge_runtime::{Gateway, GatewayBuilder, GatewayStats};

    // Configuration
    pub use apibridge_runtime::config::{ConfigLoader, GatewayConfig, bootstrap_config};

    // Core types for custom dispatchers and direct use
    pub use apibridge_core::{
        ApiDefinition, ConfigStore, Dispatch, DispatchOutcome, MatchParams, ResolvedRequest, Rule,
        RuleSet,
    };

    // HTTP dispatcher
    pub use apibridge_transport::HttpDispatcher;
}
