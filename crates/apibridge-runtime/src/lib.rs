//! APIBridge Runtime - configuration and orchestration layer for apibridge.
//!
//! This crate provides:
//! - The message [`Gateway`] with atomic snapshot reload
//! - Layered configuration loading and validation ([`config`])
//! - First-run bootstrapping of `<data_dir>/config.json`
//! - Logging configuration ([`logging`])
//!
//! # Example
//!
//! ```ignore
//! use apibridge_runtime::Gateway;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Gateway::builder().data_dir("./data").build()?;
//!
//!     if let Some(reply) = gateway.handle_message("/call 天气").await {
//!         println!("{reply}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, GatewayConfig, LoggingConfig, ValidationWarning,
    bootstrap_config, validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use gateway::{Gateway, GatewayBuilder, GatewayStats};
pub use logging::LoggingBuilder;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
