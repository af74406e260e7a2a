//! Configuration module for the apibridge runtime.
//!
//! This module provides layered configuration loading, validation and
//! first-run bootstrapping for the gateway document (`global`, `apis`,
//! `rules`, `logging`).

pub mod bootstrap;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use bootstrap::{CONFIG_FILE_NAME, bootstrap_config, default_data_dir, sample_config};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{GatewayConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};
pub use validation::{ValidationWarning, validate_config};
