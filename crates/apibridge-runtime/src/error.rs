//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or reloading the gateway.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP dispatcher could not be created.
    #[error("Transport error: {0}")]
    Transport(#[from] apibridge_core::TransportError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
