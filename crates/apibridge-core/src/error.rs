//! Error types for the apibridge core.
//!
//! Rule construction, request building and transport setup each get their own
//! error enum. None of them ever reaches the chat user directly: the gateway
//! turns build and transport failures into a failed [`DispatchOutcome`] and
//! everything else is logged.
//!
//! [`DispatchOutcome`]: crate::DispatchOutcome

use thiserror::Error;

// =============================================================================
// Rule Errors
// =============================================================================

/// Errors that can occur while parsing or compiling a rule definition.
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    /// The rule string names a kind that is not one of the five known kinds.
    #[error("unknown rule kind '{0}'")]
    UnknownKind(String),

    /// A mandatory field of the rule string is absent.
    #[error("rule '{rule}' is missing the {field} field")]
    MissingField {
        /// The offending rule string.
        rule: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The regex pattern of a `REGEX` rule does not compile.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as written in the rule.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

impl RuleError {
    /// Creates a missing field error.
    pub fn missing_field(rule: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            rule: rule.into(),
            field,
        }
    }
}

// =============================================================================
// Build Errors
// =============================================================================

/// Errors that can occur while turning match parameters into a request.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// The API definition has no endpoint.
    #[error("API '{api}' has no endpoint configured")]
    MissingEndpoint {
        /// Name of the API.
        api: String,
    },

    /// The resolved method is not a valid HTTP method token.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while setting up a dispatcher.
///
/// Failures of an individual call are not errors; they are reported through
/// a failed [`DispatchOutcome`](crate::DispatchOutcome).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Invalid proxy or client configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be created.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;

/// Result type for request building.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for transport setup.
pub type TransportResult<T> = Result<T, TransportError>;
