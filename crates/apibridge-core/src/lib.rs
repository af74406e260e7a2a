//! # APIBridge Core
//!
//! The protocol-independent engine of the APIBridge gateway.
//!
//! A chat message flows through four stages:
//!
//! ```text
//! ┌─────────┐     ┌─────────┐     ┌────────────────┐     ┌───────────────────┐
//! │ message │────▶│ RuleSet │────▶│ RequestBuilder │────▶│ ResponseFormatter │
//! └─────────┘     └─────────┘     └────────────────┘     └───────────────────┘
//!                  MatchParams      ResolvedRequest          display text
//! ```
//!
//! - **Matching**: ordered rules ([`RuleSet`], [`Rule`]) produce [`MatchParams`]
//!   for the first rule that accepts the message.
//! - **Building**: [`RequestBuilder`] resolves URL, method, headers and body
//!   from an [`ApiDefinition`].
//! - **Dispatch**: a [`Dispatch`] implementation executes the request. The
//!   HTTP implementation lives in `apibridge-transport`.
//! - **Formatting**: [`ResponseFormatter`] extracts and renders the result.
//!
//! Configuration is held in an immutable [`ConfigStore`] snapshot.
//!
//! ## Example
//!
//! ```
//! use apibridge_core::{Rule, RuleSet};
//!
//! let rules = RuleSet::new()
//!     .with(Rule::parse("COMMAND,/call,local_test,/hello,POST").unwrap())
//!     .with(Rule::parse("DEFAULT,local_test").unwrap());
//!
//! let params = rules.match_message("/call 天气").unwrap();
//! assert_eq!(params.api_name(), "local_test");
//! assert_eq!(params.get("content"), Some("天气"));
//! ```

pub mod api;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod params;
pub mod request;
pub mod response;
pub mod rule;
pub mod store;

pub use api::{
    ApiDefinition, ExtractConfig, GlobalConfig, MethodTree, Preprocess, RequestTemplate,
    ResponseConfig,
};
pub use dispatch::{BoxedDispatch, Dispatch, DispatchOutcome};
pub use error::{
    BuildError, BuildResult, RuleError, RuleResult, TransportError, TransportResult,
};
pub use matcher::RuleSet;
pub use params::MatchParams;
pub use request::{RequestBody, RequestBuilder, ResolvedRequest};
pub use response::{ERROR_PREFIX, ResponseFormatter};
pub use rule::{Rule, RuleDefinition, RuleKind};
pub use store::ConfigStore;

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        ApiDefinition, ConfigStore, Dispatch, DispatchOutcome, GlobalConfig, MatchParams,
        RequestBuilder, ResolvedRequest, ResponseFormatter, Rule, RuleSet,
    };
}
