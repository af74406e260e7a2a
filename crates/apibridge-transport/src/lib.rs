//! # APIBridge Transport
//!
//! Network implementations of the [`Dispatch`](apibridge_core::Dispatch)
//! trait defined in `apibridge-core`.
//!
//! ## Features
//!
//! - `http-client` (default): reqwest-backed [`HttpDispatcher`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  apibridge-runtime  │  (gateway, config)
//! ├─────────────────────┤
//! │  apibridge-core     │  (Dispatch trait, ResolvedRequest)
//! ├─────────────────────┤
//! │  apibridge-transport│  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apibridge_core::{Dispatch, GlobalConfig};
//! use apibridge_transport::HttpDispatcher;
//!
//! let dispatcher = HttpDispatcher::new(&GlobalConfig::default())?;
//! let outcome = dispatcher.dispatch(request).await;
//! ```

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::HttpDispatcher;
