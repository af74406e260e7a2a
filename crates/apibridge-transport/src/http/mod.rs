//! HTTP dispatch.
//!
//! This module provides the reqwest-backed dispatcher.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::HttpDispatcher;
