//! HTTP/WebSocket front end for the `liars_deck` engine.
//!
//! Exposes the router, configuration, logging and metrics setup so the
//! binary and integration tests share them.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
