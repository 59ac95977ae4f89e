//! HTTP boundary for the infographic generation pipeline.
//!
//! Exposed as a library so integration tests can build the router with
//! stubbed pipeline services; the binary in `main.rs` is a thin wrapper.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
