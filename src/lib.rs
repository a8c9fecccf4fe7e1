//! Operations Gateway Library
//!
//! This library provides the operator-facing REST gateway in front of a
//! workflow engine, including bulk cancellation, incident recovery and the
//! process definition index backed by the engine's exported search index.

pub mod api;
pub mod client;
pub mod config;
pub mod gateway;
pub mod utils;

// Re-export main types for convenience
pub use api::build_router;
pub use client::{EngineRestClient, SearchIndexClient};
pub use config::ConfigManager;
pub use gateway::OperationsGateway;
