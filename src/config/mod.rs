// Configuration module for the operations gateway
//
// This module handles loading the gateway configuration from files and
// environment variables and turning it into client and gateway settings.

pub mod manager;
pub mod types;

// Re-export commonly used types
pub use manager::ConfigManager;
pub use types::{
    BulkConfig, EngineConfig, GatewayConfig, IndexConfig, LogLevel, LoggingConfig, ServerConfig,
    ValidationResult,
};
