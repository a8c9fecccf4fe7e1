// Configuration types for the operations gateway
//
// This module defines the configuration file layout, the environment variables
// that override it, and the conversion into client and gateway settings.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::client::{EngineClientConfig, IndexClientConfig};
use crate::gateway::{DefinitionQuery, GatewayOptions};
use crate::utils::serde_helpers::{millis_serde, optional_millis_serde};

/// Log level for the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the REST surface binds to
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

/// Workflow engine connection and command settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the engine REST API
    pub base_url: String,
    /// Per-request timeout in milliseconds; unset means no client-side timeout
    #[serde(with = "optional_millis_serde")]
    pub request_timeout: Option<Duration>,
    /// Message published by the transaction resolver
    pub recovery_message_name: String,
    /// Time-to-live of the recovery message in milliseconds
    #[serde(with = "millis_serde")]
    pub message_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let options = GatewayOptions::default();
        Self {
            base_url: EngineClientConfig::default().base_url,
            request_timeout: None,
            recovery_message_name: options.recovery_message_name,
            message_ttl: options.message_ttl,
        }
    }
}

/// Search index connection and definition aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Base URL of the search cluster
    pub base_url: String,
    /// Per-request timeout in milliseconds; unset means no client-side timeout
    #[serde(with = "optional_millis_serde")]
    pub request_timeout: Option<Duration>,
    /// Index pattern holding exported engine records
    pub index_pattern: String,
    /// Field holding the process definition name
    pub name_field: String,
    /// Field holding the process definition key
    pub key_field: String,
    /// Most frequent definition names returned
    pub name_bucket_limit: usize,
    /// Most frequent definition keys returned per name
    pub key_bucket_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let query = DefinitionQuery::default();
        Self {
            base_url: IndexClientConfig::default().base_url,
            request_timeout: None,
            index_pattern: query.index_pattern,
            name_field: query.name_field,
            key_field: query.key_field,
            name_bucket_limit: query.name_bucket_limit,
            key_bucket_limit: query.key_bucket_limit,
        }
    }
}

/// Bulk operation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Maximum cancel commands in flight during one bulk cancellation
    pub max_concurrency: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: GatewayOptions::default().bulk_max_concurrency,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    pub level: LogLevel,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Also write a daily rolling log file into this directory
    pub directory: Option<PathBuf>,
}

/// Complete gateway configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub index: IndexConfig,
    pub bulk: BulkConfig,
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Settings for the engine REST client
    pub fn engine_client_config(&self) -> EngineClientConfig {
        EngineClientConfig {
            base_url: self.engine.base_url.clone(),
            request_timeout: self.engine.request_timeout.and_then(|d| d.to_std().ok()),
        }
    }

    /// Settings for the search index REST client
    pub fn index_client_config(&self) -> IndexClientConfig {
        IndexClientConfig {
            base_url: self.index.base_url.clone(),
            request_timeout: self.index.request_timeout.and_then(|d| d.to_std().ok()),
        }
    }

    /// Runtime options for the gateway operations
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            recovery_message_name: self.engine.recovery_message_name.clone(),
            message_ttl: self.engine.message_ttl,
            bulk_max_concurrency: self.bulk.max_concurrency,
            definitions: DefinitionQuery {
                index_pattern: self.index.index_pattern.clone(),
                name_field: self.index.name_field.clone(),
                key_field: self.index.key_field.clone(),
                name_bucket_limit: self.index.name_bucket_limit,
                key_bucket_limit: self.index.key_bucket_limit,
            },
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Whether the configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<String>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a new validation result
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error to the validation result
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Add a warning to the validation result
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Check if there are any issues
    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty() || !self.warnings.is_empty()
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variables that override the configuration file
pub struct EnvVars;

impl EnvVars {
    pub const LISTEN: &'static str = "OPS_GATEWAY_LISTEN";
    pub const ENGINE_URL: &'static str = "OPS_GATEWAY_ENGINE_URL";
    pub const INDEX_URL: &'static str = "OPS_GATEWAY_INDEX_URL";
    pub const INDEX_PATTERN: &'static str = "OPS_GATEWAY_INDEX_PATTERN";
    pub const BULK_CONCURRENCY: &'static str = "OPS_GATEWAY_BULK_CONCURRENCY";
    pub const LOG_LEVEL: &'static str = "OPS_GATEWAY_LOG_LEVEL";
    pub const CONFIG_DIR: &'static str = "OPS_GATEWAY_CONFIG_DIR";
}

/// Configuration file paths and names
pub struct ConfigPaths;

impl ConfigPaths {
    /// Default configuration directory name
    pub const CONFIG_DIR_NAME: &'static str = ".ops-gateway";

    /// Configuration file name
    pub const CONFIG_FILE: &'static str = "config.toml";

    /// Get the default configuration directory
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(Self::CONFIG_DIR_NAME))
            .context("Failed to determine home directory")
    }

    /// Get the default configuration file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join(Self::CONFIG_FILE))
    }
}
