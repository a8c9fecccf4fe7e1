// Configuration Manager implementation for the operations gateway
//
// Configuration is layered: built-in defaults, then a TOML or YAML file, then
// environment variables. Command line flags are applied last by the binary.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::sync::Semaphore;

use super::types::{ConfigPaths, EnvVars, GatewayConfig, LogLevel, ValidationResult};

/// Loads, layers and validates gateway configuration
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Effective configuration
    config: GatewayConfig,
    /// File the configuration was read from, if any
    source: Option<PathBuf>,
    /// Overrides that were skipped; loading runs before logging exists
    warnings: Vec<String>,
}

impl ConfigManager {
    /// Load configuration from `explicit_path`, or the default location if none is given
    pub async fn load(explicit_path: Option<&Path>) -> Result<Self> {
        tracing::debug!("Initializing configuration manager");

        let mut manager = Self::from_config(GatewayConfig::default());

        match explicit_path {
            Some(path) => {
                manager.load_file(path).await?;
            }
            None => {
                let default_file = Self::determine_config_dir()?.join(ConfigPaths::CONFIG_FILE);
                if default_file.exists() {
                    manager.load_file(&default_file).await?;
                } else {
                    tracing::debug!("No configuration file at {:?}, using defaults", default_file);
                }
            }
        }

        manager.load_from_environment();

        tracing::info!("Configuration loaded successfully");
        Ok(manager)
    }

    /// Build a manager around an already assembled configuration
    pub fn from_config(config: GatewayConfig) -> Self {
        Self {
            config,
            source: None,
            warnings: Vec::new(),
        }
    }

    /// Determine the configuration directory to use
    fn determine_config_dir() -> Result<PathBuf> {
        // Check environment variable first
        if let Ok(config_dir) = env::var(EnvVars::CONFIG_DIR) {
            return Ok(PathBuf::from(config_dir));
        }

        ConfigPaths::default_config_dir()
    }

    /// Parse a configuration file, choosing the format by extension
    async fn load_file(&mut self, path: &Path) -> Result<()> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let content = async_fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;

        self.config = match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML configuration {:?}", path))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML configuration {:?}", path))?,
        };
        self.source = Some(path.to_path_buf());

        Ok(())
    }

    /// Load overrides from process environment variables
    fn load_from_environment(&mut self) {
        tracing::debug!("Loading configuration from environment variables");
        self.apply_environment(|name| env::var(name).ok());
    }

    /// Apply overrides from an environment lookup; unparsable values are skipped
    /// and recorded in `warnings()`
    pub fn apply_environment<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup(EnvVars::LISTEN) {
            match listen.parse() {
                Ok(addr) => self.config.server.listen = addr,
                Err(_) => self.skip_override(EnvVars::LISTEN, &listen),
            }
        }

        if let Some(url) = lookup(EnvVars::ENGINE_URL) {
            self.config.engine.base_url = url;
        }

        if let Some(url) = lookup(EnvVars::INDEX_URL) {
            self.config.index.base_url = url;
        }

        if let Some(pattern) = lookup(EnvVars::INDEX_PATTERN) {
            self.config.index.index_pattern = pattern;
        }

        if let Some(concurrency) = lookup(EnvVars::BULK_CONCURRENCY) {
            match concurrency.parse() {
                Ok(value) => self.config.bulk.max_concurrency = value,
                Err(_) => self.skip_override(EnvVars::BULK_CONCURRENCY, &concurrency),
            }
        }

        if let Some(log_level) = lookup(EnvVars::LOG_LEVEL) {
            match log_level.parse::<LogLevel>() {
                Ok(level) => self.config.logging.level = level,
                Err(_) => self.skip_override(EnvVars::LOG_LEVEL, &log_level),
            }
        }
    }

    fn skip_override(&mut self, name: &str, value: &str) {
        self.warnings
            .push(format!("Ignoring invalid {}: {}", name, value));
    }

    /// Overrides skipped while loading, for reporting once logging is up
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Get the effective configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Get mutable access for command line overrides
    pub fn config_mut(&mut self) -> &mut GatewayConfig {
        &mut self.config
    }

    /// File the configuration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Validate the current configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (name, url) in [
            ("engine.base_url", &self.config.engine.base_url),
            ("index.base_url", &self.config.index.base_url),
        ] {
            if url.trim().is_empty() {
                result.add_error(format!("{} must not be empty", name));
            } else if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_warning(format!("{} does not look like an http(s) URL: {}", name, url));
            }
        }

        if self.config.engine.recovery_message_name.trim().is_empty() {
            result.add_error("engine.recovery_message_name must not be empty".to_string());
        }

        if self.config.engine.message_ttl <= chrono::Duration::zero() {
            result.add_error("engine.message_ttl must be greater than 0".to_string());
        }

        for (name, timeout) in [
            ("engine.request_timeout", self.config.engine.request_timeout),
            ("index.request_timeout", self.config.index.request_timeout),
        ] {
            if timeout.map(|t| t <= chrono::Duration::zero()).unwrap_or(false) {
                result.add_error(format!("{} must be greater than 0 when set", name));
            }
        }

        if self.config.index.index_pattern.trim().is_empty() {
            result.add_error("index.index_pattern must not be empty".to_string());
        }

        if self.config.index.name_bucket_limit == 0 {
            result.add_error("index.name_bucket_limit must be greater than 0".to_string());
        }

        if self.config.index.key_bucket_limit == 0 {
            result.add_error("index.key_bucket_limit must be greater than 0".to_string());
        }

        if self.config.bulk.max_concurrency == 0 {
            result.add_error("bulk.max_concurrency must be greater than 0".to_string());
        } else if self.config.bulk.max_concurrency > Semaphore::MAX_PERMITS {
            result.add_error(format!(
                "bulk.max_concurrency must not exceed {}",
                Semaphore::MAX_PERMITS
            ));
        }

        result
    }
}
