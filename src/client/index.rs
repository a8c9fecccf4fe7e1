// Search index query client for the operations gateway
//
// Read-only access to the time-indexed event store that the workflow engine
// exports into. The gateway only needs term aggregations and a liveness probe.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::error::{check_status, ClientError, ClientResult};

/// Read-only queries against the search index
#[async_trait]
pub trait IndexQueryClient: Send + Sync {
    /// Run an aggregation-only search and return the raw response document
    async fn aggregate(&self, index_pattern: &str, aggregations: &Value) -> ClientResult<Value>;

    /// List the names of all indices; used as a liveness probe
    async fn list_indices(&self) -> ClientResult<Vec<String>>;
}

/// Configuration for the search index REST client
#[derive(Debug, Clone)]
pub struct IndexClientConfig {
    /// Base URL of the search cluster, e.g. http://localhost:9200
    pub base_url: String,
    /// Per-request timeout; `None` leaves timing to the cluster
    pub request_timeout: Option<Duration>,
}

impl Default for IndexClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            request_timeout: None,
        }
    }
}

/// `IndexQueryClient` backed by an Elasticsearch-compatible REST API
pub struct SearchIndexClient {
    config: IndexClientConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
}

impl SearchIndexClient {
    /// Create a new search index client
    pub fn new(config: IndexClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("Failed to build search index HTTP client")?;

        Ok(Self { config, http })
    }

    /// Get the current configuration
    pub fn config(&self) -> &IndexClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl IndexQueryClient for SearchIndexClient {
    async fn aggregate(&self, index_pattern: &str, aggregations: &Value) -> ClientResult<Value> {
        let path = format!("/{}/_search?typed_keys=true", index_pattern);
        let endpoint = format!("POST {}", path);
        debug!("Running aggregation query: {}", endpoint);

        let response = self
            .http
            .post(self.url(&path))
            .json(&json!({ "size": 0, "aggs": aggregations }))
            .send()
            .await
            .map_err(|e| ClientError::transport(&endpoint, e))?;

        check_status(&endpoint, response)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| ClientError::invalid_response(&endpoint, e.to_string()))
    }

    async fn list_indices(&self) -> ClientResult<Vec<String>> {
        let path = "/_cat/indices?format=json";
        let endpoint = format!("GET {}", path);

        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ClientError::transport(&endpoint, e))?;

        let indices = check_status(&endpoint, response)
            .await?
            .json::<Vec<CatIndex>>()
            .await
            .map_err(|e| ClientError::invalid_response(&endpoint, e.to_string()))?;

        debug!("Search index reports {} indices", indices.len());
        Ok(indices.into_iter().map(|i| i.index).collect())
    }
}
