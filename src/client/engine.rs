// Workflow engine command client for the operations gateway
//
// This module defines the command surface the gateway needs from the workflow
// engine and a REST implementation of it. Every command is a single
// request/acknowledge round trip that can fail on its own.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::error::{check_status, ClientError, ClientResult};
use super::Variables;

/// Commands the gateway can send to the workflow engine
#[async_trait]
pub trait CommandClient: Send + Sync {
    /// Create an instance of the latest deployed version of a process definition
    async fn create_instance(
        &self,
        process_definition_id: &str,
        variables: &Variables,
    ) -> ClientResult<()>;

    /// Cancel a running process instance
    async fn cancel_instance(&self, instance_key: i64) -> ClientResult<()>;

    /// Publish a message that a waiting catch event can correlate with
    async fn publish_message(
        &self,
        name: &str,
        correlation_key: &str,
        time_to_live: chrono::Duration,
        variables: &Variables,
    ) -> ClientResult<()>;

    /// Merge variables into the scope of an element instance
    async fn set_variables(&self, element_instance_key: i64, variables: &Variables)
        -> ClientResult<()>;

    /// Overwrite the remaining retries of a job
    async fn update_retries(&self, job_key: i64, retries: i32) -> ClientResult<()>;

    /// Mark an incident as resolved so the engine retries the element
    async fn resolve_incident(&self, incident_key: i64) -> ClientResult<()>;
}

/// Configuration for the engine REST client
#[derive(Debug, Clone)]
pub struct EngineClientConfig {
    /// Base URL of the engine REST API, e.g. http://localhost:8080
    pub base_url: String,
    /// Per-request timeout; `None` leaves timing to the engine
    pub request_timeout: Option<Duration>,
}

impl Default for EngineClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: None,
        }
    }
}

/// `CommandClient` backed by the engine's v2 REST API
pub struct EngineRestClient {
    config: EngineClientConfig,
    http: reqwest::Client,
}

impl EngineRestClient {
    /// Create a new engine client
    pub fn new(config: EngineClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("Failed to build workflow engine HTTP client")?;

        Ok(Self { config, http })
    }

    /// Get the current configuration
    pub fn config(&self) -> &EngineClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, method: Method, path: String, body: Option<Value>) -> ClientResult<()> {
        let endpoint = format!("{} {}", method, path);
        debug!("Sending engine command: {}", endpoint);

        let mut request = self.http.request(method, self.url(&path));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(&endpoint, e))?;
        check_status(&endpoint, response).await?;

        debug!("Engine acknowledged command: {}", endpoint);
        Ok(())
    }
}

#[async_trait]
impl CommandClient for EngineRestClient {
    async fn create_instance(
        &self,
        process_definition_id: &str,
        variables: &Variables,
    ) -> ClientResult<()> {
        self.send(
            Method::POST,
            "/v2/process-instances".to_string(),
            Some(create_instance_body(process_definition_id, variables)),
        )
        .await
    }

    async fn cancel_instance(&self, instance_key: i64) -> ClientResult<()> {
        self.send(
            Method::POST,
            format!("/v2/process-instances/{}/cancellation", instance_key),
            None,
        )
        .await
    }

    async fn publish_message(
        &self,
        name: &str,
        correlation_key: &str,
        time_to_live: chrono::Duration,
        variables: &Variables,
    ) -> ClientResult<()> {
        self.send(
            Method::POST,
            "/v2/messages/publication".to_string(),
            Some(publish_message_body(name, correlation_key, time_to_live, variables)),
        )
        .await
    }

    async fn set_variables(
        &self,
        element_instance_key: i64,
        variables: &Variables,
    ) -> ClientResult<()> {
        self.send(
            Method::PUT,
            format!("/v2/element-instances/{}/variables", element_instance_key),
            Some(json!({ "variables": variables, "local": false })),
        )
        .await
    }

    async fn update_retries(&self, job_key: i64, retries: i32) -> ClientResult<()> {
        self.send(
            Method::PATCH,
            format!("/v2/jobs/{}", job_key),
            Some(json!({ "changeset": { "retries": retries } })),
        )
        .await
    }

    async fn resolve_incident(&self, incident_key: i64) -> ClientResult<()> {
        self.send(
            Method::POST,
            format!("/v2/incidents/{}/resolution", incident_key),
            None,
        )
        .await
    }
}

/// Version -1 asks the engine for the latest deployed version
fn create_instance_body(process_definition_id: &str, variables: &Variables) -> Value {
    json!({
        "processDefinitionId": process_definition_id,
        "processDefinitionVersion": -1,
        "variables": variables,
    })
}

fn publish_message_body(
    name: &str,
    correlation_key: &str,
    time_to_live: chrono::Duration,
    variables: &Variables,
) -> Value {
    json!({
        "name": name,
        "correlationKey": correlation_key,
        "timeToLive": time_to_live.num_milliseconds(),
        "variables": variables,
    })
}
