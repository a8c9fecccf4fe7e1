// Operations Gateway
//
// Translates decoded operator requests into workflow engine commands and
// search index queries. Most operations are a single call; bulk cancellation
// and incident resolution carry the real orchestration.

pub mod bulk;
pub mod definitions;
pub mod error;
pub mod incident;
pub mod types;

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::{CommandClient, IndexQueryClient, Variables};
use crate::utils::serde_helpers::parse_i64;
use incident::IncidentResolution;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult, IncidentStep};
pub use types::{
    BulkCancelRequest, BulkCancelResult, DefinitionQuery, GatewayOptions, HealthStatus,
    IncidentRef, IncidentResolveRequest, ProcessDefinitionEntry, ProcessDefinitionIndex,
};

/// Stateless request handlers over injected engine and index clients
#[derive(Clone)]
pub struct OperationsGateway {
    commands: Arc<dyn CommandClient>,
    index: Arc<dyn IndexQueryClient>,
    options: Arc<GatewayOptions>,
}

impl OperationsGateway {
    /// Create a new gateway
    pub fn new(
        commands: Arc<dyn CommandClient>,
        index: Arc<dyn IndexQueryClient>,
        options: GatewayOptions,
    ) -> Self {
        Self {
            commands,
            index,
            options: Arc::new(options),
        }
    }

    /// Get the runtime options
    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Start an instance of the latest version of a process definition
    pub async fn start_workflow(&self, process_definition_id: &str, body: Value) -> GatewayResult<()> {
        let process_definition_id = non_empty(process_definition_id, "processDefinitionId")?;
        let variables = variables_from(body, "request body")?;

        info!("Starting new workflow {}", process_definition_id);
        self.commands
            .create_instance(process_definition_id, &variables)
            .await
            .map_err(|e| GatewayError::upstream("create-instance", e))
    }

    /// Cancel every listed instance, isolating each id's failure
    pub async fn bulk_cancel(&self, body: Value) -> GatewayResult<BulkCancelResult> {
        let request: BulkCancelRequest = decode(body)?;
        let ids = request
            .process_ids
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                parse_i64(raw).map_err(|e| GatewayError::invalid(format!("processId[{}]: {}", i, e)))
            })
            .collect::<GatewayResult<Vec<i64>>>()?;

        info!("Bulk cancellation of {} process instances", ids.len());
        Ok(bulk::cancel_all(
            Arc::clone(&self.commands),
            &ids,
            self.options.bulk_max_concurrency,
        )
        .await)
    }

    /// Cancel a single instance
    pub async fn cancel_workflow(&self, workflow_instance_key: &str) -> GatewayResult<()> {
        let key = workflow_instance_key.trim().parse::<i64>().map_err(|_| {
            GatewayError::invalid(format!(
                "workflowInstanceKey '{}' is not a 64-bit integer",
                workflow_instance_key
            ))
        })?;

        info!("Operator workflow cancel {}", key);
        self.commands
            .cancel_instance(key)
            .await
            .map_err(|e| GatewayError::upstream("cancel-instance", e))
    }

    /// Deliver the recovery message an instance is waiting on
    pub async fn resolve_transaction(&self, transaction_id: &str, body: Value) -> GatewayResult<()> {
        let transaction_id = non_empty(transaction_id, "transactionId")?;
        let variables = variables_from(body, "request body")?;

        info!(
            "Operator transaction resolve {} ({} variables)",
            transaction_id,
            variables.len()
        );
        self.commands
            .publish_message(
                &self.options.recovery_message_name,
                transaction_id,
                self.options.message_ttl,
                &variables,
            )
            .await
            .map_err(|e| GatewayError::upstream("publish-message", e))
    }

    /// Set variables, update job retries, then resolve the incident
    pub async fn resolve_job_incident(&self, body: Value) -> GatewayResult<()> {
        let resolution = IncidentResolution::for_job(decode(body)?)?;
        info!("Operator job resolve for incident {}", resolution.incident_key());
        resolution.run(self.commands.as_ref()).await
    }

    /// Set variables, then resolve the incident; no job is involved
    pub async fn resolve_workflow_incident(&self, body: Value) -> GatewayResult<()> {
        let resolution = IncidentResolution::for_workflow(decode(body)?);
        info!("Operator workflow resolve for incident {}", resolution.incident_key());
        resolution.run(self.commands.as_ref()).await
    }

    /// Map each process definition name to its deployed definition keys
    pub async fn process_definitions(&self) -> GatewayResult<ProcessDefinitionIndex> {
        let query = &self.options.definitions;
        let response = self
            .index
            .aggregate(&query.index_pattern, &query.aggregations())
            .await
            .map_err(|e| GatewayError::upstream("definition-aggregation", e))?;

        let index = definitions::reshape(&response).map_err(|message| {
            GatewayError::upstream(
                "definition-aggregation",
                crate::client::ClientError::invalid_response(
                    format!("aggregation over {}", query.index_pattern),
                    message,
                ),
            )
        })?;

        if index.len() >= query.name_bucket_limit {
            warn!(
                "Definition index hit the name bucket limit of {}; further names are not shown",
                query.name_bucket_limit
            );
        }
        Ok(index)
    }

    /// Probe the search index; failures become a "down" status
    pub async fn health(&self) -> HealthStatus {
        match self.index.list_indices().await {
            Ok(_) => HealthStatus::up(),
            Err(e) => {
                warn!("Search index health check failed: {}", e);
                HealthStatus::down(e.to_string())
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: Value) -> GatewayResult<T> {
    serde_json::from_value(body).map_err(|e| GatewayError::invalid(e.to_string()))
}

fn variables_from(body: Value, what: &str) -> GatewayResult<Variables> {
    match body {
        Value::Object(variables) => Ok(variables),
        other => Err(GatewayError::invalid(format!(
            "{} must be a JSON object, got {}",
            what,
            json_kind(&other)
        ))),
    }
}

/// Reject blank path values; the value itself is forwarded untouched
fn non_empty<'a>(value: &'a str, name: &str) -> GatewayResult<&'a str> {
    if value.trim().is_empty() {
        return Err(GatewayError::invalid(format!("{} must not be empty", name)));
    }
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
