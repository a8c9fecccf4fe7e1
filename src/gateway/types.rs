// Request and response types for gateway operations
//
// Everything here is request-scoped: decoded from an inbound payload, used to
// drive remote calls, then dropped once the response is built.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::client::Variables;
use crate::utils::serde_helpers::lenient_i64;

/// Tunables the gateway operations need at runtime
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOptions {
    /// Message name published by the transaction resolver
    pub recovery_message_name: String,
    /// Time-to-live of the published recovery message
    pub message_ttl: chrono::Duration,
    /// Upper bound on in-flight cancel calls during a bulk cancellation
    pub bulk_max_concurrency: usize,
    /// Shape of the process definition aggregation
    pub definitions: DefinitionQuery,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            recovery_message_name: "operator-manual-recovery".to_string(),
            message_ttl: chrono::Duration::milliseconds(30_000),
            bulk_max_concurrency: 8,
            definitions: DefinitionQuery::default(),
        }
    }
}

/// Where and how process definitions are aggregated in the search index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionQuery {
    /// Index pattern holding exported engine records
    pub index_pattern: String,
    /// Field holding the process definition name
    pub name_field: String,
    /// Field holding the numeric process definition key
    pub key_field: String,
    /// Most frequent names returned
    pub name_bucket_limit: usize,
    /// Most frequent keys returned per name
    pub key_bucket_limit: usize,
}

impl Default for DefinitionQuery {
    fn default() -> Self {
        Self {
            index_pattern: "zeebe-*".to_string(),
            name_field: "value.bpmnProcessId".to_string(),
            key_field: "value.processDefinitionKey".to_string(),
            name_bucket_limit: 5,
            key_bucket_limit: 1005,
        }
    }
}

/// Body of a bulk cancellation; ids are validated before any call is made
#[derive(Debug, Clone, Deserialize)]
pub struct BulkCancelRequest {
    #[serde(rename = "processId")]
    pub process_ids: Vec<Value>,
}

/// Per-id audit of a bulk cancellation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCancelResult {
    /// Ids whose cancel command was acknowledged, in input order
    pub success: Vec<i64>,
    /// Ids whose cancel command failed, in input order
    pub failed: Vec<i64>,
    #[serde(rename = "cancellationSuccessful")]
    pub success_count: usize,
    #[serde(rename = "cancellationFailed")]
    pub failure_count: usize,
}

impl BulkCancelResult {
    pub fn record_success(&mut self, id: i64) {
        self.success.push(id);
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, id: i64) {
        self.failed.push(id);
        self.failure_count += 1;
    }

    /// Total number of ids attempted
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }
}

/// Body of both incident resolution operations
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentResolveRequest {
    pub incident: IncidentRef,
    pub variables: Variables,
}

/// The incident being recovered and the keys of what it blocks
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRef {
    #[serde(deserialize_with = "lenient_i64")]
    pub key: i64,
    /// Only read for job incidents, so it stays undecoded until then
    #[serde(default)]
    pub job_key: Option<Value>,
    #[serde(deserialize_with = "lenient_i64")]
    pub element_instance_key: i64,
    /// Only read for job incidents
    #[serde(default)]
    pub new_retries: Option<Value>,
}

/// Result of probing the search index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HealthStatus {
    pub fn up() -> Self {
        Self {
            status: "UP".to_string(),
            reason: None,
        }
    }

    pub fn down(reason: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            reason: Some(reason.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

/// Definition keys deployed under one process name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDefinitionEntry {
    pub name: String,
    pub keys: Vec<i64>,
}

/// Process definition name to definition keys, in the order the index ranked them.
///
/// Serialized as a JSON object whose members keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessDefinitionIndex {
    entries: Vec<ProcessDefinitionEntry>,
}

impl ProcessDefinitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append keys for a name; a repeated name extends the existing entry
    pub fn insert(&mut self, name: String, keys: Vec<i64>) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.keys.extend(keys),
            None => self.entries.push(ProcessDefinitionEntry { name, keys }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[i64]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.keys.as_slice())
    }

    pub fn entries(&self) -> &[ProcessDefinitionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ProcessDefinitionIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.keys)?;
        }
        map.end()
    }
}
