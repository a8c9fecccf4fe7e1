// Error types for gateway operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientError;

/// One step of the incident recovery sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncidentStep {
    SetVariables,
    UpdateRetries,
    ResolveIncident,
}

impl IncidentStep {
    /// Name of the engine command behind this step
    pub fn operation(&self) -> &'static str {
        match self {
            IncidentStep::SetVariables => "set-variables",
            IncidentStep::UpdateRetries => "update-retries",
            IncidentStep::ResolveIncident => "resolve-incident",
        }
    }
}

impl std::fmt::Display for IncidentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.operation())
    }
}

fn join_steps(steps: &[IncidentStep]) -> String {
    steps
        .iter()
        .map(IncidentStep::operation)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of a gateway operation
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The caller sent a payload or path parameter we cannot use
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A remote call failed before anything was applied
    #[error("{operation} failed: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    /// An incident recovery sequence stopped after some steps were applied.
    /// Applied steps are not rolled back.
    #[error(
        "incident {incident_key} partially resolved: {failed_step} failed after [{}]: {source}",
        join_steps(.completed_steps)
    )]
    PartialIncidentResolution {
        incident_key: i64,
        completed_steps: Vec<IncidentStep>,
        failed_step: IncidentStep,
        #[source]
        source: ClientError,
    },
}

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn upstream(operation: &'static str, source: ClientError) -> Self {
        Self::Upstream { operation, source }
    }

    /// Whether the caller, rather than a remote system, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::InvalidRequest(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
