// Incident recovery sequence
//
// Recovering a stuck element is a short linear saga: set the corrected
// variables, give the job new retries (job incidents only), then resolve the
// incident. Steps run strictly in order and the first failure stops the
// sequence. There is no compensation; applied steps stay applied.

use serde_json::Value;
use tracing::{error, info, warn};

use super::error::{GatewayError, GatewayResult, IncidentStep};
use super::types::IncidentResolveRequest;
use crate::client::{CommandClient, Variables};
use crate::utils::serde_helpers::parse_i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IncidentKind {
    /// A task-level incident whose job needs fresh retries
    Job { job_key: i64, retries: i32 },
    /// A workflow-level incident with no job behind it
    Workflow,
}

/// A validated, ready-to-run incident recovery
#[derive(Debug, Clone)]
pub(crate) struct IncidentResolution {
    incident_key: i64,
    element_instance_key: i64,
    kind: IncidentKind,
    variables: Variables,
}

impl IncidentResolution {
    /// Build a job incident recovery; `jobKey` and `newRetries` are required
    pub fn for_job(request: IncidentResolveRequest) -> GatewayResult<Self> {
        let incident = request.incident;
        let job_key = required_i64(incident.job_key.as_ref(), "incident.jobKey")?;
        let new_retries = required_i64(incident.new_retries.as_ref(), "incident.newRetries")?;
        let retries = i32::try_from(new_retries)
            .ok()
            .filter(|r| *r >= 0)
            .ok_or_else(|| {
                GatewayError::invalid(format!(
                    "incident.newRetries must be between 0 and {}, got {}",
                    i32::MAX,
                    new_retries
                ))
            })?;

        Ok(Self {
            incident_key: incident.key,
            element_instance_key: incident.element_instance_key,
            kind: IncidentKind::Job { job_key, retries },
            variables: request.variables,
        })
    }

    /// Build a workflow incident recovery; job fields are ignored
    pub fn for_workflow(request: IncidentResolveRequest) -> Self {
        Self {
            incident_key: request.incident.key,
            element_instance_key: request.incident.element_instance_key,
            kind: IncidentKind::Workflow,
            variables: request.variables,
        }
    }

    pub fn incident_key(&self) -> i64 {
        self.incident_key
    }

    /// The steps this recovery will run, in order
    pub fn steps(&self) -> Vec<IncidentStep> {
        match self.kind {
            IncidentKind::Job { .. } => vec![
                IncidentStep::SetVariables,
                IncidentStep::UpdateRetries,
                IncidentStep::ResolveIncident,
            ],
            IncidentKind::Workflow => {
                vec![IncidentStep::SetVariables, IncidentStep::ResolveIncident]
            }
        }
    }

    /// Run the steps in order, stopping at the first failure.
    ///
    /// A failure on the first step is a plain upstream error since nothing was
    /// applied. Later failures report which steps already took effect.
    pub async fn run(&self, client: &dyn CommandClient) -> GatewayResult<()> {
        let mut completed = Vec::new();

        for step in self.steps() {
            info!(
                "Incident {}: running {} (element instance {})",
                self.incident_key, step, self.element_instance_key
            );

            let outcome = match step {
                IncidentStep::SetVariables => {
                    client
                        .set_variables(self.element_instance_key, &self.variables)
                        .await
                }
                IncidentStep::UpdateRetries => match self.kind {
                    IncidentKind::Job { job_key, retries } => {
                        client.update_retries(job_key, retries).await
                    }
                    // steps() never schedules this for workflow incidents
                    IncidentKind::Workflow => Ok(()),
                },
                IncidentStep::ResolveIncident => client.resolve_incident(self.incident_key).await,
            };

            if let Err(source) = outcome {
                if completed.is_empty() {
                    error!("Incident {}: {} failed: {}", self.incident_key, step, source);
                    return Err(GatewayError::upstream(step.operation(), source));
                }

                warn!(
                    "Incident {}: {} failed after {:?} were applied; manual follow-up needed: {}",
                    self.incident_key, step, completed, source
                );
                return Err(GatewayError::PartialIncidentResolution {
                    incident_key: self.incident_key,
                    completed_steps: completed,
                    failed_step: step,
                    source,
                });
            }

            completed.push(step);
        }

        info!("Incident {} resolved", self.incident_key);
        Ok(())
    }
}

fn required_i64(value: Option<&Value>, name: &str) -> GatewayResult<i64> {
    match value {
        None | Some(Value::Null) => Err(GatewayError::invalid(format!("{} is required", name))),
        Some(raw) => parse_i64(raw).map_err(|e| GatewayError::invalid(format!("{}: {}", name, e))),
    }
}
