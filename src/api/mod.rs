// REST surface of the operations gateway
//
// Maps operator HTTP requests onto `OperationsGateway` operations and gateway
// errors onto status codes. Every request runs inside a span carrying a fresh
// request id and the route id.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use crate::gateway::{
    BulkCancelResult, GatewayError, HealthStatus, OperationsGateway, ProcessDefinitionIndex,
};

/// Build the operator router over a gateway
pub fn build_router(gateway: OperationsGateway) -> Router {
    Router::new()
        .route("/channel/workflow", put(bulk_cancel))
        .route("/channel/workflow/resolve", post(resolve_workflow_incident))
        .route("/channel/workflow/:id", post(start_workflow))
        .route("/channel/workflow/:id/cancel", post(cancel_workflow))
        .route(
            "/channel/transaction/:transaction_id/resolve",
            post(resolve_transaction),
        )
        .route("/channel/job/resolve", post(resolve_job_incident))
        .route("/channel/process", get(process_definitions))
        .route("/es/health", get(health))
        .with_state(gateway)
}

/// HTTP view of a gateway failure
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] GatewayError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { .. } | GatewayError::PartialIncidentResolution { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn body(&self) -> Value {
        let message = self.0.to_string();
        match &self.0 {
            GatewayError::InvalidRequest(_) => json!({ "error": message }),
            GatewayError::Upstream { operation, .. } => {
                json!({ "error": message, "operation": operation })
            }
            GatewayError::PartialIncidentResolution {
                incident_key,
                completed_steps,
                failed_step,
                ..
            } => json!({
                "error": message,
                "incidentKey": incident_key,
                "completedSteps": completed_steps,
                "failedStep": failed_step,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            tracing::warn!("Rejected request: {}", self.0);
        } else {
            tracing::error!("Request failed: {}", self.0);
        }
        (self.status(), Json(self.body())).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Decode a request body as JSON whatever content type the caller declared
fn json_body(body: &[u8]) -> ApiResult<Value> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError(GatewayError::invalid(format!(
            "request body is not valid JSON: {}",
            e
        )))
    })
}

fn request_span(route: &'static str) -> Span {
    info_span!("request", route, request_id = %Uuid::new_v4())
}

async fn start_workflow(
    State(gateway): State<OperationsGateway>,
    Path(process_definition_id): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    async move {
        let body = json_body(&body)?;
        gateway.start_workflow(&process_definition_id, body).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    }
    .instrument(request_span("workflow-start"))
    .await
}

async fn bulk_cancel(
    State(gateway): State<OperationsGateway>,
    body: Bytes,
) -> ApiResult<Json<BulkCancelResult>> {
    async move {
        let body = json_body(&body)?;
        Ok::<_, ApiError>(Json(gateway.bulk_cancel(body).await?))
    }
    .instrument(request_span("bulk-cancellation"))
    .await
}

async fn health(State(gateway): State<OperationsGateway>) -> Json<HealthStatus> {
    Json(gateway.health().instrument(request_span("es-health")).await)
}

async fn process_definitions(
    State(gateway): State<OperationsGateway>,
) -> ApiResult<Json<ProcessDefinitionIndex>> {
    async move { Ok::<_, ApiError>(Json(gateway.process_definitions().await?)) }
        .instrument(request_span("get-process-definition-key-name"))
        .await
}

async fn resolve_transaction(
    State(gateway): State<OperationsGateway>,
    Path(transaction_id): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    async move {
        let body = json_body(&body)?;
        gateway.resolve_transaction(&transaction_id, body).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    }
    .instrument(request_span("transaction-resolve"))
    .await
}

async fn resolve_job_incident(
    State(gateway): State<OperationsGateway>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    async move {
        let body = json_body(&body)?;
        gateway.resolve_job_incident(body).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    }
    .instrument(request_span("job-resolve"))
    .await
}

async fn resolve_workflow_incident(
    State(gateway): State<OperationsGateway>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    async move {
        let body = json_body(&body)?;
        gateway.resolve_workflow_incident(body).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    }
    .instrument(request_span("workflow-resolve"))
    .await
}

async fn cancel_workflow(
    State(gateway): State<OperationsGateway>,
    Path(workflow_instance_key): Path<String>,
) -> ApiResult<StatusCode> {
    async move {
        gateway.cancel_workflow(&workflow_instance_key).await?;
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    }
    .instrument(request_span("workflow-cancel"))
    .await
}
