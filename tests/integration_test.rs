// Integration tests for the operations gateway REST surface

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use ops_gateway::client::{ClientError, ClientResult, CommandClient, IndexQueryClient, Variables};
use ops_gateway::config::GatewayConfig;
use ops_gateway::{build_router, OperationsGateway};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(String, Value),
    Cancel(i64),
    Publish(String, String, i64, Value),
    SetVariables(i64, Value),
    UpdateRetries(i64, i32),
    ResolveIncident(i64),
}

#[derive(Default)]
struct FakeEngine {
    failing_cancels: HashSet<i64>,
    fail_retries: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeEngine {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandClient for FakeEngine {
    async fn create_instance(&self, id: &str, variables: &Variables) -> ClientResult<()> {
        self.record(Call::Create(id.to_string(), Value::Object(variables.clone())));
        Ok(())
    }

    async fn cancel_instance(&self, key: i64) -> ClientResult<()> {
        self.record(Call::Cancel(key));
        if self.failing_cancels.contains(&key) {
            return Err(ClientError::rejected(
                format!("POST /v2/process-instances/{}/cancellation", key),
                404,
                "process instance not found",
            ));
        }
        Ok(())
    }

    async fn publish_message(
        &self,
        name: &str,
        correlation_key: &str,
        ttl: chrono::Duration,
        variables: &Variables,
    ) -> ClientResult<()> {
        self.record(Call::Publish(
            name.to_string(),
            correlation_key.to_string(),
            ttl.num_milliseconds(),
            Value::Object(variables.clone()),
        ));
        Ok(())
    }

    async fn set_variables(&self, key: i64, variables: &Variables) -> ClientResult<()> {
        self.record(Call::SetVariables(key, Value::Object(variables.clone())));
        Ok(())
    }

    async fn update_retries(&self, job_key: i64, retries: i32) -> ClientResult<()> {
        self.record(Call::UpdateRetries(job_key, retries));
        if self.fail_retries {
            return Err(ClientError::rejected(
                format!("PATCH /v2/jobs/{}", job_key),
                404,
                "job not found",
            ));
        }
        Ok(())
    }

    async fn resolve_incident(&self, incident_key: i64) -> ClientResult<()> {
        self.record(Call::ResolveIncident(incident_key));
        Ok(())
    }
}

struct FakeIndex {
    reachable: bool,
    response: Value,
}

impl Default for FakeIndex {
    fn default() -> Self {
        Self {
            reachable: true,
            response: json!({ "aggregations": {} }),
        }
    }
}

#[async_trait]
impl IndexQueryClient for FakeIndex {
    async fn aggregate(&self, _pattern: &str, _aggregations: &Value) -> ClientResult<Value> {
        Ok(self.response.clone())
    }

    async fn list_indices(&self) -> ClientResult<Vec<String>> {
        if self.reachable {
            Ok(vec!["zeebe-record_job_8.5.0_2024-05-01".to_string()])
        } else {
            Err(ClientError::rejected("GET /_cat/indices", 503, "cluster unavailable"))
        }
    }
}

fn router(engine: Arc<FakeEngine>, index: FakeIndex) -> Router {
    let gateway = OperationsGateway::new(
        engine,
        Arc::new(index),
        GatewayConfig::default().gateway_options(),
    );
    build_router(gateway)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_start_workflow() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let (status, _) = send(
        app,
        Method::POST,
        "/channel/workflow/PayerFundTransfer",
        Some(json!({ "amount": 10 })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        engine.calls(),
        vec![Call::Create("PayerFundTransfer".to_string(), json!({ "amount": 10 }))]
    );
    Ok(())
}

#[tokio::test]
async fn test_bulk_cancel_reports_each_id() -> Result<()> {
    let engine = Arc::new(FakeEngine {
        failing_cancels: HashSet::from([2]),
        ..Default::default()
    });
    let app = router(engine.clone(), FakeIndex::default());

    let (status, body) = send(
        app,
        Method::PUT,
        "/channel/workflow",
        Some(json!({ "processId": [1, "2", 3] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": [1, 3],
            "failed": [2],
            "cancellationSuccessful": 2,
            "cancellationFailed": 1,
        })
    );
    assert_eq!(engine.calls().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_bulk_cancel_rejects_malformed_ids_without_calls() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let (status, body) = send(
        app,
        Method::PUT,
        "/channel/workflow",
        Some(json!({ "processId": [1, "abc"] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("processId[1]"));
    assert!(engine.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/channel/job/resolve")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(engine.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_transaction_resolve_publishes_recovery_message() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let (status, _) = send(
        app,
        Method::POST,
        "/channel/transaction/tx-42/resolve",
        Some(json!({ "status": "COMPLETED" })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        engine.calls(),
        vec![Call::Publish(
            "operator-manual-recovery".to_string(),
            "tx-42".to_string(),
            30_000,
            json!({ "status": "COMPLETED" }),
        )]
    );
    Ok(())
}

#[tokio::test]
async fn test_job_resolve_runs_all_steps_in_order() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let (status, _) = send(
        app,
        Method::POST,
        "/channel/job/resolve",
        Some(json!({
            "incident": { "key": "100", "jobKey": 200, "elementInstanceKey": 300, "newRetries": 3 },
            "variables": { "retry": true },
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        engine.calls(),
        vec![
            Call::SetVariables(300, json!({ "retry": true })),
            Call::UpdateRetries(200, 3),
            Call::ResolveIncident(100),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_job_resolve_stops_after_failed_retries_update() -> Result<()> {
    let engine = Arc::new(FakeEngine {
        fail_retries: true,
        ..Default::default()
    });
    let app = router(engine.clone(), FakeIndex::default());

    let (status, body) = send(
        app,
        Method::POST,
        "/channel/job/resolve",
        Some(json!({
            "incident": { "key": 100, "jobKey": 200, "elementInstanceKey": 300, "newRetries": 1 },
            "variables": {},
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["incidentKey"], json!(100));
    assert_eq!(body["completedSteps"], json!(["setVariables"]));
    assert_eq!(body["failedStep"], json!("updateRetries"));
    assert!(!engine.calls().contains(&Call::ResolveIncident(100)));
    Ok(())
}

#[tokio::test]
async fn test_workflow_resolve_skips_retries() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let (status, _) = send(
        app,
        Method::POST,
        "/channel/workflow/resolve",
        Some(json!({
            "incident": { "key": 7, "elementInstanceKey": 8 },
            "variables": { "fixed": 1 },
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        engine.calls(),
        vec![
            Call::SetVariables(8, json!({ "fixed": 1 })),
            Call::ResolveIncident(7),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_workflow_resolve_ignores_malformed_job_fields() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let (status, _) = send(
        app,
        Method::POST,
        "/channel/workflow/resolve",
        Some(json!({
            "incident": { "key": 1, "elementInstanceKey": 2, "jobKey": "n/a", "newRetries": 1.5 },
            "variables": {},
        })),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(
        engine.calls(),
        vec![Call::SetVariables(2, json!({})), Call::ResolveIncident(1)]
    );
    Ok(())
}

#[tokio::test]
async fn test_body_without_content_type_is_accepted() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/channel/transaction/tx-7/resolve")
        .body(Body::from(r#"{"status":"COMPLETED"}"#))?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        engine.calls(),
        vec![Call::Publish(
            "operator-manual-recovery".to_string(),
            "tx-7".to_string(),
            30_000,
            json!({ "status": "COMPLETED" }),
        )]
    );
    Ok(())
}

#[tokio::test]
async fn test_single_cancel() -> Result<()> {
    let engine = Arc::new(FakeEngine::default());
    let app = router(engine.clone(), FakeIndex::default());

    let (status, _) = send(app.clone(), Method::POST, "/channel/workflow/2251799813685249/cancel", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(engine.calls(), vec![Call::Cancel(2251799813685249)]);

    let (status, _) = send(app, Method::POST, "/channel/workflow/not-a-key/cancel", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(engine.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_single_cancel_failure_is_bad_gateway() -> Result<()> {
    let engine = Arc::new(FakeEngine {
        failing_cancels: HashSet::from([5]),
        ..Default::default()
    });
    let app = router(engine, FakeIndex::default());

    let (status, body) = send(app, Method::POST, "/channel/workflow/5/cancel", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["operation"], json!("cancel-instance"));
    Ok(())
}

#[tokio::test]
async fn test_process_definitions_are_reshaped() -> Result<()> {
    let index = FakeIndex {
        response: json!({
            "aggregations": {
                "sterms#processId": {
                    "buckets": [
                        {
                            "key": "PayerFundTransfer",
                            "doc_count": 40,
                            "lterms#defKey": { "buckets": [
                                { "key": 2251799813685250_i64, "doc_count": 30 },
                                { "key": 2251799813685260_i64, "doc_count": 10 }
                            ] }
                        },
                        {
                            "key": "InboundSettlement",
                            "doc_count": 5,
                            "lterms#defKey": { "buckets": [
                                { "key": 2251799813685270_i64, "doc_count": 5 }
                            ] }
                        }
                    ]
                }
            }
        }),
        ..Default::default()
    };
    let app = router(Arc::new(FakeEngine::default()), index);

    let (status, body) = send(app, Method::GET, "/channel/process", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "PayerFundTransfer": [2251799813685250_i64, 2251799813685260_i64],
            "InboundSettlement": [2251799813685270_i64],
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_health_reports_up_and_down() -> Result<()> {
    let app = router(Arc::new(FakeEngine::default()), FakeIndex::default());
    let (status, body) = send(app, Method::GET, "/es/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "UP" }));

    let app = router(
        Arc::new(FakeEngine::default()),
        FakeIndex {
            reachable: false,
            ..Default::default()
        },
    );
    let (status, body) = send(app, Method::GET, "/es/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("down"));
    assert!(body["reason"].as_str().unwrap().contains("cluster unavailable"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let app = router(Arc::new(FakeEngine::default()), FakeIndex::default());
    let (status, _) = send(app, Method::GET, "/channel/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
