// Bulk cancellation fan-out
//
// The engine has no multi-instance cancel, so a batch is emulated with one
// cancel command per id. Each id is an isolated unit of work: its failure is
// captured as a value and reported, never unwound into the batch.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::types::BulkCancelResult;
use crate::client::{ClientResult, CommandClient};

/// Cancel every id on a pool of at most `max_concurrency` in-flight calls.
///
/// Outcomes are collected by input position, so the returned partition keeps
/// input order whatever order the calls finish in.
pub(crate) async fn cancel_all(
    client: Arc<dyn CommandClient>,
    ids: &[i64],
    max_concurrency: usize,
) -> BulkCancelResult {
    let started_at = Utc::now();
    let semaphore = Arc::new(Semaphore::new(
        max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
    ));
    let mut tasks = JoinSet::new();

    for (position, id) in ids.iter().copied().enumerate() {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring only waits
            let _permit = semaphore.acquire_owned().await.ok();
            debug!("Cancelling process instance {}", id);
            (position, client.cancel_instance(id).await)
        });
    }

    let mut outcomes: Vec<Option<ClientResult<()>>> = Vec::with_capacity(ids.len());
    outcomes.resize_with(ids.len(), || None);

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, outcome)) => outcomes[position] = Some(outcome),
            // Left as None; the id is reported as failed below
            Err(e) => error!("Cancellation task did not complete: {}", e),
        }
    }

    let mut result = BulkCancelResult::default();
    for (id, outcome) in ids.iter().copied().zip(outcomes) {
        match outcome {
            Some(Ok(())) => result.record_success(id),
            Some(Err(e)) => {
                error!("Cancellation of process id {} failed: {}", id, e);
                result.record_failure(id);
            }
            None => {
                error!("Cancellation of process id {} failed: task aborted", id);
                result.record_failure(id);
            }
        }
    }

    info!(
        "Bulk cancellation finished: {} cancelled, {} failed in {}ms",
        result.success_count,
        result.failure_count,
        (Utc::now() - started_at).num_milliseconds()
    );

    result
}
