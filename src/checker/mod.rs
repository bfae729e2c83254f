//! Check engine: dispatches probes, classifies outcomes, aggregates results.
//!
//! Each endpoint in the input list is probed exactly once per call, possibly
//! concurrently, and the results come back in input order. Failures of any
//! kind, including a strategy panicking, become critical results; nothing
//! aborts the batch.

mod aggregate;
mod classify;

pub use aggregate::*;
pub use classify::*;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;

use crate::config::{CheckKind, Endpoint};
use crate::model::{HealthState, ProbeResult};
use crate::probe::{run_probe, ProbeError, ECHO_COUNT};

/// Upper bound on probes in flight at once.
const MAX_CONCURRENT_PROBES: usize = 8;

/// Extra time allowed beyond a strategy's own timeout before the dispatcher
/// gives up on it. Strategies enforce their own deadlines; this guard only
/// catches ones that fail to.
const TEARDOWN_GRACE: Duration = Duration::from_secs(1);

/// Run one check cycle over the given endpoints.
pub async fn run_checks(endpoints: &[Endpoint]) -> Vec<ProbeResult> {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PROBES));

    let handles: Vec<_> = endpoints
        .iter()
        .cloned()
        .map(|endpoint| {
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                // The semaphore lives for the whole call and is never
                // closed, so acquisition cannot fail
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("probe semaphore closed");
                check_endpoint(&endpoint).await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (endpoint, handle) in endpoints.iter().zip(handles) {
        match handle.await {
            Ok(result) => results.push(result),
            // A panicking strategy must not take the batch down with it
            Err(e) => {
                tracing::error!("probe task for {} failed: {}", endpoint.name, e);
                results.push(task_failure_result(endpoint, &format!("Error: {}", e)));
            }
        }
    }

    results
}

/// Probe one endpoint and classify the outcome. Total runtime is bounded by
/// the endpoint's timeout (times the echo count for ping) plus teardown.
async fn check_endpoint(endpoint: &Endpoint) -> ProbeResult {
    if let CheckKind::Unknown(kind) = &endpoint.kind {
        tracing::warn!("unknown check type for {}: {}", endpoint.name, kind);
        return classify(
            endpoint,
            Err(ProbeError::Config(format!("unknown check type: {}", kind))),
        );
    }

    let timeout = endpoint.timeout();
    let budget = match endpoint.kind {
        // Ping sends ECHO_COUNT echoes, each with its own deadline
        CheckKind::Ping => timeout * u32::from(ECHO_COUNT),
        _ => timeout,
    } + TEARDOWN_GRACE;

    let outcome = match tokio::time::timeout(budget, run_probe(endpoint)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ProbeError::Timeout(timeout)),
    };

    classify(endpoint, outcome)
}

fn task_failure_result(endpoint: &Endpoint, detail: &str) -> ProbeResult {
    ProbeResult {
        name: endpoint.name.clone(),
        kind: endpoint.kind.clone(),
        status: HealthState::Critical,
        available: false,
        response_time_ms: None,
        detail: truncate_detail(detail),
        timestamp: Utc::now(),
        critical: endpoint.critical,
    }
}
