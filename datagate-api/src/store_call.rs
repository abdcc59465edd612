//! Bounded calls to the external stores.

use std::future::Future;
use std::time::{Duration, Instant};

use datagate_core::{StoreError, StoreKind, StoreResult};

use crate::telemetry::metrics;

/// Run one store call under `limit`, recording its latency and status.
///
/// An elapsed limit becomes `StoreError::Timeout`; the call's own errors pass
/// through unchanged.
pub(crate) async fn bounded<T, F>(
    store: StoreKind,
    operation: &'static str,
    limit: Duration,
    call: F,
) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    let start = Instant::now();
    let result = match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::timeout(store, operation, limit)),
    };
    record(store, operation, &result, start);
    result
}

pub(crate) fn record<T>(
    store: StoreKind,
    operation: &'static str,
    result: &StoreResult<T>,
    start: Instant,
) {
    let status = match result {
        Ok(_) => "success",
        Err(err) if err.is_timeout() => "timeout",
        Err(_) => "error",
    };
    if let Some(metrics) = metrics() {
        metrics.record_store_call(
            store.as_str(),
            operation,
            status,
            start.elapsed().as_secs_f64(),
        );
    }
}
