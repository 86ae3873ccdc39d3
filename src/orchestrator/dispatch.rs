//! Concurrent fan-out to every registered backend.
//!
//! All backend calls run concurrently within the caller's task and are
//! joined before fusion. Each call is bounded by the per-backend timeout.
//! Results come back in registration order regardless of completion order.

use std::time::Duration;

use futures::future::{join_all, try_join_all};

use crate::backend::{BackendConfig, RegisteredBackend};
use crate::error::{FusionError, Result};
use crate::types::Item;

/// The result of invoking one backend.
#[derive(Debug)]
pub struct BackendOutcome {
    /// Identifier the backend was registered under.
    pub backend: String,
    /// The backend's fusion weight.
    pub weight: f64,
    /// Ranked list, or the failure that replaced it.
    pub result: Result<Vec<Item>>,
}

/// Invoke every backend concurrently and collect a result-or-error for each.
///
/// `configs` must be the resolved effective configuration for each entry of
/// `backends`, in the same order.
///
/// One backend's failure never stops the others: every call runs to
/// completion (or timeout) and its outcome is reported.
pub async fn dispatch_all(
    query: &str,
    backends: &[RegisteredBackend],
    configs: &[BackendConfig],
    timeout: Duration,
) -> Vec<BackendOutcome> {
    debug_assert_eq!(backends.len(), configs.len());

    let futures = backends
        .iter()
        .zip(configs)
        .map(|(registered, config)| async move {
            let result = call_backend(registered, query, config, timeout).await;
            BackendOutcome {
                backend: registered.id.clone(),
                weight: registered.weight,
                result,
            }
        });

    join_all(futures).await
}

/// Invoke every backend concurrently, aborting on the first failure.
///
/// When any backend fails, the remaining in-flight calls are dropped
/// (cancelled) and that failure is returned.
///
/// # Errors
///
/// Returns the first backend failure observed.
pub async fn dispatch_fail_fast(
    query: &str,
    backends: &[RegisteredBackend],
    configs: &[BackendConfig],
    timeout: Duration,
) -> Result<Vec<BackendOutcome>> {
    debug_assert_eq!(backends.len(), configs.len());

    let futures = backends
        .iter()
        .zip(configs)
        .map(|(registered, config)| async move {
            let items = call_backend(registered, query, config, timeout).await?;
            Ok::<_, FusionError>(BackendOutcome {
                backend: registered.id.clone(),
                weight: registered.weight,
                result: Ok(items),
            })
        });

    try_join_all(futures).await
}

/// Call a single backend with a timeout, logging the outcome.
async fn call_backend(
    registered: &RegisteredBackend,
    query: &str,
    config: &BackendConfig,
    timeout: Duration,
) -> Result<Vec<Item>> {
    tracing::trace!(backend = %registered.id, query, "dispatching query");

    let outcome = match tokio::time::timeout(timeout, registered.backend.retrieve(query, config))
        .await
    {
        // Adapters only know their kind, so failures are relabelled with
        // the registered id.
        Ok(Err(FusionError::Backend { message, .. })) => {
            Err(FusionError::backend(registered.id.clone(), message))
        }
        Ok(result) => result,
        Err(_) => Err(FusionError::Timeout {
            backend: registered.id.clone(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };

    match &outcome {
        Ok(items) => {
            tracing::debug!(
                backend = %registered.id,
                kind = registered.backend.name(),
                count = items.len(),
                "backend returned results"
            );
        }
        Err(err) => {
            tracing::warn!(backend = %registered.id, error = %err, "backend query failed");
        }
    }

    outcome
}
