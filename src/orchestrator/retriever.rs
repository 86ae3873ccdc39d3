//! The fused retriever: backend registration and invocation.
//!
//! [`EnsembleRetriever`] owns an ordered list of backends with weights,
//! resolves per-call overrides, fans out concurrently, and fuses the
//! returned lists with weighted RRF.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, RegisteredBackend};
use crate::call_config::{resolve_optional, CallConfig};
use crate::config::FusionConfig;
use crate::error::{FusionError, Result};
use crate::identity::ItemIdentity;
use crate::types::{BackendFailure, FusionOutcome, Item};

use super::dispatch::{dispatch_all, dispatch_fail_fast, BackendOutcome};
use super::fusion::{fuse, RankedInput};
use super::scoring::{uniform_weights, validate_weights};

/// Combines several retrieval backends into one ranking with weighted
/// Reciprocal Rank Fusion.
///
/// Registration order is fixed for the lifetime of the retriever and
/// decides ties. The retriever holds no per-call state, so one instance can
/// serve concurrent invocations behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct EnsembleRetriever {
    backends: Vec<RegisteredBackend>,
    identity: ItemIdentity,
    config: FusionConfig,
}

impl EnsembleRetriever {
    /// Build a retriever from `(id, backend, weight)` triples with default
    /// identity and configuration.
    ///
    /// # Errors
    ///
    /// Same validation as [`EnsembleRetrieverBuilder::build`].
    pub fn new(backends: Vec<(String, Arc<dyn Backend>, f64)>) -> Result<Self> {
        let mut builder = Self::builder();
        for (id, backend, weight) in backends {
            builder = builder.weighted_backend(id, backend, weight);
        }
        builder.build()
    }

    /// Start building a retriever.
    pub fn builder() -> EnsembleRetrieverBuilder {
        EnsembleRetrieverBuilder::default()
    }

    /// Backend identifiers in registration order.
    pub fn backend_ids(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.id.as_str()).collect()
    }

    /// Weights in registration order.
    pub fn weights(&self) -> Vec<f64> {
        self.backends.iter().map(|b| b.weight).collect()
    }

    /// The fusion configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// The identity rule used for deduplication.
    pub fn identity(&self) -> &ItemIdentity {
        &self.identity
    }

    /// Retrieve and fuse, returning only the ordered items.
    ///
    /// # Errors
    ///
    /// See [`invoke_detailed`](Self::invoke_detailed).
    pub async fn invoke(&self, query: &str, call: Option<&CallConfig>) -> Result<Vec<Item>> {
        self.invoke_detailed(query, call)
            .await
            .map(FusionOutcome::into_items)
    }

    /// Retrieve from every backend concurrently and fuse the results.
    ///
    /// # Pipeline
    ///
    /// 1. Resolve effective per-backend configs (defaults + call overrides)
    /// 2. Fan out to all backends concurrently, each bounded by the timeout
    /// 3. Non-strict: record failures and treat them as empty lists.
    ///    Strict: abort on the first failure
    /// 4. Fuse with weighted RRF, deduplicating by identity
    /// 5. Truncate to the call's `top_n`, else the configured `max_results`
    ///
    /// # Errors
    ///
    /// - [`FusionError::Config`] for an unknown override id in strict mode
    ///   or an invalid `top_n`
    /// - the first backend failure in strict mode
    /// - [`FusionError::AllBackendsFailed`] if every backend failed in
    ///   non-strict mode
    pub async fn invoke_detailed(
        &self,
        query: &str,
        call: Option<&CallConfig>,
    ) -> Result<FusionOutcome> {
        let configs = resolve_optional(call, &self.backends, self.config.strict)?;
        let timeout = self.config.timeout();

        let outcomes = if self.config.strict {
            dispatch_fail_fast(query, &self.backends, &configs, timeout).await?
        } else {
            dispatch_all(query, &self.backends, &configs, timeout).await
        };

        let (inputs, failures) = split_outcomes(outcomes);

        if failures.len() == self.backends.len() {
            let summary = failures
                .iter()
                .map(|f| format!("{}: {}", f.backend, f.error))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FusionError::AllBackendsFailed(summary));
        }

        let top_n = call.and_then(|c| c.top_n).or(self.config.max_results);
        let items = fuse(inputs, &self.identity, self.config.rrf_k, top_n)?;

        tracing::debug!(
            fused = items.len(),
            failed = failures.len(),
            "fusion complete"
        );

        Ok(FusionOutcome { items, failures })
    }

    /// Like [`invoke_detailed`](Self::invoke_detailed), but abandons every
    /// in-flight backend call when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Cancelled`] if the token is cancelled before
    /// fusion completes, otherwise the same errors as `invoke_detailed`.
    pub async fn invoke_with_cancel(
        &self,
        query: &str,
        call: Option<&CallConfig>,
        cancel: &CancellationToken,
    ) -> Result<FusionOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("invocation cancelled by caller");
                Err(FusionError::Cancelled)
            }
            outcome = self.invoke_detailed(query, call) => outcome,
        }
    }
}

/// Turn dispatch outcomes into fusion inputs plus failure diagnostics.
///
/// Failed backends keep their slot as an empty list so the weight check
/// and registration order stay intact.
fn split_outcomes(outcomes: Vec<BackendOutcome>) -> (Vec<RankedInput>, Vec<BackendFailure>) {
    let mut inputs = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for outcome in outcomes {
        let items = match outcome.result {
            Ok(items) => items,
            Err(error) => {
                failures.push(BackendFailure {
                    backend: outcome.backend.clone(),
                    error,
                });
                Vec::new()
            }
        };
        inputs.push(RankedInput::new(outcome.backend, outcome.weight, items));
    }

    (inputs, failures)
}

/// Builder for [`EnsembleRetriever`].
#[derive(Default)]
pub struct EnsembleRetrieverBuilder {
    backends: Vec<(String, Arc<dyn Backend>, Option<f64>)>,
    weights: Option<Vec<f64>>,
    identity: ItemIdentity,
    config: FusionConfig,
}

impl EnsembleRetrieverBuilder {
    /// Register a backend whose weight comes from [`weights`](Self::weights)
    /// or the uniform default.
    pub fn backend(mut self, id: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        self.backends.push((id.into(), backend, None));
        self
    }

    /// Register a backend with an explicit weight.
    pub fn weighted_backend(
        mut self,
        id: impl Into<String>,
        backend: Arc<dyn Backend>,
        weight: f64,
    ) -> Self {
        self.backends.push((id.into(), backend, Some(weight)));
        self
    }

    /// Weights for all backends, in registration order.
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Identity rule for cross-backend deduplication.
    pub fn identity(mut self, identity: ItemIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Fusion configuration.
    pub fn config(mut self, config: FusionConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate and build the retriever.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] if:
    /// - no backends are registered
    /// - a backend identifier is registered twice
    /// - explicit per-backend weights are mixed with a weights vector, or
    ///   only some backends have explicit weights
    /// - the weights vector length differs from the backend count
    /// - any weight is negative or non-finite, or all weights are zero
    /// - the [`FusionConfig`] is invalid
    pub fn build(self) -> Result<EnsembleRetriever> {
        self.config.validate()?;

        if self.backends.is_empty() {
            return Err(FusionError::Config(
                "at least one backend must be registered".into(),
            ));
        }

        for (index, (id, _, _)) in self.backends.iter().enumerate() {
            if self.backends[..index].iter().any(|(other, _, _)| other == id) {
                return Err(FusionError::Config(format!(
                    "backend '{id}' is registered more than once"
                )));
            }
        }

        let explicit = self.backends.iter().filter(|(_, _, w)| w.is_some()).count();
        let weights = match (self.weights, explicit) {
            (Some(_), n) if n > 0 => {
                return Err(FusionError::Config(
                    "use either per-backend weights or a weights vector, not both".into(),
                ));
            }
            (Some(weights), _) => {
                if weights.len() != self.backends.len() {
                    return Err(FusionError::Config(format!(
                        "expected {} weights, got {}",
                        self.backends.len(),
                        weights.len()
                    )));
                }
                weights
            }
            (None, 0) => uniform_weights(self.backends.len()),
            (None, n) if n == self.backends.len() => {
                self.backends.iter().filter_map(|(_, _, w)| *w).collect()
            }
            (None, _) => {
                return Err(FusionError::Config(
                    "either every backend or none must have an explicit weight".into(),
                ));
            }
        };

        validate_weights(&weights)?;

        let backends = self
            .backends
            .into_iter()
            .zip(weights)
            .map(|((id, backend, _), weight)| RegisteredBackend {
                id,
                backend,
                weight,
            })
            .collect();

        Ok(EnsembleRetriever {
            backends,
            identity: self.identity,
            config: self.config,
        })
    }
}
