//! Trait definition for pluggable retrieval backends.
//!
//! Each retrieval source (keyword index, vector store, remote search API)
//! implements [`Backend`] to provide a uniform interface for producing a
//! ranked list of [`Item`]s. Backend parameters travel as a
//! [`BackendConfig`] JSON object whose shape is entirely the backend's
//! business.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::Item;

/// Well-known override field: maximum number of items a backend returns.
pub const LIMIT_FIELD: &str = "limit";

/// Backend parameters: persisted defaults, a per-call override, or the
/// effective merge of both.
///
/// Fields are opaque to the fusion core. Unknown fields are carried through
/// unchanged so backends can define their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendConfig(Map<String, Value>);

impl BackendConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Convenience for `with("limit", limit)`.
    pub fn with_limit(self, limit: usize) -> Self {
        self.with(LIMIT_FIELD, limit)
    }

    /// Look up a raw field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read a non-negative integer field. Missing or mistyped values yield `None`.
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// Read a floating point field.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// The `limit` field, if present and a valid count.
    pub fn limit(&self) -> Option<usize> {
        self.get_usize(LIMIT_FIELD)
    }

    /// Returns `true` if no fields are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a new configuration with `overrides` applied field by field
    /// on top of `self`. Neither input is modified.
    pub fn merged_with(&self, overrides: &BackendConfig) -> BackendConfig {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        BackendConfig(merged)
    }
}

impl From<Map<String, Value>> for BackendConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for BackendConfig {
    type Error = crate::error::FusionError;

    /// Accepts JSON objects only; any other JSON value is a config error.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(crate::error::FusionError::Config(format!(
                "backend override must be a JSON object, got {other}"
            ))),
        }
    }
}

/// A pluggable retrieval backend.
///
/// Implementors produce a ranked list (rank 0 is most relevant) for a
/// query. Duplicates within the list are allowed; the fusion engine merges
/// them.
///
/// Backends must be stateless across calls apart from their own defaults,
/// and must report failures as errors rather than empty lists so callers
/// can tell "no results" from "backend down".
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Retrieve a ranked list for `query`.
    ///
    /// `config` is the effective configuration for this call: the
    /// backend's [`defaults`](Self::defaults) with any per-call override
    /// already applied.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Backend`](crate::FusionError::Backend) (or
    /// any other [`FusionError`](crate::FusionError)) if retrieval fails.
    async fn retrieve(&self, query: &str, config: &BackendConfig) -> Result<Vec<Item>>;

    /// The backend's persisted default configuration, returned by value.
    fn defaults(&self) -> BackendConfig {
        BackendConfig::new()
    }

    /// Label used in log records.
    fn name(&self) -> &str {
        "backend"
    }
}

/// A backend registered with a fused retriever under a unique identifier.
#[derive(Clone)]
pub struct RegisteredBackend {
    /// Identifier used for call overrides, diagnostics and tie-break order.
    pub id: String,
    /// The adapter itself.
    pub backend: Arc<dyn Backend>,
    /// Fusion weight (finite, non-negative).
    pub weight: f64,
}

impl fmt::Debug for RegisteredBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredBackend")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("weight", &self.weight)
            .finish()
    }
}
