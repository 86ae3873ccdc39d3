//! Per-call configuration overrides and their resolution against
//! backend defaults.
//!
//! A [`CallConfig`] lives for a single invocation. Resolving it never
//! touches a backend's stored defaults: each backend's defaults are fetched
//! by value and the override is merged into that fresh copy, so concurrent
//! calls with different overrides cannot observe each other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendConfig, RegisteredBackend};
use crate::error::{FusionError, Result};

/// Call-scoped overrides keyed by backend identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Override object per backend identifier.
    pub overrides: BTreeMap<String, BackendConfig>,
    /// Truncate the fused output to this many items for this call only.
    pub top_n: Option<usize>,
}

impl CallConfig {
    /// An empty call configuration (no overrides, no truncation).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the override for `backend`.
    pub fn backend(mut self, backend: impl Into<String>, overrides: BackendConfig) -> Self {
        self.overrides.insert(backend.into(), overrides);
        self
    }

    /// Shorthand for overriding a backend's `limit` field.
    pub fn limit(self, backend: impl Into<String>, limit: usize) -> Self {
        self.backend(backend, BackendConfig::new().with_limit(limit))
    }

    /// Truncate the fused output for this call.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Compute the effective configuration for every registered backend,
    /// in registration order.
    ///
    /// Each entry is `backend.defaults()` with the matching override merged
    /// in field by field. Override keys that name no registered backend are
    /// ignored, or rejected when `strict` is set.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] for an unknown backend identifier in
    /// strict mode, or for `top_n == Some(0)`.
    pub fn resolve(
        &self,
        backends: &[RegisteredBackend],
        strict: bool,
    ) -> Result<Vec<BackendConfig>> {
        if self.top_n == Some(0) {
            return Err(FusionError::Config(
                "top_n must be greater than 0 when set".into(),
            ));
        }

        for id in self.overrides.keys() {
            if backends.iter().any(|b| &b.id == id) {
                continue;
            }
            if strict {
                return Err(FusionError::Config(format!(
                    "override references unknown backend '{id}'"
                )));
            }
            tracing::debug!(backend = %id, "ignoring override for unknown backend");
        }

        Ok(backends
            .iter()
            .map(|registered| {
                let defaults = registered.backend.defaults();
                match self.overrides.get(&registered.id) {
                    Some(overrides) => defaults.merged_with(overrides),
                    None => defaults,
                }
            })
            .collect())
    }
}

/// Resolve an optional call configuration; `None` means defaults everywhere.
pub fn resolve_optional(
    call: Option<&CallConfig>,
    backends: &[RegisteredBackend],
    strict: bool,
) -> Result<Vec<BackendConfig>> {
    match call {
        Some(call) => call.resolve(backends, strict),
        None => Ok(backends.iter().map(|b| b.backend.defaults()).collect()),
    }
}
