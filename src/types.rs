//! Core types for retrieved items and fused results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single item returned by a retrieval backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The content payload (document text, passage, record body).
    pub content: String,
    /// Arbitrary metadata attached by the backend.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Item {
    /// Create an item with empty metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry, replacing any previous value for `key`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An item after fusion, with its aggregate score.
///
/// The score is only meaningful for ordering within one fused result;
/// it is not a stable absolute value across calls or versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedItem {
    /// The first-encountered instance of this item (backend order, then rank).
    pub item: Item,
    /// Sum of weighted reciprocal-rank contributions.
    pub score: f64,
    /// Identifiers of every backend that returned this item, in registration order.
    pub backends: Vec<String>,
}

/// A backend failure recorded during a non-strict invocation.
#[derive(Debug)]
pub struct BackendFailure {
    /// Identifier the failing backend was registered under.
    pub backend: String,
    /// The error it produced.
    pub error: crate::error::FusionError,
}

/// Fused ranking plus per-backend diagnostics.
#[derive(Debug, Default)]
pub struct FusionOutcome {
    /// Fused items, best first.
    pub items: Vec<FusedItem>,
    /// Backends whose results were treated as empty because they failed.
    pub failures: Vec<BackendFailure>,
}

impl FusionOutcome {
    /// Drop scores and diagnostics, keeping only the ordered items.
    pub fn into_items(self) -> Vec<Item> {
        self.items.into_iter().map(|fused| fused.item).collect()
    }

    /// Returns `true` if any backend failed during the invocation.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
