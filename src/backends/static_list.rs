//! A backend that always returns the same ranked list.

use async_trait::async_trait;

use crate::backend::{Backend, BackendConfig};
use crate::error::Result;
use crate::types::Item;

/// Returns a fixed ranked list regardless of the query, truncated to the
/// effective `limit` when one is set.
#[derive(Debug, Clone)]
pub struct StaticBackend {
    items: Vec<Item>,
    defaults: BackendConfig,
}

impl StaticBackend {
    /// A backend returning `items` in the given order.
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            defaults: BackendConfig::new(),
        }
    }

    /// Build from plain strings, tagging every item with `metadata_key = value`.
    pub fn from_texts<I, S>(texts: I, metadata_key: &str, value: impl Into<serde_json::Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let value = value.into();
        let items = texts
            .into_iter()
            .map(|text| Item::new(text).with_metadata(metadata_key, value.clone()))
            .collect();
        Self::new(items)
    }

    /// Replace the persisted default configuration.
    pub fn with_defaults(mut self, defaults: BackendConfig) -> Self {
        self.defaults = defaults;
        self
    }
}

#[async_trait]
impl Backend for StaticBackend {
    async fn retrieve(&self, _query: &str, config: &BackendConfig) -> Result<Vec<Item>> {
        let limit = config.limit().unwrap_or(self.items.len());
        Ok(self.items.iter().take(limit).cloned().collect())
    }

    fn defaults(&self) -> BackendConfig {
        self.defaults.clone()
    }

    fn name(&self) -> &str {
        "static"
    }
}
