//! A backend that always fails.

use async_trait::async_trait;

use crate::backend::{Backend, BackendConfig};
use crate::error::{FusionError, Result};
use crate::types::Item;

/// Fails every call with a fixed message. Stands in for an unreachable
/// index when exercising failure policies.
///
/// The error's `backend` field is the adapter kind; the dispatcher replaces
/// it with the id the backend was registered under.
#[derive(Debug, Clone)]
pub struct FailingBackend {
    message: String,
}

impl FailingBackend {
    /// A backend failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Backend for FailingBackend {
    async fn retrieve(&self, _query: &str, _config: &BackendConfig) -> Result<Vec<Item>> {
        Err(FusionError::backend(self.name(), self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
