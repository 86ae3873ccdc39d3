//! Error types for the fusion-retriever crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. Query text never appears in error messages.

/// Errors that can occur while dispatching to backends or fusing results.
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// Invalid retriever or call configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A single backend's retrieval call failed.
    #[error("backend {backend} failed: {message}")]
    Backend {
        /// Identifier the backend was registered under.
        backend: String,
        /// Failure description reported by the backend.
        message: String,
    },

    /// A backend did not answer within the per-backend timeout.
    #[error("backend {backend} timed out after {timeout_ms}ms")]
    Timeout {
        /// Identifier the backend was registered under.
        backend: String,
        /// The timeout that was exceeded.
        timeout_ms: u64,
    },

    /// Every dispatched backend failed, leaving nothing to fuse.
    #[error("all backends failed: {0}")]
    AllBackendsFailed(String),

    /// The caller cancelled the invocation while backends were in flight.
    #[error("invocation cancelled")]
    Cancelled,

    /// Reading or writing a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FusionError {
    /// Build a [`FusionError::Backend`] for the given backend identifier.
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised by one backend call
    /// ([`Backend`](Self::Backend) or [`Timeout`](Self::Timeout)).
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Timeout { .. })
    }
}

/// Convenience type alias for fusion-retriever results.
pub type Result<T> = std::result::Result<T, FusionError>;
