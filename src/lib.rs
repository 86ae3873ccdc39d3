//! # fusion-retriever
//!
//! Weighted Reciprocal Rank Fusion over independent retrieval backends.
//!
//! Keyword indexes, vector stores and remote search APIs produce scores
//! that are not comparable with one another. This crate merges their ranked
//! lists using rank position only, so no score normalisation is needed.
//!
//! ## Design
//!
//! - Backends implement one async trait, [`Backend`], and are registered in
//!   order with a weight
//! - Every query fans out to all backends concurrently, each bounded by a
//!   timeout
//! - Per-call overrides ([`CallConfig`]) are merged onto each backend's
//!   defaults for that call only
//! - Items are scored `weight / (k + rank + 1)`, merged by a pluggable
//!   identity rule, and stably sorted, so output is deterministic
//! - Graceful degradation: a failing backend counts as an empty list unless
//!   strict mode is enabled
//!
//! ## Logging
//!
//! Query text is logged only at trace level.

pub mod backend;
pub mod backends;
pub mod call_config;
pub mod config;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod types;

pub use backend::{Backend, BackendConfig, RegisteredBackend};
pub use call_config::CallConfig;
pub use config::FusionConfig;
pub use error::{FusionError, Result};
pub use identity::ItemIdentity;
pub use orchestrator::fusion::{fuse, RankedInput};
pub use orchestrator::retriever::{EnsembleRetriever, EnsembleRetrieverBuilder};
pub use types::{BackendFailure, FusedItem, FusionOutcome, Item};

/// Fuse already-retrieved ranked lists with default settings.
///
/// Each entry is `(backend id, weight, ranked items)`. Uses content
/// identity, `k = 60` and no truncation.
///
/// # Errors
///
/// Returns [`FusionError::Config`] if the weights are invalid (negative,
/// non-finite, or all zero).
///
/// # Examples
///
/// ```
/// use fusion_retriever::{fuse_lists, Item};
///
/// let keyword = vec![Item::new("a"), Item::new("b")];
/// let vector = vec![Item::new("b"), Item::new("c")];
/// let fused = fuse_lists(vec![("keyword", 0.5, keyword), ("vector", 0.5, vector)])?;
/// assert_eq!(fused[0].item.content, "b");
/// # Ok::<(), fusion_retriever::FusionError>(())
/// ```
pub fn fuse_lists<S: Into<String>>(lists: Vec<(S, f64, Vec<Item>)>) -> Result<Vec<FusedItem>> {
    let inputs = lists
        .into_iter()
        .map(|(backend, weight, items)| RankedInput::new(backend, weight, items))
        .collect();
    fuse(
        inputs,
        &ItemIdentity::default(),
        config::DEFAULT_RRF_K,
        None,
    )
}
