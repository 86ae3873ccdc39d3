//! Weighted Reciprocal Rank Fusion over already-materialised ranked lists.
//!
//! Pure, synchronous computation: score every list by rank, merge by
//! identity, sort by total score with a stable first-seen tie-break, and
//! optionally truncate.

use crate::error::{FusionError, Result};
use crate::identity::ItemIdentity;
use crate::types::{FusedItem, Item};

use super::dedup::{deduplicate, ScoredList};
use super::scoring::{score_ranked_list, validate_weights};

/// One backend's ranked list and its fusion weight.
#[derive(Debug, Clone)]
pub struct RankedInput {
    /// Identifier the backend was registered under.
    pub backend: String,
    /// Fusion weight for this backend.
    pub weight: f64,
    /// Items in rank order. Empty for backends that returned nothing or failed.
    pub items: Vec<Item>,
}

impl RankedInput {
    /// Convenience constructor.
    pub fn new(backend: impl Into<String>, weight: f64, items: Vec<Item>) -> Self {
        Self {
            backend: backend.into(),
            weight,
            items,
        }
    }
}

/// Fuse ranked lists with weighted RRF.
///
/// # Pipeline
///
/// 1. Validate `k` (finite, non-negative) and weights (finite,
///    non-negative, not all zero)
/// 2. Score each list: `weight / (k + rank + 1)`
/// 3. Deduplicate by `identity`, summing contributions
/// 4. Stable sort by score descending (ties keep first-seen order)
/// 5. Truncate to `top_n` when given
///
/// Items that appear only in zero-weight lists are kept with score 0 and
/// therefore order after every positively scored item.
///
/// # Errors
///
/// Returns [`FusionError::Config`] if `k` or the weights are invalid.
pub fn fuse(
    inputs: Vec<RankedInput>,
    identity: &ItemIdentity,
    k: f64,
    top_n: Option<usize>,
) -> Result<Vec<FusedItem>> {
    if !k.is_finite() || k < 0.0 {
        return Err(FusionError::Config(format!(
            "rrf_k must be a finite, non-negative number, got {k}"
        )));
    }
    let weights: Vec<f64> = inputs.iter().map(|input| input.weight).collect();
    validate_weights(&weights)?;

    let scored: Vec<ScoredList> = inputs
        .into_iter()
        .map(|input| ScoredList {
            items: score_ranked_list(input.items, input.weight, k),
            backend: input.backend,
        })
        .collect();

    let mut fused = deduplicate(scored, identity);

    // `sort_by` is stable, which is what makes the tie-break deterministic.
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));

    if let Some(n) = top_n {
        fused.truncate(n);
    }

    Ok(fused)
}
