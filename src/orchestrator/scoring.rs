//! Weighted reciprocal-rank scoring.
//!
//! Assigns each item a contribution from its backend weight and its
//! position in that backend's list:
//!
//! ```text
//! contribution = weight / (k + rank + 1)
//! ```
//!
//! where `rank` is 0-based and `k` is the smoothing constant (60 by
//! default). Only rank is used; backend-native scores never enter the
//! formula.

use crate::error::{FusionError, Result};
use crate::types::Item;

/// Contribution of the item at 0-based `rank` in a list with `weight`.
///
/// - Rank 0 with `k = 60` yields `weight / 61`
/// - Contribution strictly decreases with rank for positive weights
/// - A weight of 0 always yields 0
pub fn rrf_contribution(weight: f64, rank: usize, k: f64) -> f64 {
    weight / (k + rank as f64 + 1.0)
}

/// Pair every item of one backend's ranked list with its contribution.
pub fn score_ranked_list(items: Vec<Item>, weight: f64, k: f64) -> Vec<(Item, f64)> {
    items
        .into_iter()
        .enumerate()
        .map(|(rank, item)| {
            let contribution = rrf_contribution(weight, rank, k);
            (item, contribution)
        })
        .collect()
}

/// Uniform weights `1/n` for `n` backends.
pub fn uniform_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Check that weights are usable for fusion.
///
/// # Errors
///
/// Returns [`FusionError::Config`] if any weight is negative or not finite,
/// or if every weight is zero.
pub fn validate_weights(weights: &[f64]) -> Result<()> {
    if let Some((index, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(FusionError::Config(format!(
            "weight at position {index} must be finite and non-negative, got {w}"
        )));
    }
    if weights.iter().all(|w| *w == 0.0) {
        return Err(FusionError::Config(
            "at least one backend weight must be greater than 0".into(),
        ));
    }
    Ok(())
}
