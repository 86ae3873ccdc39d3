//! Cross-backend deduplication with score accumulation.
//!
//! Groups scored items that share an identity key. The first-encountered
//! instance is kept (backends in registration order, then rank), its
//! contributions are summed across every occurrence, and the contributing
//! backends are recorded.
//!
//! Contributions are summed in ascending order rather than scan order, so
//! two items with the same multiset of contributions get bit-identical
//! totals and stay tied for the first-seen tie-break.

use std::collections::HashMap;

use crate::identity::ItemIdentity;
use crate::types::{FusedItem, Item};

/// Scored output of one backend, ready for deduplication.
#[derive(Debug, Clone)]
pub struct ScoredList {
    /// Identifier the backend was registered under.
    pub backend: String,
    /// Items in rank order, each with its reciprocal-rank contribution.
    pub items: Vec<(Item, f64)>,
}

/// Deduplicate scored lists by identity key.
///
/// The output is in **first-seen order**: scanning `lists` in order and
/// each list by rank. Sorting it stably by score therefore yields the
/// first-seen tie-break without any extra bookkeeping.
pub fn deduplicate(lists: Vec<ScoredList>, identity: &ItemIdentity) -> Vec<FusedItem> {
    let mut fused: Vec<FusedItem> = Vec::new();
    let mut contributions: Vec<Vec<f64>> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (item, contribution) in list.items {
            let key = identity.key(&item);
            match index_by_key.get(&key) {
                Some(&index) => {
                    contributions[index].push(contribution);
                    let entry = &mut fused[index];
                    if !entry.backends.contains(&list.backend) {
                        entry.backends.push(list.backend.clone());
                    }
                }
                None => {
                    index_by_key.insert(key, fused.len());
                    contributions.push(vec![contribution]);
                    fused.push(FusedItem {
                        item,
                        score: 0.0,
                        backends: vec![list.backend.clone()],
                    });
                }
            }
        }
    }

    for (entry, parts) in fused.iter_mut().zip(contributions) {
        entry.score = ordered_sum(parts);
    }

    fused
}

/// Sum in ascending order so the result depends only on the values, not on
/// the order they were collected in.
fn ordered_sum(mut parts: Vec<f64>) -> f64 {
    parts.sort_by(f64::total_cmp);
    parts.into_iter().sum()
}
