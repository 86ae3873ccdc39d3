//! In-memory keyword backend.
//!
//! Ranks a fixed document set by how often the query's terms occur in each
//! document. Terms are lowercase alphanumeric runs. Documents with equal
//! scores keep corpus order.
//!
//! Recognised config fields:
//! - `limit`: maximum number of documents returned (default 4)
//! - `min_score`: drop documents whose match count is below this value
//!   (default 0, so non-matching documents still fill the list)

use async_trait::async_trait;

use crate::backend::{Backend, BackendConfig};
use crate::error::Result;
use crate::types::Item;

/// Default number of documents returned per call.
pub const DEFAULT_LIMIT: usize = 4;

/// Term-frequency ranking over an in-memory corpus.
#[derive(Debug, Clone)]
pub struct KeywordBackend {
    documents: Vec<(Item, Vec<String>)>,
    defaults: BackendConfig,
}

impl KeywordBackend {
    /// Index `documents` for keyword lookup.
    pub fn new(documents: Vec<Item>) -> Self {
        let documents = documents
            .into_iter()
            .map(|item| {
                let terms = tokenize(&item.content);
                (item, terms)
            })
            .collect();
        Self {
            documents,
            defaults: BackendConfig::new().with_limit(DEFAULT_LIMIT),
        }
    }

    /// Replace the persisted default configuration.
    pub fn with_defaults(mut self, defaults: BackendConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Backend for KeywordBackend {
    async fn retrieve(&self, query: &str, config: &BackendConfig) -> Result<Vec<Item>> {
        let query_terms = tokenize(query);
        let limit = config.limit().unwrap_or(DEFAULT_LIMIT);
        let min_score = config.get_f64("min_score").unwrap_or(0.0);

        let mut scored: Vec<(usize, &Item)> = self
            .documents
            .iter()
            .map(|(item, terms)| (match_count(&query_terms, terms), item))
            .filter(|(score, _)| *score as f64 >= min_score)
            .collect();

        // Stable: equal scores keep corpus order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect())
    }

    fn defaults(&self) -> BackendConfig {
        self.defaults.clone()
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Split text into lowercase alphanumeric terms.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Total occurrences of any query term in the document.
fn match_count(query_terms: &[String], doc_terms: &[String]) -> usize {
    doc_terms
        .iter()
        .filter(|term| query_terms.contains(term))
        .count()
}
