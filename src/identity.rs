//! Item identity for cross-backend deduplication.
//!
//! Two items are treated as the same entity when their identity keys are
//! equal. The default compares content exactly; other rules fold in
//! metadata or delegate to a caller-supplied function.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::Item;

/// Caller-supplied identity function.
pub type IdentityFn = Arc<dyn Fn(&Item) -> String + Send + Sync>;

/// Rule used to decide whether two items represent the same entity.
#[derive(Clone, Default)]
pub enum ItemIdentity {
    /// Exact content equality.
    #[default]
    Content,
    /// Content plus the values of the listed metadata keys.
    ContentAndMetadata(Vec<String>),
    /// The value of a single metadata key, such as a document id.
    /// Items without the key fall back to content identity.
    MetadataKey(String),
    /// Arbitrary key derivation.
    Custom(IdentityFn),
}

impl ItemIdentity {
    /// Wrap a closure as a [`ItemIdentity::Custom`] rule.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Item) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Derive the deduplication key for `item`.
    ///
    /// Keys from different variants are prefixed so a metadata id can never
    /// collide with a piece of content that happens to spell the same text.
    pub fn key(&self, item: &Item) -> String {
        match self {
            Self::Content => content_key(item),
            Self::ContentAndMetadata(keys) => {
                let mut key = content_key(item);
                for name in keys {
                    key.push('\u{1f}');
                    key.push_str(name);
                    key.push('=');
                    key.push_str(&metadata_repr(item.metadata.get(name)));
                }
                key
            }
            Self::MetadataKey(name) => match item.metadata.get(name) {
                Some(value) => format!("m:{}", metadata_repr(Some(value))),
                None => content_key(item),
            },
            Self::Custom(f) => format!("u:{}", f(item)),
        }
    }
}

impl fmt::Debug for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content => f.write_str("Content"),
            Self::ContentAndMetadata(keys) => {
                f.debug_tuple("ContentAndMetadata").field(keys).finish()
            }
            Self::MetadataKey(key) => f.debug_tuple("MetadataKey").field(key).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn content_key(item: &Item) -> String {
    format!("c:{}", item.content)
}

/// Stable textual form of a metadata value: its JSON rendering, so the
/// string `"42"` and the number `42` stay distinct.
fn metadata_repr(value: Option<&Value>) -> String {
    match value {
        None => String::from("<absent>"),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_content_equality() {
        let identity = ItemIdentity::default();
        let a = Item::new("same").with_metadata("source", 1);
        let b = Item::new("same").with_metadata("source", 2);
        let c = Item::new("different");
        assert_eq!(identity.key(&a), identity.key(&b));
        assert_ne!(identity.key(&a), identity.key(&c));
    }

    #[test]
    fn content_match_is_exact() {
        let identity = ItemIdentity::Content;
        assert_ne!(
            identity.key(&Item::new("Apples")),
            identity.key(&Item::new("apples"))
        );
    }

    #[test]
    fn content_and_metadata_distinguishes_sources() {
        let identity = ItemIdentity::ContentAndMetadata(vec!["source".into()]);
        let a = Item::new("same").with_metadata("source", 1);
        let b = Item::new("same").with_metadata("source", 2);
        let c = Item::new("same").with_metadata("source", 1).with_metadata("page", 3);
        assert_ne!(identity.key(&a), identity.key(&b));
        assert_eq!(identity.key(&a), identity.key(&c));
    }

    #[test]
    fn content_and_metadata_absent_key_is_stable() {
        let identity = ItemIdentity::ContentAndMetadata(vec!["source".into()]);
        let a = Item::new("same");
        let b = Item::new("same");
        assert_eq!(identity.key(&a), identity.key(&b));
        assert_ne!(identity.key(&a), identity.key(&a.clone().with_metadata("source", 1)));
    }

    #[test]
    fn metadata_key_merges_different_content() {
        let identity = ItemIdentity::MetadataKey("id".into());
        let a = Item::new("chunk text v1").with_metadata("id", "doc-7");
        let b = Item::new("chunk text v2").with_metadata("id", "doc-7");
        assert_eq!(identity.key(&a), identity.key(&b));
    }

    #[test]
    fn metadata_key_falls_back_to_content() {
        let identity = ItemIdentity::MetadataKey("id".into());
        let a = Item::new("no id here");
        let b = Item::new("no id here");
        let c = Item::new("no id here").with_metadata("id", "x");
        assert_eq!(identity.key(&a), identity.key(&b));
        assert_ne!(identity.key(&a), identity.key(&c));
    }

    #[test]
    fn metadata_key_does_not_collide_with_content() {
        let identity = ItemIdentity::MetadataKey("id".into());
        let by_id = Item::new("whatever").with_metadata("id", "\"abc\"");
        let by_content = Item::new("\"abc\"");
        assert_ne!(identity.key(&by_id), identity.key(&by_content));
    }

    #[test]
    fn custom_identity_is_applied() {
        let identity = ItemIdentity::custom(|item| item.content.to_lowercase());
        assert_eq!(
            identity.key(&Item::new("Apples")),
            identity.key(&Item::new("APPLES"))
        );
    }

    #[test]
    fn debug_hides_closure() {
        let identity = ItemIdentity::custom(|item| item.content.clone());
        assert_eq!(format!("{identity:?}"), "Custom(..)");
        assert_eq!(
            format!("{:?}", ItemIdentity::MetadataKey("id".into())),
            "MetadataKey(\"id\")"
        );
    }
}
