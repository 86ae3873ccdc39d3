//! Integration tests for the fused retriever.
//!
//! These tests exercise the full resolve → fan-out → score → dedup → sort
//! → truncate pipeline through the public API using in-memory backends
//! (no network calls).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fusion_retriever::backends::{FailingBackend, KeywordBackend, StaticBackend};
use fusion_retriever::{
    Backend, BackendConfig, CallConfig, EnsembleRetriever, FusionConfig, FusionError, Item,
    ItemIdentity,
};
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fusion_retriever=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn contents(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i.content.as_str()).collect()
}

/// Keyword backend over the first document list, fixed list for the second.
fn fruit_retriever() -> EnsembleRetriever {
    let keyword = KeywordBackend::new(vec![
        Item::new("I like apples").with_metadata("source", 1),
        Item::new("I like oranges").with_metadata("source", 1),
        Item::new("Apples and oranges are fruits").with_metadata("source", 1),
    ]);
    let semantic = StaticBackend::from_texts(["You like apples", "You like oranges"], "source", 2);

    EnsembleRetriever::builder()
        .backend("keyword", Arc::new(keyword))
        .backend("semantic", Arc::new(semantic))
        .weights(vec![0.5, 0.5])
        .build()
        .expect("valid retriever")
}

#[tokio::test]
async fn canonical_fruit_scenario() {
    init_tracing();
    let retriever = fruit_retriever();

    let items = retriever.invoke("apples", None).await.expect("invoke");
    let order = contents(&items);

    let pos = |needle: &str| {
        order
            .iter()
            .position(|c| *c == needle)
            .unwrap_or_else(|| panic!("{needle} missing from {order:?}"))
    };

    assert!(pos("I like apples") < pos("Apples and oranges are fruits"));
    assert!(pos("You like apples") < pos("Apples and oranges are fruits"));
    assert!(pos("Apples and oranges are fruits") < pos("You like oranges"));
    assert_eq!(
        &order[..4],
        [
            "I like apples",
            "You like apples",
            "Apples and oranges are fruits",
            "You like oranges",
        ]
    );

    // First-encountered metadata is retained.
    assert_eq!(items[0].metadata.get("source"), Some(&serde_json::json!(1)));
    assert_eq!(items[1].metadata.get("source"), Some(&serde_json::json!(2)));
}

#[tokio::test]
async fn per_call_limit_truncates_one_backend_only() {
    let retriever = fruit_retriever();
    let baseline = retriever.invoke("apples", None).await.expect("invoke");

    let call = CallConfig::new().limit("semantic", 1);
    let limited = retriever.invoke("apples", Some(&call)).await.expect("invoke");
    let order = contents(&limited);

    assert!(!order.contains(&"You like oranges"));
    assert!(order.contains(&"You like apples"));

    // Keyword contributions are unaffected.
    let keyword_only = |items: &[Item]| -> Vec<String> {
        items
            .iter()
            .filter(|i| i.metadata.get("source") == Some(&serde_json::json!(1)))
            .map(|i| i.content.clone())
            .collect()
    };
    assert_eq!(keyword_only(&baseline), keyword_only(&limited));

    // The override did not leak into the next call.
    let after = retriever.invoke("apples", None).await.expect("invoke");
    assert_eq!(contents(&after), contents(&baseline));
}

#[tokio::test]
async fn detailed_outcome_reports_scores_and_backends() {
    let retriever = fruit_retriever();
    let outcome = retriever
        .invoke_detailed("apples", None)
        .await
        .expect("invoke");

    assert!(!outcome.has_failures());
    for pair in outcome.items.windows(2) {
        assert!(pair[0].score >= pair[1].score, "scores must be sorted");
    }
    assert_eq!(outcome.items[0].backends, ["keyword"]);
    assert_eq!(outcome.items[1].backends, ["semantic"]);
}

#[tokio::test]
async fn overlapping_lists_reward_consensus() {
    let retriever = EnsembleRetriever::builder()
        .backend("a", Arc::new(StaticBackend::new(texts(&["A", "B", "C"]))))
        .backend("b", Arc::new(StaticBackend::new(texts(&["B", "A", "D"]))))
        .build()
        .expect("valid retriever");

    let outcome = retriever.invoke_detailed("q", None).await.expect("invoke");
    let order: Vec<&str> = outcome
        .items
        .iter()
        .map(|f| f.item.content.as_str())
        .collect();
    assert_eq!(order, ["A", "B", "C", "D"]);
    assert_eq!(outcome.items[0].backends, ["a", "b"]);
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let retriever = EnsembleRetriever::builder()
        .backend("a", Arc::new(StaticBackend::new(texts(&["p", "q", "r", "s"]))))
        .backend("b", Arc::new(StaticBackend::new(texts(&["s", "r", "t"]))))
        .backend("c", Arc::new(StaticBackend::new(texts(&["t", "p", "u"]))))
        .weights(vec![0.2, 0.5, 0.3])
        .build()
        .expect("valid retriever");

    let first = retriever.invoke("q", None).await.expect("invoke");
    for _ in 0..25 {
        let again = retriever.invoke("q", None).await.expect("invoke");
        assert_eq!(first, again);
    }
}

#[tokio::test]
async fn zero_weight_backend_is_dispatched_but_not_scored() {
    let calls = Arc::new(CountingBackend::new(texts(&["shared", "zero-only"])));
    let retriever = EnsembleRetriever::builder()
        .weighted_backend(
            "main",
            Arc::new(StaticBackend::new(texts(&["x", "shared"]))),
            1.0,
        )
        .weighted_backend("muted", calls.clone(), 0.0)
        .build()
        .expect("valid retriever");

    let outcome = retriever.invoke_detailed("q", None).await.expect("invoke");
    assert!(calls.was_called());

    let shared = outcome
        .items
        .iter()
        .find(|f| f.item.content == "shared")
        .expect("shared present");
    assert!((shared.score - 1.0 / 62.0).abs() < f64::EPSILON);

    let last = outcome.items.last().expect("non-empty");
    assert_eq!(last.item.content, "zero-only");
    assert_eq!(last.score, 0.0);
}

#[tokio::test]
async fn concurrent_overrides_do_not_interfere() {
    let backend = Arc::new(RecordingBackend);
    let retriever = Arc::new(
        EnsembleRetriever::builder()
            .backend("rec", backend)
            .build()
            .expect("valid retriever"),
    );

    let one = CallConfig::new().limit("rec", 1);
    let three = CallConfig::new().limit("rec", 3);

    let (a, b, c) = tokio::join!(
        retriever.invoke("q", Some(&one)),
        retriever.invoke("q", Some(&three)),
        retriever.invoke("q", None),
    );
    let (a, b, c) = (a.expect("a"), b.expect("b"), c.expect("c"));

    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 3);
    assert_eq!(c.len(), 2);
    for item in &a {
        assert_eq!(item.metadata.get("seen_limit"), Some(&serde_json::json!(1)));
    }
    for item in &b {
        assert_eq!(item.metadata.get("seen_limit"), Some(&serde_json::json!(3)));
    }
    for item in &c {
        assert_eq!(item.metadata.get("seen_limit"), Some(&serde_json::json!(2)));
    }
}

#[tokio::test]
async fn partial_failure_is_silent_but_diagnosed() {
    init_tracing();
    let retriever = EnsembleRetriever::builder()
        .backend("down", Arc::new(FailingBackend::new("connection refused")))
        .backend("up", Arc::new(StaticBackend::new(texts(&["ok"]))))
        .build()
        .expect("valid retriever");

    let items = retriever.invoke("q", None).await.expect("invoke");
    assert_eq!(contents(&items), ["ok"]);

    let outcome = retriever.invoke_detailed("q", None).await.expect("invoke");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].backend, "down");
    assert_eq!(
        outcome.failures[0].error.to_string(),
        "backend down failed: connection refused"
    );
}

#[tokio::test]
async fn strict_mode_fails_fast_and_rejects_unknown_overrides() {
    let strict = FusionConfig {
        strict: true,
        ..Default::default()
    };

    let failing = EnsembleRetriever::builder()
        .backend("down", Arc::new(FailingBackend::new("boom")))
        .backend("up", Arc::new(StaticBackend::new(texts(&["ok"]))))
        .config(strict.clone())
        .build()
        .expect("valid retriever");
    let err = failing.invoke("q", None).await.unwrap_err();
    assert!(err.is_backend_failure());

    let healthy = EnsembleRetriever::builder()
        .backend("up", Arc::new(StaticBackend::new(texts(&["ok"]))))
        .config(strict)
        .build()
        .expect("valid retriever");
    let call = CallConfig::new().limit("missing", 1);
    let err = healthy.invoke("q", Some(&call)).await.unwrap_err();
    assert!(matches!(err, FusionError::Config(_)));

    // Lenient mode ignores the same override.
    let lenient = EnsembleRetriever::builder()
        .backend("up", Arc::new(StaticBackend::new(texts(&["ok"]))))
        .build()
        .expect("valid retriever");
    assert_eq!(
        lenient.invoke("q", Some(&call)).await.expect("invoke").len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn stuck_backend_times_out() {
    let retriever = EnsembleRetriever::builder()
        .backend("stuck", Arc::new(SleepyBackend::new(Duration::from_secs(3600))))
        .backend("up", Arc::new(StaticBackend::new(texts(&["ok"]))))
        .config(FusionConfig {
            timeout_ms: 200,
            ..Default::default()
        })
        .build()
        .expect("valid retriever");

    let outcome = retriever.invoke_detailed("q", None).await.expect("invoke");
    assert_eq!(outcome.items.len(), 1);
    assert!(matches!(
        outcome.failures[0].error,
        FusionError::Timeout { timeout_ms: 200, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn cancellation_drops_in_flight_calls() {
    let sleepy = Arc::new(SleepyBackend::new(Duration::from_secs(3600)));
    let retriever = EnsembleRetriever::builder()
        .backend("sleepy", sleepy.clone())
        .config(FusionConfig {
            timeout_ms: 7_200_000,
            ..Default::default()
        })
        .build()
        .expect("valid retriever");

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = retriever
        .invoke_with_cancel("q", None, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, FusionError::Cancelled));
    assert!(sleepy.dropped.load(Ordering::SeqCst));
    assert!(!sleepy.completed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn metadata_key_identity_merges_across_backends() {
    let a = StaticBackend::new(vec![
        Item::new("chunk about rust").with_metadata("id", "doc-1"),
        Item::new("chunk about go").with_metadata("id", "doc-2"),
    ]);
    let b = StaticBackend::new(vec![
        Item::new("rust, rephrased").with_metadata("id", "doc-1"),
        Item::new("chunk about zig").with_metadata("id", "doc-3"),
    ]);
    let retriever = EnsembleRetriever::builder()
        .backend("a", Arc::new(a))
        .backend("b", Arc::new(b))
        .identity(ItemIdentity::MetadataKey("id".into()))
        .build()
        .expect("valid retriever");

    let items = retriever.invoke("rust", None).await.expect("invoke");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].content, "chunk about rust");
}

#[tokio::test]
async fn configured_max_results_and_call_top_n() {
    let retriever = EnsembleRetriever::builder()
        .backend("a", Arc::new(StaticBackend::new(texts(&["1", "2", "3", "4", "5"]))))
        .config(FusionConfig::from_toml_str("max_results = 4\n").expect("config"))
        .build()
        .expect("valid retriever");

    assert_eq!(retriever.invoke("q", None).await.expect("invoke").len(), 4);
    let call = CallConfig::new().top_n(2);
    let items = retriever.invoke("q", Some(&call)).await.expect("invoke");
    assert_eq!(contents(&items), ["1", "2"]);
}

// ── Test backends ──────────────────────────────────────────────────────

fn texts(contents: &[&str]) -> Vec<Item> {
    contents.iter().map(|c| Item::new(*c)).collect()
}

/// Returns up to `limit` items (default 2), tagging each with the limit it saw.
struct RecordingBackend;

#[async_trait]
impl Backend for RecordingBackend {
    async fn retrieve(
        &self,
        _query: &str,
        config: &BackendConfig,
    ) -> fusion_retriever::Result<Vec<Item>> {
        let limit = config.limit().unwrap_or(0);
        // Yield so concurrent calls interleave.
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok((0..limit)
            .map(|i| Item::new(format!("item-{i}")).with_metadata("seen_limit", limit))
            .collect())
    }

    fn defaults(&self) -> BackendConfig {
        BackendConfig::new().with_limit(2)
    }
}

/// Static list that records whether it was called.
struct CountingBackend {
    items: Vec<Item>,
    called: AtomicBool,
}

impl CountingBackend {
    fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            called: AtomicBool::new(false),
        }
    }

    fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for CountingBackend {
    async fn retrieve(
        &self,
        _query: &str,
        _config: &BackendConfig,
    ) -> fusion_retriever::Result<Vec<Item>> {
        self.called.store(true, Ordering::SeqCst);
        Ok(self.items.clone())
    }
}

/// Sleeps before answering; records whether the call finished or was dropped.
struct SleepyBackend {
    delay: Duration,
    completed: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl SleepyBackend {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            completed: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for SleepyBackend {
    async fn retrieve(
        &self,
        _query: &str,
        _config: &BackendConfig,
    ) -> fusion_retriever::Result<Vec<Item>> {
        let guard = DropFlag(self.dropped.clone());
        tokio::time::sleep(self.delay).await;
        self.completed.store(true, Ordering::SeqCst);
        std::mem::forget(guard);
        Ok(vec![Item::new("late")])
    }
}
