//! Fusion orchestrator: concurrent fan-out, reciprocal-rank scoring, dedup, ranking.
//!
//! This module resolves per-call overrides, fans queries out to every
//! registered backend concurrently, scores each ranked list by position,
//! deduplicates by item identity, and returns a stably sorted, optionally
//! truncated result set.

pub mod dedup;
pub mod dispatch;
pub mod fusion;
pub mod retriever;
pub mod scoring;
