//! Bundled backend implementations.
//!
//! Each module provides a struct implementing [`crate::backend::Backend`].
//! They are in-memory and deterministic, which makes them useful as
//! reference adapters and as stand-ins for real indexes in tests.

pub mod failing;
pub mod keyword;
pub mod static_list;

pub use failing::FailingBackend;
pub use keyword::KeywordBackend;
pub use static_list::StaticBackend;
