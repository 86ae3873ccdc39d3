//! Fusion configuration with sensible defaults.
//!
//! [`FusionConfig`] controls the RRF smoothing constant, failure policy,
//! per-backend timeout and fused-output truncation. It can be built in code
//! or loaded from a TOML file; missing fields fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Canonical RRF smoothing constant.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Configuration for a fused retriever.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Smoothing constant `k` in `weight / (k + rank + 1)`. Larger values
    /// flatten the decay so lower-ranked items matter more.
    pub rrf_k: f64,
    /// Strict mode: any backend failure aborts the invocation, and call
    /// overrides naming an unknown backend are rejected.
    pub strict: bool,
    /// Per-backend timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of fused items to return. `None` returns everything.
    pub max_results: Option<usize>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            strict: false,
            timeout_ms: 8_000,
            max_results: None,
        }
    }
}

impl FusionConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `rrf_k` must be finite and >= 0
    /// - `timeout_ms` must be greater than 0
    /// - `max_results`, when set, must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if !self.rrf_k.is_finite() || self.rrf_k < 0.0 {
            return Err(FusionError::Config(
                "rrf_k must be a finite, non-negative number".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(FusionError::Config(
                "timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_results == Some(0) {
            return Err(FusionError::Config(
                "max_results must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// The per-backend timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse a configuration from TOML text, falling back to defaults for
    /// missing fields. The result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] if the text is not valid TOML for
    /// this structure or fails [`validate`](Self::validate).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| FusionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| FusionError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
