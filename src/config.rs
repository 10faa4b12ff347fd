//! Deployment-wide tunables for the knowledge engine.
//!
//! The teacher crate has no dedicated configuration layer (its CLI flags
//! come straight from `clap`). This platform carries calibration constants
//! (RRF `k`, confidence weights, timeouts, the stuck-job threshold) that
//! don't belong on every call site, so they are assembled once via
//! `figment`: built-in defaults, optionally overridden by a TOML file, then
//! by environment variables prefixed `MEXAR_`.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Weights and thresholds for the confidence formula (C11 step 10).
///
/// Calibration numbers carried verbatim from the original reasoning engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    /// Weight applied to normalized top retrieval similarity.
    pub similarity: f64,
    /// Weight applied to normalized top rerank score.
    pub rerank: f64,
    /// Weight applied to the faithfulness score.
    pub faithfulness: f64,
    /// Floor added to every confidence computation.
    pub base_floor: f64,
    /// Above this normalized-similarity threshold, combined with a high
    /// faithfulness score, confidence is floored at `high_confidence_floor`.
    pub high_similarity_threshold: f64,
    /// Faithfulness threshold paired with `high_similarity_threshold`.
    pub high_faithfulness_threshold: f64,
    /// Confidence floor applied when both high thresholds are met.
    pub high_confidence_floor: f64,
    /// Below this normalized-similarity threshold, confidence is capped.
    pub low_similarity_threshold: f64,
    /// Confidence cap applied when `low_similarity_threshold` is crossed.
    pub low_confidence_cap: f64,
    /// Final lower clamp bound.
    pub min_confidence: f64,
    /// Final upper clamp bound.
    pub max_confidence: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            similarity: 0.35,
            rerank: 0.30,
            faithfulness: 0.25,
            base_floor: 0.10,
            high_similarity_threshold: 0.7,
            high_faithfulness_threshold: 0.8,
            high_confidence_floor: 0.75,
            low_similarity_threshold: 0.3,
            low_confidence_cap: 0.45,
            min_confidence: 0.15,
            max_confidence: 0.95,
        }
    }
}

/// Deployment-wide engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RRF `k` parameter used by the chunk index (C4).
    pub rrf_k: u32,
    /// Confidence formula weights/thresholds (C11).
    pub confidence: ConfidenceWeights,
    /// Guardrail in-domain threshold (C6).
    pub guardrail_threshold: f32,
    /// Minimum total entries for a corpus to be judged sufficient (C1).
    pub min_entries: usize,
    /// Minimum total characters for a corpus to be judged sufficient (C1).
    pub min_characters: usize,
    /// If true, compilation aborts when the corpus is insufficient rather
    /// than proceeding with a warning (SPEC_FULL.md §9 ambiguity, default
    /// preserves the original's permissive behavior).
    pub fail_on_insufficient_data: bool,
    /// Target tokens (whitespace words) per unstructured chunk (C2).
    pub chunk_target_tokens: usize,
    /// Minutes after which an `in_progress` job is flagged as stuck (C13).
    pub stuck_job_minutes: u64,
    /// Timeout in seconds for an LLM chat call.
    pub llm_chat_timeout_secs: u64,
    /// Timeout in seconds for an LLM JSON-extraction call.
    pub llm_json_timeout_secs: u64,
    /// SQLite connection pool size.
    pub pool_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60,
            confidence: ConfidenceWeights::default(),
            guardrail_threshold: 0.05,
            min_entries: 20,
            min_characters: 2000,
            fail_on_insufficient_data: false,
            chunk_target_tokens: 400,
            stuck_job_minutes: 30,
            llm_chat_timeout_secs: 60,
            llm_json_timeout_secs: 30,
            pool_size: 8,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from built-in defaults, an optional
    /// `mexar.toml` file, and `MEXAR_`-prefixed environment variables, in
    /// that order of increasing precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source fails to parse.
    pub fn load() -> Result<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("mexar.toml"))
            .merge(Env::prefixed("MEXAR_").split("_"))
            .extract()
            .map_err(|e| Error::Config {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_calibration_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.rrf_k, 60);
        assert!((config.confidence.similarity - 0.35).abs() < f64::EPSILON);
        assert!((config.confidence.rerank - 0.30).abs() < f64::EPSILON);
        assert!((config.confidence.faithfulness - 0.25).abs() < f64::EPSILON);
        assert!((config.confidence.base_floor - 0.10).abs() < f64::EPSILON);
        assert_eq!(config.min_entries, 20);
        assert_eq!(config.min_characters, 2000);
    }

    #[test]
    fn test_load_without_file_or_env_returns_defaults() {
        let config = EngineConfig::load().unwrap();
        assert_eq!(config.rrf_k, 60);
    }
}
