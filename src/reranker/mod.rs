//! Cross-encoder reranker (C7).
//!
//! No cross-encoder crate sits in the teacher's or the wider pack's
//! dependency stack (the same gap noted for PDF/DOCX text extraction in
//! [`crate::parsing`]), so the contract is honored via an injected
//! [`Reranker`] trait object with a documented degraded default that
//! returns candidates in their input order at a constant placeholder
//! score, per SPEC_FULL.md §4.7.

/// One candidate to be scored against a query.
#[derive(Debug, Clone)]
pub struct RerankCandidate {
    /// Chunk ID, threaded through unchanged.
    pub chunk_id: i64,
    /// Candidate text, truncated to 512 whitespace-separated tokens before
    /// scoring.
    pub content: String,
}

impl RerankCandidate {
    /// Builds a candidate, truncating `content` to [`MAX_CONTENT_TOKENS`]
    /// whitespace-separated tokens so a pathologically long chunk can't blow
    /// up a cross-encoder's input window.
    #[must_use]
    pub fn new(chunk_id: i64, content: &str) -> Self {
        Self { chunk_id, content: truncate_content(content) }
    }
}

/// A scored, reranked candidate.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// Chunk ID.
    pub chunk_id: i64,
    /// Cross-encoder relevance score. Degraded implementations return the
    /// constant [`DEGRADED_SCORE`] for every candidate.
    pub score: f32,
}

/// Placeholder score used by [`DegradedReranker`] and by the reasoning
/// orchestrator's normalized-rerank component when no reranker is
/// available (SPEC_FULL.md §4.7).
pub const DEGRADED_SCORE: f32 = 0.5;

/// Maximum whitespace-separated tokens of candidate content considered.
const MAX_CONTENT_TOKENS: usize = 512;

/// Cross-encoder scorer for `(query, candidate)` pairs.
pub trait Reranker: Send + Sync {
    /// Whether this reranker is a real cross-encoder or the degraded
    /// constant-score fallback. The orchestrator uses this to decide
    /// whether the rerank component of its confidence formula should use
    /// the returned score or [`DEGRADED_SCORE`].
    fn is_degraded(&self) -> bool;

    /// Scores and reorders `candidates` against `query`, returning the
    /// top `k`.
    fn rerank(&self, query: &str, candidates: &[RerankCandidate], k: usize) -> Vec<RankedCandidate>;
}

fn truncate_content(content: &str) -> String {
    content.split_whitespace().take(MAX_CONTENT_TOKENS).collect::<Vec<_>>().join(" ")
}

/// The always-available degraded reranker: preserves input order and
/// assigns every candidate [`DEGRADED_SCORE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DegradedReranker;

impl DegradedReranker {
    /// Creates a new degraded reranker.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reranker for DegradedReranker {
    fn is_degraded(&self) -> bool {
        true
    }

    fn rerank(&self, _query: &str, candidates: &[RerankCandidate], k: usize) -> Vec<RankedCandidate> {
        candidates
            .iter()
            .take(k)
            .map(|c| RankedCandidate { chunk_id: c.chunk_id, score: DEGRADED_SCORE })
            .collect()
    }
}

/// Builds the default reranker. There is currently no real cross-encoder
/// implementation in the dependency stack (see module docs); this always
/// returns [`DegradedReranker`], kept as a named seam so a future
/// cross-encoder-backed implementation can be swapped in without touching
/// call sites.
#[must_use]
pub fn create_reranker() -> Box<dyn Reranker> {
    Box::new(DegradedReranker::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<RerankCandidate> {
        vec![
            RerankCandidate { chunk_id: 1, content: "alpha".to_string() },
            RerankCandidate { chunk_id: 2, content: "beta".to_string() },
            RerankCandidate { chunk_id: 3, content: "gamma".to_string() },
        ]
    }

    #[test]
    fn test_degraded_reranker_preserves_order() {
        let reranker = DegradedReranker::new();
        let ranked = reranker.rerank("query", &candidates(), 5);
        assert_eq!(ranked.iter().map(|r| r.chunk_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(ranked.iter().all(|r| (r.score - DEGRADED_SCORE).abs() < f32::EPSILON));
    }

    #[test]
    fn test_degraded_reranker_respects_k() {
        let reranker = DegradedReranker::new();
        let ranked = reranker.rerank("query", &candidates(), 2);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_create_reranker_is_degraded() {
        assert!(create_reranker().is_degraded());
    }

    #[test]
    fn test_truncate_content_caps_tokens() {
        let long = (0..600).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let truncated = truncate_content(&long);
        assert_eq!(truncated.split_whitespace().count(), MAX_CONTENT_TOKENS);
    }

    #[test]
    fn test_rerank_candidate_new_truncates_content() {
        let long = (0..600).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let candidate = RerankCandidate::new(1, &long);
        assert_eq!(candidate.content.split_whitespace().count(), MAX_CONTENT_TOKENS);
    }
}
