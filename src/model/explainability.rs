//! Explainability payload returned alongside every chat response (C11).

use serde::{Deserialize, Serialize};

/// A brief justification of why the answer looks the way it does, plus the
/// sources that informed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhyThisAnswer {
    /// One-line summary of the retrieval+synthesis decision.
    pub summary: String,
    /// Sources shown to the user, most relevant first.
    pub sources: Vec<SourceSummary>,
}

/// A condensed view of an [`crate::model::AttributedSource`] for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Citation number.
    pub citation: usize,
    /// Human-readable source file/entry.
    pub source_file: String,
    /// Short content preview.
    pub content_preview: String,
    /// Relevance score in `[0, 1]`.
    pub relevance_score: f32,
}

/// Breakdown of the components feeding the final confidence score (C11 step
/// 10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// Final clamped confidence, `[0.15, 0.95]`.
    pub overall: f64,
    /// Guardrail domain-relevance score.
    pub domain_relevance: f64,
    /// Normalized top retrieval score.
    pub retrieval_quality: f64,
    /// Normalized top rerank score.
    pub rerank_score: f64,
    /// Faithfulness score backing this answer.
    pub faithfulness: f64,
    /// `supported_claims / total_claims` as a display fraction string.
    pub claims_supported: String,
}

/// Inputs recorded for audit/debugging alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainabilityInputs {
    /// The verbatim query the caller submitted.
    pub original_query: String,
    /// Whether multimodal context accompanied the query.
    pub has_multimodal: bool,
    /// Number of chunks retrieved before reranking.
    pub chunks_retrieved: usize,
}

/// The full explainability record returned with every `chat` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explainability {
    /// Why this answer was produced, with its backing sources.
    pub why_this_answer: WhyThisAnswer,
    /// Confidence component breakdown.
    pub confidence_breakdown: ConfidenceBreakdown,
    /// Up to 3 claims the faithfulness scorer could not support.
    pub unsupported_claims: Vec<String>,
    /// Audit inputs.
    pub inputs: ExplainabilityInputs,
    /// Optional safety notice for health-adjacent domains (red-flag
    /// language or low-confidence disclaimer), see SPEC_FULL.md's safety
    /// overlay supplement.
    pub safety_notice: Option<String>,
    /// Set when the guardrail rejected the query as out-of-domain.
    pub rejection_reason: Option<String>,
}
