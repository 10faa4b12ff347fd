//! `FaithfulnessResult`: the output of the faithfulness scorer (C10).

use serde::{Deserialize, Serialize};

/// Fraction of an answer's atomic claims that the retrieved context
/// supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaithfulnessResult {
    /// `supported_claims / total_claims`, or `1.0` if `total_claims == 0`.
    /// Rounded to 3 decimals.
    pub score: f64,
    /// Total claims extracted from the answer.
    pub total_claims: usize,
    /// Claims the context was judged to support.
    pub supported_claims: usize,
    /// Up to 5 claims the context did not support, for display.
    pub unsupported_claims: Vec<String>,
}

impl FaithfulnessResult {
    /// The trivially faithful result for an answer with no extractable
    /// claims.
    #[must_use]
    pub fn vacuous() -> Self {
        Self {
            score: 1.0,
            total_claims: 0,
            supported_claims: 0,
            unsupported_claims: Vec::new(),
        }
    }
}
