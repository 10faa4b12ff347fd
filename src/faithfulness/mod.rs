//! Faithfulness scorer (C10): measures the fraction of an answer's claims
//! that the retrieved context supports.
//!
//! Grounded on `faithfulness.py` (`original_source/`): LLM-based claim
//! extraction with a sentence-splitting fallback, per-claim LLM
//! verification with an optimistic ("supported") fallback on failure so a
//! provider outage never silently tanks every answer's faithfulness score,
//! and a no-LLM `quick_score` text-overlap estimate (SPEC_FULL.md §4.10,
//! §9).

use tracing::warn;

use crate::llm::{ChatRequest, LlmProvider, ModelKind};
use crate::model::FaithfulnessResult;

/// Answer text is truncated to this many characters before claim
/// extraction.
const CLAIM_EXTRACTION_CHARS: usize = 2_000;
/// Context is truncated to this many characters before verification.
const VERIFICATION_CONTEXT_CHARS: usize = 4_000;
/// Maximum claims kept by the sentence-splitting fallback.
const MAX_FALLBACK_CLAIMS: usize = 10;
/// Minimum sentence length (chars) to count as a claim in the fallback path.
const MIN_FALLBACK_CLAIM_LEN: usize = 20;
/// Maximum unsupported claims retained for display.
const MAX_DISPLAY_UNSUPPORTED: usize = 5;

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Scores `answer` against `context` using the full LLM-backed pipeline:
/// claim extraction, then per-claim verification.
///
/// Never fails: extraction and verification failures degrade to their
/// documented fallbacks rather than propagating an error.
#[must_use]
pub fn score(llm: &dyn LlmProvider, answer: &str, context: &str) -> FaithfulnessResult {
    if answer.trim().is_empty() || context.trim().is_empty() {
        return FaithfulnessResult::vacuous();
    }

    let claims = extract_claims(llm, answer);
    if claims.is_empty() {
        return FaithfulnessResult::vacuous();
    }

    let mut supported = 0usize;
    let mut unsupported = Vec::new();
    for claim in &claims {
        if is_supported(llm, claim, context) {
            supported += 1;
        } else {
            unsupported.push(claim.clone());
        }
    }

    let raw_score = supported as f64 / claims.len() as f64;
    unsupported.truncate(MAX_DISPLAY_UNSUPPORTED);

    FaithfulnessResult {
        score: (raw_score * 1000.0).round() / 1000.0,
        total_claims: claims.len(),
        supported_claims: supported,
        unsupported_claims: unsupported,
    }
}

fn extract_claims(llm: &dyn LlmProvider, answer: &str) -> Vec<String> {
    let truncated = truncate_chars(answer, CLAIM_EXTRACTION_CHARS);
    let user_message = format!(
        "Extract individual factual claims from this answer. A claim is a specific statement \
         that can be verified as true or false. Return ONLY a JSON array of strings, no \
         explanation.\n\nAnswer: \"{truncated}\"\n\nExample output: [\"Claim 1\", \"Claim 2\"]"
    );
    let model = llm.resolve_model(ModelKind::Fast).to_string();
    let request = ChatRequest::new(model, "You extract factual claims. Return only valid JSON array.", user_message)
        .json_mode(true);

    match llm.chat(&request) {
        Ok(response) => match serde_json::from_str::<Vec<String>>(&response) {
            Ok(claims) => claims.into_iter().filter(|c| !c.trim().is_empty()).collect(),
            Err(e) => {
                warn!(error = %e, "claim extraction returned malformed JSON, falling back to sentence split");
                fallback_extract_claims(answer)
            }
        },
        Err(e) => {
            warn!(error = %e, "claim extraction LLM call failed, falling back to sentence split");
            fallback_extract_claims(answer)
        }
    }
}

fn fallback_extract_claims(answer: &str) -> Vec<String> {
    answer
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_FALLBACK_CLAIM_LEN)
        .take(MAX_FALLBACK_CLAIMS)
        .map(str::to_string)
        .collect()
}

fn is_supported(llm: &dyn LlmProvider, claim: &str, context: &str) -> bool {
    let truncated_context = truncate_chars(context, VERIFICATION_CONTEXT_CHARS);
    let user_message = format!(
        "Is this claim supported by the context? Answer only YES or NO.\n\nClaim: \"{claim}\"\n\n\
         Context (first {VERIFICATION_CONTEXT_CHARS} chars):\n\"{truncated_context}\"\n\n\
         Answer YES if the context contains information that supports this claim. Answer NO if \
         the claim cannot be verified from the context or contradicts it."
    );
    let model = llm.resolve_model(ModelKind::Fast).to_string();
    let request = ChatRequest::new(model, "You verify claims. Answer only YES or NO.", user_message);

    match llm.chat(&request) {
        Ok(response) => response.to_uppercase().contains("YES"),
        Err(e) => {
            warn!(error = %e, "claim verification failed, defaulting to supported (optimistic policy)");
            true
        }
    }
}

/// No-LLM faithfulness estimate: the fraction of distinct significant
/// (more than 4 letters) answer words that occur in `context`, scaled by
/// 1.5 and clamped to `[0, 1]`. Never substituted for [`score`] in the main
/// reasoning pipeline; exposed for tests and optional cheap pre-checks
/// (SPEC_FULL.md §9, "Supplemented features").
#[must_use]
pub fn quick_score(answer: &str, context: &str) -> f64 {
    if answer.trim().is_empty() || context.trim().is_empty() {
        return 0.5;
    }

    let context_lower = context.to_lowercase();
    let mut answer_words: Vec<String> =
        answer.split_whitespace().map(str::to_lowercase).filter(|w| w.chars().count() > 4).collect();
    answer_words.sort();
    answer_words.dedup();

    if answer_words.is_empty() {
        return 0.5;
    }

    let found = answer_words.iter().filter(|w| context_lower.contains(w.as_str())).count();
    let overlap = found as f64 / answer_words.len() as f64;
    (overlap * 1.5).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};

    struct FakeProvider {
        claims_response: String,
        verify_response: String,
    }

    impl LlmProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }
        fn resolve_model(&self, _kind: ModelKind) -> &str {
            "fake-model"
        }
        fn chat(&self, request: &ChatRequest) -> Result<String> {
            if request.json_mode {
                Ok(self.claims_response.clone())
            } else {
                Ok(self.verify_response.clone())
            }
        }
    }

    struct FailingProvider;
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn resolve_model(&self, _kind: ModelKind) -> &str {
            "fake-model"
        }
        fn chat(&self, _request: &ChatRequest) -> Result<String> {
            Err(Error::LlmFailure { reason: "down".to_string() })
        }
    }

    #[test]
    fn test_vacuous_for_empty_answer() {
        let result = score(&FailingProvider, "", "some context");
        assert_eq!(result.score, 1.0);
        assert_eq!(result.total_claims, 0);
    }

    #[test]
    fn test_all_claims_supported() {
        let provider = FakeProvider {
            claims_response: r#"["Romaine is the base", "Parmesan adds saltiness"]"#.to_string(),
            verify_response: "YES".to_string(),
        };
        let result = score(&provider, "Romaine is the base. Parmesan adds saltiness.", "context about romaine and parmesan");
        assert_eq!(result.total_claims, 2);
        assert_eq!(result.supported_claims, 2);
        assert!((result.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_verification_failure_is_optimistic() {
        let result = is_supported(&FailingProvider, "a claim", "context");
        assert!(result);
    }

    #[test]
    fn test_claim_extraction_falls_back_on_malformed_json() {
        let answer = "This is a reasonably long sentence that should count. Short one.";
        let claims = fallback_extract_claims(answer);
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_quick_score_full_overlap() {
        let score = quick_score("romaine parmesan croutons", "this salad has romaine parmesan croutons");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_quick_score_no_overlap() {
        let score = quick_score("xylophone zeppelin", "completely unrelated words here");
        assert!(score < 0.5);
    }

    #[test]
    fn test_quick_score_empty_inputs_returns_half() {
        assert!((quick_score("", "context") - 0.5).abs() < 1e-9);
    }
}
