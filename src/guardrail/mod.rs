//! Domain guardrail (C6): decides whether a query is in-domain for an
//! agent, combining substring bonuses with LCS-based fuzzy token matching.
//!
//! The threshold (default 0.05) is intentionally low to favor recall:
//! borderline queries are still answered but carry low confidence
//! downstream (SPEC_FULL.md §4.6).

use crate::model::PromptAnalysis;

/// Maximum number of signature terms considered for fuzzy matching.
const MAX_SIGNATURE_TERMS: usize = 100;

/// Longest-common-subsequence-based similarity ratio in `[0, 1]`, the same
/// shape as Python's `difflib` quick-ratio: `2 * lcs_len / (len_a + len_b)`.
#[must_use]
pub fn lcs_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs_len = prev[b.len()];

    (2 * lcs_len) as f64 / (a.len() + b.len()) as f64
}

/// Outcome of a guardrail check.
#[derive(Debug, Clone, Copy)]
pub struct GuardrailResult {
    /// Whether the query is judged in-domain.
    pub in_domain: bool,
    /// Relevance score in `[0, 1]`.
    pub score: f32,
}

/// Builds the ordered list of signature terms for an agent: domain, then
/// sub-domains, then domain keywords, deduplicated and capped at
/// [`MAX_SIGNATURE_TERMS`].
fn domain_signature(analysis: &PromptAnalysis) -> Vec<String> {
    let mut signature = Vec::new();
    let mut push_unique = |term: &str| {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !signature.contains(&term) {
            signature.push(term);
        }
    };

    push_unique(&analysis.domain);
    for sub in &analysis.sub_domains {
        push_unique(sub);
    }
    for kw in &analysis.domain_keywords {
        push_unique(kw);
    }

    signature.truncate(MAX_SIGNATURE_TERMS);
    signature
}

/// Checks whether `query` is in-domain for an agent described by
/// `prompt_analysis`.
#[must_use]
pub fn check(query: &str, prompt_analysis: &PromptAnalysis, threshold: f32) -> GuardrailResult {
    let query_lower = query.to_lowercase();
    let query_words: Vec<&str> = query_lower.split_whitespace().collect();
    let signature = domain_signature(prompt_analysis);

    let mut bonus = 0.0_f64;
    if !prompt_analysis.domain.is_empty() && query_lower.contains(&prompt_analysis.domain.to_lowercase()) {
        bonus += 3.0;
    }
    for sub in &prompt_analysis.sub_domains {
        if query_lower.contains(&sub.to_lowercase()) {
            bonus += 2.0;
        }
    }
    for kw in &prompt_analysis.domain_keywords {
        if query_lower.contains(&kw.to_lowercase()) {
            bonus += 1.5;
        }
    }

    let mut matches = 0.0_f64;
    for word in query_words.iter().filter(|w| w.len() >= 3) {
        let mut best_ratio = 0.0_f64;
        let mut substring_hit = false;
        for term in &signature {
            let ratio = lcs_ratio(word, term);
            if ratio > best_ratio {
                best_ratio = ratio;
            }
            if term.contains(*word) || word.contains(term.as_str()) {
                substring_hit = true;
            }
        }
        if best_ratio >= 0.75 {
            matches += 1.0;
        } else if substring_hit {
            matches += 0.5;
        }
    }

    let denom = query_words.len().clamp(1, 10) as f64;
    let base = matches / denom;
    let bonus_component = (bonus * 0.1).min(0.5);
    let mut score = (base + bonus_component).min(1.0);

    if bonus >= 1.0 {
        score = score.max(0.2);
    }

    let score = score as f32;
    GuardrailResult {
        in_domain: score >= threshold,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cooking_analysis() -> PromptAnalysis {
        PromptAnalysis {
            domain: "cooking".to_string(),
            domain_keywords: vec![
                "cooking".to_string(),
                "recipe".to_string(),
                "ingredient".to_string(),
                "cook".to_string(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_lcs_ratio_identical_strings_is_one() {
        assert!((lcs_ratio("recipe", "recipe") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_lcs_ratio_empty_is_zero() {
        assert_eq!(lcs_ratio("", "recipe"), 0.0);
    }

    #[test]
    fn test_query_naming_domain_is_in_domain_with_bonus_floor() {
        let result = check("cooking", &cooking_analysis(), 0.05);
        assert!(result.in_domain);
        assert!(result.score >= 0.2);
    }

    #[test]
    fn test_out_of_domain_query_scores_low() {
        let result = check("How do I configure a BGP router?", &cooking_analysis(), 0.05);
        assert!(!result.in_domain || result.score < 0.3);
    }

    #[test]
    fn test_keyword_hit_raises_score() {
        let result = check("What ingredients go in this recipe?", &cooking_analysis(), 0.05);
        assert!(result.in_domain);
    }
}
