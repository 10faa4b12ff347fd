//! `PromptAnalysis`: the structured read of an agent's system prompt (C5).

use serde::{Deserialize, Serialize};

/// Structured extraction of an agent's domain, vocabulary, and voice from
/// its system prompt. Produced by the prompt analyzer and stored on
/// [`crate::model::Agent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptAnalysis {
    /// Primary domain, e.g. `"cooking"`. Always the first element of
    /// `domain_keywords`.
    pub domain: String,
    /// Narrower domains nested under `domain`.
    pub sub_domains: Vec<String>,
    /// Deduplicated keyword vocabulary, padded to at least 10 entries from
    /// the domain-defaults table when the analyzer returns fewer.
    pub domain_keywords: Vec<String>,
    /// Short description of the agent's persona.
    pub personality: String,
    /// Tone descriptor, e.g. `"friendly"`, `"formal"`.
    pub tone: String,
    /// Capabilities the agent claims to have.
    pub capabilities: Vec<String>,
    /// Constraints the agent should respect.
    pub constraints: Vec<String>,
    /// A suggested display name for the agent, if the analyzer proposed one.
    pub suggested_name: Option<String>,
}

impl PromptAnalysis {
    /// Builds a validated analysis: ensures `domain_keywords` contains
    /// `domain` as its first element and has at least `min_keywords`
    /// entries, padding from `padding` (in order) if short.
    #[must_use]
    pub fn validated(mut self, min_keywords: usize, padding: &[String]) -> Self {
        if self.domain.is_empty() {
            self.domain = "general".to_string();
        }

        let mut keywords: Vec<String> = Vec::with_capacity(min_keywords.max(self.domain_keywords.len()) + 1);
        keywords.push(self.domain.clone());
        for kw in self.domain_keywords.iter().chain(padding.iter()) {
            let kw = kw.trim().to_lowercase();
            if !kw.is_empty() && !keywords.contains(&kw) {
                keywords.push(kw);
            }
            if keywords.len() >= min_keywords.max(1) {
                break;
            }
        }
        self.domain_keywords = keywords;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_pads_short_keyword_list() {
        let analysis = PromptAnalysis {
            domain: "cooking".to_string(),
            domain_keywords: vec!["recipe".to_string()],
            ..Default::default()
        };
        let padding = vec!["ingredient".to_string(), "oven".to_string(), "bake".to_string()];
        let validated = analysis.validated(4, &padding);
        assert_eq!(validated.domain_keywords[0], "cooking");
        assert!(validated.domain_keywords.len() >= 4);
    }

    #[test]
    fn test_validated_defaults_empty_domain() {
        let analysis = PromptAnalysis::default();
        let validated = analysis.validated(1, &[]);
        assert_eq!(validated.domain, "general");
        assert_eq!(validated.domain_keywords, vec!["general".to_string()]);
    }
}
