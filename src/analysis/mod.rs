//! Prompt analyzer (C5): extracts `{domain, sub_domains, keywords, tone,
//! capabilities, constraints}` from an agent's system prompt.
//!
//! Grounded on `prompt_analyzer.py` (`original_source/`): LLM-first JSON
//! extraction, validated and padded against the domain-defaults table,
//! falling back to lexical domain detection on any LLM or JSON failure.

mod domains;

pub use domains::{DOMAINS, DomainDefaults, PromptTemplate, detect_domain, keywords_for, starter_templates};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::llm::{ChatRequest, LlmProvider, ModelKind};
use crate::model::PromptAnalysis;

const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a JSON extraction assistant. Return only valid JSON, no markdown or explanation.";

#[derive(Debug, Deserialize, Default)]
struct RawAnalysis {
    domain: Option<String>,
    sub_domains: Option<Vec<String>>,
    personality: Option<String>,
    constraints: Option<Vec<String>>,
    suggested_name: Option<String>,
    domain_keywords: Option<Vec<String>>,
    tone: Option<String>,
    capabilities: Option<Vec<String>>,
}

/// Extracts structured metadata from an agent's system prompt.
pub struct PromptAnalyzer<'a> {
    llm: &'a dyn LlmProvider,
}

impl<'a> PromptAnalyzer<'a> {
    /// Builds an analyzer over the given LLM provider.
    #[must_use]
    pub const fn new(llm: &'a dyn LlmProvider) -> Self {
        Self { llm }
    }

    /// Analyzes `system_prompt`, returning a fully validated [`PromptAnalysis`].
    ///
    /// Never fails: any LLM or JSON error is absorbed into the lexical
    /// fallback path (SPEC_FULL.md §4.5).
    #[must_use]
    pub fn analyze(&self, system_prompt: &str) -> PromptAnalysis {
        match self.analyze_via_llm(system_prompt) {
            Ok(raw) => self.validate(raw),
            Err(e) => {
                warn!(error = %e, "prompt analysis LLM call failed, falling back to lexical detection");
                self.fallback_analysis(system_prompt)
            }
        }
    }

    fn analyze_via_llm(&self, system_prompt: &str) -> Result<RawAnalysis> {
        let user_message = format!(
            "Analyze the following system prompt and extract structured metadata.\n\n\
             SYSTEM PROMPT TO ANALYZE:\n\"\"\"\n{system_prompt}\n\"\"\"\n\n\
             Respond with a JSON object containing: domain, sub_domains, personality, \
             constraints, suggested_name, domain_keywords (about 20 keywords that define \
             this domain), tone, capabilities."
        );
        let model = self.llm.resolve_model(ModelKind::Fast).to_string();
        let request = ChatRequest::new(model, ANALYSIS_SYSTEM_PROMPT, user_message)
            .json_mode(true)
            .max_tokens(1024);

        let response = self.llm.chat(&request)?;
        serde_json::from_str(&response).map_err(|e| Error::LlmFailure {
            reason: format!("malformed prompt-analysis JSON: {e}"),
        })
    }

    /// Applies the §4.5 validation pass: missing fields default, and
    /// `domain_keywords` is padded from the domain-defaults table when the
    /// LLM returned fewer than 10 entries.
    fn validate(&self, raw: RawAnalysis) -> PromptAnalysis {
        let domain = raw
            .domain
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "general".to_string());
        let raw_keywords = raw.domain_keywords.unwrap_or_default();
        let domain_padding = owned_keywords_for(&domain);

        let (target, padding): (usize, &[String]) = if raw_keywords.len() < 10 {
            (20, &domain_padding)
        } else {
            (raw_keywords.len() + 1, &[])
        };

        let analysis = PromptAnalysis {
            domain,
            sub_domains: raw.sub_domains.unwrap_or_default(),
            domain_keywords: raw_keywords,
            personality: raw.personality.unwrap_or_else(|| "helpful and professional".to_string()),
            tone: raw.tone.unwrap_or_else(|| "professional".to_string()),
            capabilities: raw.capabilities.unwrap_or_default(),
            constraints: raw.constraints.unwrap_or_default(),
            suggested_name: raw.suggested_name,
        };

        analysis.validated(target, padding)
    }

    fn fallback_analysis(&self, system_prompt: &str) -> PromptAnalysis {
        let domain = detect_domain(system_prompt).to_string();
        let padding = owned_keywords_for(&domain);

        let analysis = PromptAnalysis {
            domain: domain.clone(),
            sub_domains: Vec::new(),
            domain_keywords: Vec::new(),
            personality: "helpful assistant".to_string(),
            tone: "professional".to_string(),
            capabilities: vec!["Answer questions".to_string(), "Provide information".to_string()],
            constraints: vec!["Stay within knowledge base".to_string(), "Be accurate".to_string()],
            suggested_name: Some(format!("{} Agent", titlecase(&domain))),
        };

        analysis.validated(20, &padding)
    }
}

fn owned_keywords_for(domain: &str) -> Vec<String> {
    keywords_for(domain)
        .map(|kws| kws.iter().map(|s| (*s).to_string()).collect())
        .unwrap_or_default()
}

fn titlecase(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + chars.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeProvider {
        response: String,
        fail: AtomicBool,
    }

    impl LlmProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }
        fn resolve_model(&self, _kind: ModelKind) -> &str {
            "fake-model"
        }
        fn chat(&self, _request: &ChatRequest) -> Result<String> {
            if self.fail.load(Ordering::Relaxed) {
                Err(Error::LlmFailure { reason: "simulated failure".to_string() })
            } else {
                Ok(self.response.clone())
            }
        }
    }

    #[test]
    fn test_analyze_parses_llm_json() {
        let provider = FakeProvider {
            response: r#"{"domain":"cooking","sub_domains":["baking"],"personality":"friendly","tone":"casual","domain_keywords":["recipe","oven","bake","chef","kitchen","dish","meal","taste","prepare","serve","dinner"],"capabilities":["suggest recipes"],"constraints":["no medical advice"],"suggested_name":"Chef Bot"}"#.to_string(),
            fail: AtomicBool::new(false),
        };
        let analysis = PromptAnalyzer::new(&provider).analyze("You help with recipes");
        assert_eq!(analysis.domain, "cooking");
        assert_eq!(analysis.domain_keywords[0], "cooking");
        assert_eq!(analysis.suggested_name.as_deref(), Some("Chef Bot"));
    }

    #[test]
    fn test_analyze_pads_short_keyword_list_from_domain_table() {
        let provider = FakeProvider {
            response: r#"{"domain":"cooking","domain_keywords":["recipe"]}"#.to_string(),
            fail: AtomicBool::new(false),
        };
        let analysis = PromptAnalyzer::new(&provider).analyze("cooking assistant");
        assert!(analysis.domain_keywords.len() >= 10);
    }

    #[test]
    fn test_analyze_does_not_pad_already_rich_keyword_list() {
        let keywords: Vec<String> = (0..15).map(|i| format!("kw{i}")).collect();
        let response = serde_json::json!({"domain": "widgets", "domain_keywords": keywords}).to_string();
        let provider = FakeProvider { response, fail: AtomicBool::new(false) };
        let analysis = PromptAnalyzer::new(&provider).analyze("widget assistant");
        assert_eq!(analysis.domain_keywords.len(), 16); // domain + 15 kws, no padding pulled
    }

    #[test]
    fn test_analyze_falls_back_on_llm_failure() {
        let provider = FakeProvider { response: String::new(), fail: AtomicBool::new(true) };
        let analysis = PromptAnalyzer::new(&provider).analyze("Ask your doctor about treatment");
        assert_eq!(analysis.domain, "medical");
        assert!(analysis.domain_keywords.len() >= 10);
    }

    #[test]
    fn test_analyze_falls_back_on_malformed_json() {
        let provider = FakeProvider { response: "not json".to_string(), fail: AtomicBool::new(false) };
        let analysis = PromptAnalyzer::new(&provider).analyze("the quick brown fox");
        assert_eq!(analysis.domain, "general");
    }
}
