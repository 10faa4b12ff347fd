//! Reasoning orchestrator (C11): the end-to-end per-query pipeline that
//! turns `(agent, query)` into a cited answer plus an explainability record.
//!
//! Ties together every other component built so far: C6 guardrail, C4
//! hybrid search, C7 rerank, C8 synthesis, C9 attribution, C10
//! faithfulness, plus the confidence formula and the health-domain safety
//! overlay (SPEC_FULL.md §4.11).

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::guardrail;
use crate::llm::LlmProvider;
use crate::model::{
    Agent, AgentStatus, ConfidenceBreakdown, Explainability, ExplainabilityInputs, SourceSummary, WhyThisAnswer,
    normalize_agent_name,
};
use crate::reranker::{RankedCandidate, RerankCandidate, Reranker};
use crate::retrieval::{RetrievalConfig, hybrid_search};
use crate::store::Store;
use crate::{attribution, faithfulness, synthesis};

const TOP_K_RETRIEVE: usize = 20;
const TOP_K_RERANK: usize = 5;
const MAX_EXPLAINABILITY_UNSUPPORTED: usize = 3;

const OUT_OF_DOMAIN_ANSWER: &str = "I don't have information about that in my knowledge base. This question \
appears to be outside my area of expertise.";
const NO_RESULTS_ANSWER: &str = "I don't have any relevant information to answer that question.";

/// Domains the safety overlay applies to, ported from `safety_rules.py`'s
/// implicit medical framing (the module is domain-agnostic in form but only
/// exercised for the medical domain in the original).
const HEALTH_ADJACENT_DOMAINS: &[&str] = &["medical"];

/// Emergency/red-flag phrases checked against the synthesized answer,
/// ported verbatim from `safety_rules.py`.
const RED_FLAGS: &[&str] = &["chest pain", "difficulty breathing", "severe bleeding", "unconscious", "seizure"];

/// Confidence below which the low-confidence disclaimer is attached.
const SAFETY_LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// The result of one `reason` call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// User-visible answer, with citation markers inserted.
    pub answer: String,
    /// Final clamped confidence, `[0.15, 0.95]` on the happy path.
    pub confidence: f64,
    /// Whether the guardrail judged the query in-domain.
    pub in_domain: bool,
    /// Structured explainability record.
    pub explainability: Explainability,
}

/// Thread-safe in-process cache of agent records, keyed by `(tenant_id,
/// normalized name)`. Invalidated on status change and delete, per
/// SPEC_FULL.md §5.
#[derive(Debug, Default)]
pub struct AgentCache {
    inner: Mutex<HashMap<(String, String), Agent>>,
}

impl AgentCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached agent for `(tenant_id, name)`, loading and
    /// caching it from `store` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such agent exists, or propagates a
    /// store error.
    pub(crate) fn get_or_load(&self, store: &dyn Store, tenant_id: &str, name: &str) -> Result<Agent> {
        let key = (tenant_id.to_string(), normalize_agent_name(name));
        if let Some(agent) = self.inner.lock().expect("agent cache poisoned").get(&key) {
            return Ok(agent.clone());
        }

        let agent = store
            .get_agent_by_name(tenant_id, name)?
            .ok_or_else(|| Error::NotFound { name: name.to_string() })?;
        self.inner.lock().expect("agent cache poisoned").insert(key, agent.clone());
        Ok(agent)
    }

    /// Removes any cached entry for `(tenant_id, name)`. Call this after an
    /// agent's status changes or it is deleted.
    pub fn invalidate(&self, tenant_id: &str, name: &str) {
        let key = (tenant_id.to_string(), normalize_agent_name(name));
        self.inner.lock().expect("agent cache poisoned").remove(&key);
    }
}

/// Bundles the dependencies one `reason` call needs. Borrowed, not owned:
/// callers construct this per-request from their long-lived store/embedder/
/// llm/reranker instances.
pub struct ReasoningOrchestrator<'a> {
    /// Persistence layer.
    pub store: &'a dyn Store,
    /// Embedding provider, used for retrieval and per-sentence attribution.
    pub embedder: &'a dyn Embedder,
    /// LLM provider, used for synthesis and faithfulness scoring.
    pub llm: &'a dyn LlmProvider,
    /// Cross-encoder reranker (or the degraded default).
    pub reranker: &'a dyn Reranker,
    /// Deployment-wide tunables, including the confidence formula weights.
    pub config: &'a EngineConfig,
    /// Agent cache shared across calls.
    pub cache: &'a AgentCache,
}

impl ReasoningOrchestrator<'_> {
    /// Answers `query` against the named agent's compiled knowledge base.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the agent does not exist, or
    /// [`Error::NotReady`] if it is not yet compiled. Does not otherwise
    /// propagate errors from its component calls: LLM/embedding/reranker
    /// failures degrade to their documented fallbacks per §4.8-§4.10.
    #[instrument(skip(self, query, multimodal_context), fields(tenant_id, agent_name = %name))]
    pub fn reason(
        &self,
        tenant_id: &str,
        name: &str,
        query: &str,
        multimodal_context: Option<&str>,
    ) -> Result<ChatResponse> {
        let agent = self.cache.get_or_load(self.store, tenant_id, name)?;
        let agent_id = agent.id.ok_or_else(|| Error::NotFound { name: name.to_string() })?;

        if agent.status != AgentStatus::Ready {
            return Err(Error::NotReady { name: name.to_string(), status: agent.status.as_str().to_string() });
        }

        let full_query = match multimodal_context {
            Some(mm) if !mm.trim().is_empty() => format!("{query} {mm}"),
            _ => query.to_string(),
        };

        let prompt_analysis = agent.prompt_analysis.clone().unwrap_or_default();
        let guard = guardrail::check(&full_query, &prompt_analysis, self.config.guardrail_threshold);

        if !guard.in_domain {
            info!(score = guard.score, "query rejected as out-of-domain");
            return Ok(self.rejection_response(query, multimodal_context, guard.score));
        }

        let retrieval_config = RetrievalConfig { top_k: TOP_K_RETRIEVE, rrf_k: self.config.rrf_k, ..RetrievalConfig::default() };
        let retrieved = hybrid_search(self.store, self.embedder, agent_id, &full_query, &retrieval_config)?;

        if retrieved.is_empty() {
            info!("no retrieval results, returning canned no-information answer");
            return Ok(self.empty_result_response(query, multimodal_context, guard.score));
        }

        let top_rrf = retrieved[0].score;

        let mut chunks = Vec::with_capacity(retrieved.len());
        for r in &retrieved {
            if let Some(chunk) = self.store.get_chunk(r.chunk_id)? {
                chunks.push(chunk);
            }
        }

        let candidates: Vec<RerankCandidate> =
            chunks.iter().map(|c| RerankCandidate::new(c.id.unwrap_or_default(), &c.content)).collect();
        let ranked: Vec<RankedCandidate> = self.reranker.rerank(query, &candidates, TOP_K_RERANK);
        let top_rerank = f64::from(ranked.first().map_or(0.0, |r| r.score));

        let top5: Vec<_> = ranked
            .iter()
            .filter_map(|r| chunks.iter().find(|c| c.id == Some(r.chunk_id)))
            .collect();

        let context = top5.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n\n---\n\n");

        let answer = synthesis::generate(self.llm, query, &context, &agent.system_prompt, multimodal_context);

        let attribution_chunks: Vec<attribution::AttributionChunk> = top5
            .iter()
            .map(|c| attribution::AttributionChunk {
                chunk_id: c.id.unwrap_or_default(),
                source: c.source.clone(),
                content: c.content.clone(),
                embedding: c.embedding.clone(),
            })
            .collect();
        let attributed = attribution::attribute(self.embedder, &answer, &attribution_chunks)?;

        let faithfulness_result = faithfulness::score(self.llm, &answer, &context);

        let norm_sim = (top_rrf * 30.0).clamp(0.0, 1.0);
        let norm_rerank = ((top_rerank + 10.0) / 20.0).clamp(0.0, 1.0);
        let confidence = self.compute_confidence(norm_sim, norm_rerank, faithfulness_result.score);

        let mut unsupported = faithfulness_result.unsupported_claims.clone();
        unsupported.truncate(MAX_EXPLAINABILITY_UNSUPPORTED);

        let sources: Vec<SourceSummary> = attributed
            .sources
            .iter()
            .map(|s| SourceSummary {
                citation: s.citation,
                source_file: s.source.clone(),
                content_preview: s.preview.clone(),
                relevance_score: s.similarity,
            })
            .collect();

        let explainability = Explainability {
            why_this_answer: WhyThisAnswer {
                summary: format!(
                    "Answered from {} retrieved source(s) after domain and faithfulness checks.",
                    attributed.sources.len()
                ),
                sources,
            },
            confidence_breakdown: ConfidenceBreakdown {
                overall: confidence,
                domain_relevance: f64::from(guard.score),
                retrieval_quality: norm_sim,
                rerank_score: norm_rerank,
                faithfulness: faithfulness_result.score,
                claims_supported: format!("{}/{}", faithfulness_result.supported_claims, faithfulness_result.total_claims),
            },
            unsupported_claims: unsupported,
            inputs: ExplainabilityInputs {
                original_query: query.to_string(),
                has_multimodal: multimodal_context.is_some_and(|m| !m.trim().is_empty()),
                chunks_retrieved: retrieved.len(),
            },
            safety_notice: self.safety_notice(&prompt_analysis.domain, &answer, confidence),
            rejection_reason: None,
        };

        Ok(ChatResponse { answer: attributed.answer_with_citations, confidence, in_domain: true, explainability })
    }

    fn compute_confidence(&self, norm_sim: f64, norm_rerank: f64, faithfulness_score: f64) -> f64 {
        let w = &self.config.confidence;
        let raw = w.similarity * norm_sim + w.rerank * norm_rerank + w.faithfulness * faithfulness_score + w.base_floor;

        let adjusted = if norm_sim > w.high_similarity_threshold && faithfulness_score > w.high_faithfulness_threshold {
            raw.max(w.high_confidence_floor)
        } else if norm_sim < w.low_similarity_threshold {
            raw.min(w.low_confidence_cap)
        } else {
            raw
        };

        let clamped = adjusted.clamp(w.min_confidence, w.max_confidence);
        (clamped * 100.0).round() / 100.0
    }

    fn rejection_response(&self, query: &str, multimodal_context: Option<&str>, domain_score: f32) -> ChatResponse {
        let explainability = Explainability {
            why_this_answer: WhyThisAnswer {
                summary: "Query judged out-of-domain for this agent; no retrieval was attempted.".to_string(),
                sources: Vec::new(),
            },
            confidence_breakdown: ConfidenceBreakdown {
                overall: 0.1,
                domain_relevance: f64::from(domain_score),
                retrieval_quality: 0.0,
                rerank_score: 0.0,
                faithfulness: 0.0,
                claims_supported: "0/0".to_string(),
            },
            unsupported_claims: Vec::new(),
            inputs: ExplainabilityInputs {
                original_query: query.to_string(),
                has_multimodal: multimodal_context.is_some_and(|m| !m.trim().is_empty()),
                chunks_retrieved: 0,
            },
            safety_notice: None,
            rejection_reason: Some("out_of_domain".to_string()),
        };
        ChatResponse { answer: OUT_OF_DOMAIN_ANSWER.to_string(), confidence: 0.1, in_domain: false, explainability }
    }

    fn empty_result_response(&self, query: &str, multimodal_context: Option<&str>, domain_score: f32) -> ChatResponse {
        let explainability = Explainability {
            why_this_answer: WhyThisAnswer {
                summary: "Query was in-domain but retrieval found no supporting chunks.".to_string(),
                sources: Vec::new(),
            },
            confidence_breakdown: ConfidenceBreakdown {
                overall: 0.2,
                domain_relevance: f64::from(domain_score),
                retrieval_quality: 0.0,
                rerank_score: 0.0,
                faithfulness: 0.0,
                claims_supported: "0/0".to_string(),
            },
            unsupported_claims: Vec::new(),
            inputs: ExplainabilityInputs {
                original_query: query.to_string(),
                has_multimodal: multimodal_context.is_some_and(|m| !m.trim().is_empty()),
                chunks_retrieved: 0,
            },
            safety_notice: None,
            rejection_reason: None,
        };
        ChatResponse { answer: NO_RESULTS_ANSWER.to_string(), confidence: 0.2, in_domain: true, explainability }
    }

    /// Health-domain safety overlay, ported from `safety_rules.py`: flags
    /// red-flag emergency language in the answer, or attaches a
    /// low-confidence disclaimer, for agents in a health-adjacent domain.
    fn safety_notice(&self, domain: &str, answer: &str, confidence: f64) -> Option<String> {
        if !HEALTH_ADJACENT_DOMAINS.contains(&domain.to_lowercase().as_str()) {
            return None;
        }

        let answer_lower = answer.to_lowercase();
        if RED_FLAGS.iter().any(|flag| answer_lower.contains(flag)) {
            warn!("red-flag language detected in a health-domain answer");
            return Some("Emergency symptoms detected. Seek immediate medical care.".to_string());
        }

        if confidence < SAFETY_LOW_CONFIDENCE_THRESHOLD {
            return Some("Low confidence. This is not a medical diagnosis.".to_string());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DEFAULT_DIMENSIONS, FallbackEmbedder};
    use crate::error::Error as EngineError;
    use crate::llm::{ChatRequest, ModelKind, Role};
    use crate::model::{Agent, DocumentChunk, PromptAnalysis};
    use crate::reranker::DegradedReranker;
    use crate::store::SqliteStore;

    struct FakeLlm;
    impl LlmProvider for FakeLlm {
        fn name(&self) -> &'static str {
            "fake"
        }
        fn resolve_model(&self, _kind: ModelKind) -> &str {
            "fake-model"
        }
        fn chat(&self, request: &ChatRequest) -> Result<String> {
            let user_message =
                request.messages.iter().find(|m| m.role == Role::User).map(|m| m.content.as_str()).unwrap_or("");

            if request.json_mode {
                Ok(r#"["Caesar salad uses romaine lettuce."]"#.to_string())
            } else if user_message.starts_with("Is this claim supported") {
                Ok("YES".to_string())
            } else {
                Ok("Caesar salad uses romaine lettuce as its base.".to_string())
            }
        }
    }

    fn cooking_analysis() -> PromptAnalysis {
        PromptAnalysis {
            domain: "cooking".to_string(),
            domain_keywords: vec!["cooking".to_string(), "salad".to_string(), "recipe".to_string()],
            ..Default::default()
        }
    }

    fn setup() -> (SqliteStore, FallbackEmbedder, i64) {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);

        let mut agent = Agent::new("tenant-1", "chef", "You are a cooking assistant.");
        agent.status = AgentStatus::Ready;
        agent.domain = "cooking".to_string();
        agent.domain_keywords = cooking_analysis().domain_keywords;
        agent.prompt_analysis = Some(cooking_analysis());
        agent.chunk_count = 1;
        let agent_id = store.create_agent(&agent).unwrap();

        let content = "Caesar salad is made with romaine lettuce, parmesan, and croutons.";
        let embedding = embedder.embed(content).unwrap();
        store
            .add_chunks(&[DocumentChunk::new(agent_id, content.to_string(), "recipes.csv".to_string(), embedding, embedder.model_id(), 0)])
            .unwrap();

        (store, embedder, agent_id)
    }

    #[test]
    fn test_reason_happy_path_returns_cited_answer() {
        let (store, embedder, _agent_id) = setup();
        let llm = FakeLlm;
        let reranker = DegradedReranker::new();
        let config = EngineConfig::default();
        let cache = AgentCache::new();
        let orchestrator = ReasoningOrchestrator { store: &store, embedder: &embedder, llm: &llm, reranker: &reranker, config: &config, cache: &cache };

        let response = orchestrator.reason("tenant-1", "chef", "What's in a Caesar salad?", None).unwrap();
        assert!(response.in_domain);
        assert!(response.confidence > 0.0);
        assert!(response.explainability.rejection_reason.is_none());
    }

    #[test]
    fn test_reason_rejects_out_of_domain_query() {
        let (store, embedder, _agent_id) = setup();
        let llm = FakeLlm;
        let reranker = DegradedReranker::new();
        let config = EngineConfig::default();
        let cache = AgentCache::new();
        let orchestrator = ReasoningOrchestrator { store: &store, embedder: &embedder, llm: &llm, reranker: &reranker, config: &config, cache: &cache };

        let response = orchestrator.reason("tenant-1", "chef", "How do I configure a BGP router?", None).unwrap();
        assert!(!response.in_domain);
        assert!((response.confidence - 0.1).abs() < 1e-9);
        assert_eq!(response.explainability.rejection_reason.as_deref(), Some("out_of_domain"));
    }

    #[test]
    fn test_reason_errors_on_missing_agent() {
        let (store, embedder, _agent_id) = setup();
        let llm = FakeLlm;
        let reranker = DegradedReranker::new();
        let config = EngineConfig::default();
        let cache = AgentCache::new();
        let orchestrator = ReasoningOrchestrator { store: &store, embedder: &embedder, llm: &llm, reranker: &reranker, config: &config, cache: &cache };

        let err = orchestrator.reason("tenant-1", "nonexistent", "hello", None).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_reason_errors_on_not_ready_agent() {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        store.create_agent(&Agent::new("tenant-1", "draft", "You are a draft agent.")).unwrap();

        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let llm = FakeLlm;
        let reranker = DegradedReranker::new();
        let config = EngineConfig::default();
        let cache = AgentCache::new();
        let orchestrator = ReasoningOrchestrator { store: &store, embedder: &embedder, llm: &llm, reranker: &reranker, config: &config, cache: &cache };

        let err = orchestrator.reason("tenant-1", "draft", "hello", None).unwrap_err();
        assert!(matches!(err, EngineError::NotReady { .. }));
    }

    #[test]
    fn test_agent_cache_hits_without_reloading() {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let mut agent = Agent::new("tenant-1", "chef", "sys");
        agent.status = AgentStatus::Ready;
        store.create_agent(&agent).unwrap();

        let cache = AgentCache::new();
        let first = cache.get_or_load(&store, "tenant-1", "chef").unwrap();
        store.delete_agent(first.id.unwrap()).unwrap();

        // Cache hit: still resolvable even though the store record is gone.
        let second = cache.get_or_load(&store, "tenant-1", "chef").unwrap();
        assert_eq!(second.name, "chef");

        cache.invalidate("tenant-1", "chef");
        assert!(cache.get_or_load(&store, "tenant-1", "chef").is_err());
    }

    #[test]
    fn test_safety_notice_flags_red_flag_language() {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let llm = FakeLlm;
        let reranker = DegradedReranker::new();
        let config = EngineConfig::default();
        let cache = AgentCache::new();
        let orchestrator = ReasoningOrchestrator { store: &store, embedder: &embedder, llm: &llm, reranker: &reranker, config: &config, cache: &cache };

        let notice = orchestrator.safety_notice("medical", "You may be having chest pain, call for help.", 0.9);
        assert!(notice.is_some());
    }

    #[test]
    fn test_safety_notice_absent_for_non_health_domain() {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let llm = FakeLlm;
        let reranker = DegradedReranker::new();
        let config = EngineConfig::default();
        let cache = AgentCache::new();
        let orchestrator = ReasoningOrchestrator { store: &store, embedder: &embedder, llm: &llm, reranker: &reranker, config: &config, cache: &cache };

        assert!(orchestrator.safety_notice("cooking", "chest pain is not on the menu", 0.9).is_none());
    }
}
