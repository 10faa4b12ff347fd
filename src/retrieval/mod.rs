//! Chunk index (C4): agent-scoped hybrid retrieval over dense embeddings
//! and FTS5 BM25, fused with Reciprocal Rank Fusion.
//!
//! Grounded in the teacher's `search` module for the overall shape
//! (semantic + BM25 + RRF) and its already model-agnostic
//! [`crate::search::reciprocal_rank_fusion`], generalized here to be
//! scoped per agent and to filter out chunks embedded under a different
//! provider than the one doing the querying (see SPEC_FULL.md §9).

use std::collections::HashMap;

use crate::embedding::{Embedder, cosine_similarity};
use crate::error::Result;
use crate::search::{RrfConfig, reciprocal_rank_fusion};
use crate::store::Store;

/// Default similarity threshold for dense retrieval.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;

/// Default number of results to return.
pub const DEFAULT_TOP_K: usize = 10;

/// One retrieved chunk and its fused relevance score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// Chunk ID, for looking up full content via [`Store::get_chunk`].
    pub chunk_id: i64,
    /// Combined RRF score (higher is better), or the single-mode score when
    /// only one of dense/sparse retrieval ran.
    pub score: f64,
    /// Dense cosine similarity, when dense retrieval contributed.
    pub similarity: Option<f32>,
    /// BM25 score, when sparse retrieval contributed.
    pub bm25_score: Option<f64>,
}

/// Tunables for one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Maximum number of fused results to return.
    pub top_k: usize,
    /// Minimum cosine similarity for a dense candidate to be considered.
    pub similarity_threshold: f32,
    /// RRF `k` parameter.
    pub rrf_k: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            rrf_k: 60,
        }
    }
}

/// Performs hybrid search for `agent_id`, combining dense and sparse
/// retrieval with RRF.
///
/// Dense candidates embedded under a model other than `embedder.model_id()`
/// are dropped before ranking, rather than cosine-compared against a query
/// embedding from a different model (embedding drift).
///
/// # Errors
///
/// Returns an error if the store or embedder call fails.
pub fn hybrid_search(
    store: &dyn Store,
    embedder: &dyn Embedder,
    agent_id: i64,
    query: &str,
    config: &RetrievalConfig,
) -> Result<Vec<RetrievedChunk>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let dense = dense_search(store, embedder, agent_id, query, config)?;
    let sparse = store.search_fts(agent_id, query, config.top_k * 2)?;

    if dense.is_empty() && sparse.is_empty() {
        return Ok(Vec::new());
    }

    let rrf_config = RrfConfig::new(config.rrf_k);
    let dense_ranked: Vec<i64> = dense.iter().map(|(id, _)| *id).collect();
    let sparse_ranked: Vec<i64> = sparse.iter().map(|(id, _)| *id).collect();

    let fused = reciprocal_rank_fusion(&[&dense_ranked, &sparse_ranked], &rrf_config);

    let dense_map: HashMap<i64, f32> = dense.into_iter().collect();
    let sparse_map: HashMap<i64, f64> = sparse.into_iter().collect();

    Ok(fused
        .into_iter()
        .take(config.top_k)
        .map(|(chunk_id, score)| RetrievedChunk {
            chunk_id,
            score,
            similarity: dense_map.get(&chunk_id).copied(),
            bm25_score: sparse_map.get(&chunk_id).copied(),
        })
        .collect())
}

fn dense_search(
    store: &dyn Store,
    embedder: &dyn Embedder,
    agent_id: i64,
    query: &str,
    config: &RetrievalConfig,
) -> Result<Vec<(i64, f32)>> {
    let query_embedding = embedder.embed(query)?;
    let current_model = embedder.model_id();

    let mut similarities: Vec<(i64, f32)> = store
        .get_all_embeddings(agent_id)?
        .into_iter()
        .filter(|(_, _, model)| model == current_model)
        .map(|(id, embedding, _)| (id, cosine_similarity(&query_embedding, &embedding)))
        .filter(|(_, sim)| *sim >= config.similarity_threshold)
        .collect();

    similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    similarities.truncate(config.top_k * 2);
    Ok(similarities)
}
