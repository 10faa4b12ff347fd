//! `AttributedAnswer`: an answer with per-sentence source citations (C9).

use serde::{Deserialize, Serialize};

/// One cited source backing a sentence of an [`AttributedAnswer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributedSource {
    /// Dense citation number as it appears in `[N]` markers, 1-indexed.
    pub citation: usize,
    /// Chunk this citation points to.
    pub chunk_id: i64,
    /// Human-readable origin of the chunk.
    pub source: String,
    /// First 150 characters of the chunk content.
    pub preview: String,
    /// Cosine similarity between the cited sentence and the chunk.
    pub similarity: f32,
}

/// An answer with `[N]`-style citations inserted, plus the ordered list of
/// sources those citations refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributedAnswer {
    /// The answer text with citation markers inserted after attributed
    /// sentences.
    pub answer_with_citations: String,
    /// Sources ordered by citation number, 1..K with no gaps.
    pub sources: Vec<AttributedSource>,
}
