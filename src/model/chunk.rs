//! `DocumentChunk`: the retrievable unit produced by compilation.

use serde::{Deserialize, Serialize};

/// A retrievable slice of a compiled document, carrying both its dense
/// embedding and the identity of the model that produced it.
///
/// Stamping `embedding_model` on every chunk resolves the embedding-drift
/// ambiguity: the chunk index never cosine-compares a chunk embedded under
/// one provider against a query embedded under another (see SPEC_FULL.md
/// §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Surrogate key (assigned by storage).
    pub id: Option<i64>,
    /// Owning agent.
    pub agent_id: i64,
    /// Chunk text content, never empty after trimming.
    pub content: String,
    /// Human-readable origin, e.g. `"recipes.csv, Entry 12"`.
    pub source: String,
    /// Dense embedding vector.
    pub embedding: Vec<f32>,
    /// Identity of the embedding provider/model that produced `embedding`.
    pub embedding_model: String,
    /// Order of this chunk within its source.
    pub chunk_index: usize,
}

/// A chunk before embedding: produced by the chunker (C2), consumed by the
/// embedding provider (C3) to become a [`DocumentChunk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    /// Chunk text content.
    pub content: String,
    /// Human-readable origin.
    pub source: String,
    /// Order of this chunk within its source.
    pub chunk_index: usize,
}

impl ChunkDraft {
    /// Creates a new draft chunk.
    #[must_use]
    pub const fn new(content: String, source: String, chunk_index: usize) -> Self {
        Self {
            content,
            source,
            chunk_index,
        }
    }
}

impl DocumentChunk {
    /// Creates a new chunk, not yet persisted.
    #[must_use]
    pub fn new(
        agent_id: i64,
        content: String,
        source: String,
        embedding: Vec<f32>,
        embedding_model: impl Into<String>,
        chunk_index: usize,
    ) -> Self {
        Self {
            id: None,
            agent_id,
            content,
            source,
            embedding,
            embedding_model: embedding_model.into(),
            chunk_index,
        }
    }

    /// Returns the first `max_len` bytes of content at a valid char
    /// boundary, used for `AttributedSource::preview`.
    #[must_use]
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            return &self.content;
        }
        let mut boundary = max_len;
        while !self.content.is_char_boundary(boundary) && boundary > 0 {
            boundary -= 1;
        }
        &self.content[..boundary]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_at_char_boundary() {
        let chunk = DocumentChunk::new(1, "héllo world".to_string(), "s".to_string(), vec![], "m", 0);
        // byte 1 falls mid-codepoint for 'é' (2 bytes); should back off to a boundary.
        let preview = chunk.preview(2);
        assert!(preview.len() <= 2);
    }

    #[test]
    fn test_preview_short_content() {
        let chunk = DocumentChunk::new(1, "hi".to_string(), "s".to_string(), vec![], "m", 0);
        assert_eq!(chunk.preview(150), "hi");
    }
}
