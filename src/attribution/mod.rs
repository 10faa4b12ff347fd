//! Source attributor (C9): assigns per-sentence citations linking an
//! answer to its supporting chunks.
//!
//! Sentences are split on `. ! ?` followed by whitespace; each sentence of
//! at least 4 words is embedded and matched to its highest-cosine-similarity
//! chunk; citation numbers are dense, in first-appearance order
//! (SPEC_FULL.md §4.9).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::embedding::{Embedder, cosine_similarity};
use crate::error::Result;
use crate::model::{AttributedAnswer, AttributedSource};

/// Minimum word count for a sentence to be eligible for citation.
const MIN_SENTENCE_WORDS: usize = 4;

/// Characters kept in an [`AttributedSource::preview`].
const PREVIEW_CHARS: usize = 150;

static EXISTING_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \[\d+\]").expect("citation marker pattern is valid"));

/// One chunk available as an attribution target. `embedding` is reused
/// as-is (already computed at compile time) rather than recomputed.
#[derive(Debug, Clone)]
pub struct AttributionChunk {
    /// Chunk ID.
    pub chunk_id: i64,
    /// Human-readable origin, e.g. `"recipes.csv, Entry 3"`.
    pub source: String,
    /// Full chunk content.
    pub content: String,
    /// Chunk's stored dense embedding.
    pub embedding: Vec<f32>,
}

struct Sentence<'a> {
    text: &'a str,
    trailing_ws: &'a str,
}

/// Splits `text` into sentences on `. ! ?` followed by whitespace (or end
/// of string), preserving exact original whitespace for lossless
/// reconstruction.
fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let char_indices: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut sentence_start = 0usize;
    let mut i = 0usize;

    while i < char_indices.len() {
        let (idx, c) = char_indices[i];
        if matches!(c, '.' | '!' | '?') {
            let is_boundary = char_indices.get(i + 1).is_none_or(|&(_, nc)| nc.is_whitespace());
            if is_boundary {
                let sentence_end = idx + c.len_utf8();
                let mut j = i + 1;
                while let Some(&(_, nc)) = char_indices.get(j) {
                    if nc.is_whitespace() {
                        j += 1;
                    } else {
                        break;
                    }
                }
                let ws_end = char_indices.get(j).map_or(text.len(), |&(bidx, _)| bidx);
                sentences.push(Sentence {
                    text: &text[sentence_start..sentence_end],
                    trailing_ws: &text[sentence_end..ws_end],
                });
                sentence_start = ws_end;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    if sentence_start < text.len() {
        sentences.push(Sentence { text: &text[sentence_start..], trailing_ws: "" });
    }

    sentences
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => content[..idx].to_string(),
        None => content.to_string(),
    }
}

/// Attributes each substantive sentence of `answer` to its best-matching
/// chunk, inserting dense `[N]` citation markers.
///
/// Stripping any pre-existing `[N]` markers before re-splitting makes this
/// idempotent: attributing an already-cited answer reproduces the same
/// result (SPEC_FULL.md §8).
///
/// # Errors
///
/// Returns an error if embedding a sentence fails.
pub fn attribute(embedder: &dyn Embedder, answer: &str, chunks: &[AttributionChunk]) -> Result<AttributedAnswer> {
    let normalized = EXISTING_CITATION.replace_all(answer, "");
    let sentences = split_sentences(&normalized);

    let mut citation_for_chunk: HashMap<i64, usize> = HashMap::new();
    let mut sources: Vec<AttributedSource> = Vec::new();
    let mut output = String::new();

    for sentence in &sentences {
        output.push_str(sentence.text);

        let word_count = sentence.text.split_whitespace().count();
        if word_count >= MIN_SENTENCE_WORDS && !chunks.is_empty() {
            let sentence_embedding = embedder.embed(sentence.text)?;
            let best = chunks
                .iter()
                .map(|chunk| (chunk, cosine_similarity(&sentence_embedding, &chunk.embedding)))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            if let Some((chunk, similarity)) = best {
                let citation = *citation_for_chunk.entry(chunk.chunk_id).or_insert_with(|| {
                    let number = sources.len() + 1;
                    sources.push(AttributedSource {
                        citation: number,
                        chunk_id: chunk.chunk_id,
                        source: chunk.source.clone(),
                        preview: preview(&chunk.content),
                        similarity,
                    });
                    number
                });
                output.push_str(&format!(" [{citation}]"));
            }
        }

        output.push_str(sentence.trailing_ws);
    }

    Ok(AttributedAnswer { answer_with_citations: output, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DEFAULT_DIMENSIONS, FallbackEmbedder};

    fn chunk(id: i64, source: &str, content: &str, embedder: &dyn Embedder) -> AttributionChunk {
        AttributionChunk {
            chunk_id: id,
            source: source.to_string(),
            content: content.to_string(),
            embedding: embedder.embed(content).unwrap(),
        }
    }

    #[test]
    fn test_sentence_attribution_scenario() {
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let chunks = vec![
            chunk(7, "recipes.csv, Entry 1", "Romaine lettuce is the base of Caesar salad.", &embedder),
            chunk(12, "recipes.csv, Entry 2", "Croutons are made from toasted bread cubes.", &embedder),
        ];

        let answer = "Romaine is the base. Parmesan adds saltiness. Croutons give crunch.";
        let result = attribute(&embedder, answer, &chunks).unwrap();

        assert!(result.answer_with_citations.contains('['));
        assert!(!result.sources.is_empty());
        let citation_numbers: Vec<usize> = result.sources.iter().map(|s| s.citation).collect();
        assert_eq!(citation_numbers, (1..=result.sources.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_short_sentences_are_not_cited() {
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let chunks = vec![chunk(1, "s", "some long chunk of supporting content here", &embedder)];
        let result = attribute(&embedder, "Yes. No way.", &chunks).unwrap();
        assert!(result.sources.is_empty());
        assert_eq!(result.answer_with_citations, "Yes. No way.");
    }

    #[test]
    fn test_attribution_is_idempotent() {
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let chunks = vec![chunk(1, "s", "romaine lettuce croutons parmesan cheese salad", &embedder)];
        let answer = "Romaine lettuce is crisp and fresh in this salad.";

        let once = attribute(&embedder, answer, &chunks).unwrap();
        let twice = attribute(&embedder, &once.answer_with_citations, &chunks).unwrap();

        assert_eq!(once.answer_with_citations, twice.answer_with_citations);
        assert_eq!(once.sources.len(), twice.sources.len());
    }

    #[test]
    fn test_same_chunk_reused_gets_same_citation_number() {
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let chunks = vec![chunk(42, "s", "romaine lettuce croutons parmesan cheese dressing bowl", &embedder)];
        let answer = "This salad uses fresh romaine lettuce leaves. The same romaine lettuce is also crisp.";
        let result = attribute(&embedder, answer, &chunks).unwrap();
        assert_eq!(result.sources.len(), 1);
    }

    #[test]
    fn test_no_chunks_yields_no_citations() {
        let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
        let result = attribute(&embedder, "This is a perfectly normal sentence.", &[]).unwrap();
        assert!(result.sources.is_empty());
    }
}
