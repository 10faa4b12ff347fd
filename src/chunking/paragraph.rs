//! Paragraph-accumulating chunker (C2).
//!
//! Splits unstructured text on blank lines, then greedily accumulates
//! paragraphs into a chunk until `target_tokens` (whitespace-delimited
//! words) is exceeded, emits the chunk, and seeds the next chunk with the
//! last paragraph of the one just emitted so consecutive chunks overlap by
//! one paragraph. Grounded in `semantic_chunker.py` from the original
//! implementation (see SPEC_FULL.md §4.2); structured sources (CSV/JSON
//! entries) instead get one chunk per entry via
//! [`ParagraphChunker::chunk_structured`].

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::model::ChunkDraft;
use crate::parsing::Entry;

/// Chunks free text and structured entries into [`ChunkDraft`]s.
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    /// Target word count before a chunk is emitted.
    target_tokens: usize,
}

impl ParagraphChunker {
    /// Creates a chunker targeting `target_tokens` words per chunk.
    #[must_use]
    pub const fn new(target_tokens: usize) -> Self {
        Self { target_tokens }
    }

    /// Splits `text` into paragraph-accumulated chunks.
    ///
    /// Each emitted chunk (after the first) begins with the last paragraph
    /// of the previous chunk, so retrieval at a chunk boundary still has
    /// the preceding paragraph's context.
    #[must_use]
    pub fn chunk_text(&self, text: &str, source: &str) -> Vec<ChunkDraft> {
        let paragraph_re = Regex::new(r"\n\s*\n").expect("static regex is valid");
        let paragraphs: Vec<&str> = paragraph_re
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if paragraphs.is_empty() {
            return Vec::new();
        }

        let mut drafts = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_words = 0usize;
        let mut chunk_index = 0usize;

        for paragraph in &paragraphs {
            let words = paragraph.unicode_words().count();
            current.push(paragraph);
            current_words += words;

            if current_words >= self.target_tokens {
                drafts.push(ChunkDraft::new(current.join("\n\n"), source.to_string(), chunk_index));
                chunk_index += 1;

                let overlap = *current.last().expect("current is non-empty here");
                current = vec![overlap];
                current_words = overlap.unicode_words().count();
            }
        }

        // Flush the remainder, unless it's only the carried-over overlap
        // paragraph that was already emitted as the tail of the prior chunk.
        let is_pure_overlap_tail = current.len() == 1 && chunk_index > 0 && drafts.last().is_some_and(|last| last.content.ends_with(current[0]));
        if !current.is_empty() && !is_pure_overlap_tail {
            drafts.push(ChunkDraft::new(current.join("\n\n"), source.to_string(), chunk_index));
        }

        drafts
    }

    /// Renders each structured entry as one chunk, formatted
    /// `Entry {n} from {source}:\n  {Key}: {value}` per field.
    #[must_use]
    pub fn chunk_structured(&self, entries: &[Entry], source: &str) -> Vec<ChunkDraft> {
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut lines = vec![format!("Entry {} from {source}:", i + 1)];
                for (key, value) in entry {
                    lines.push(format!("  {}: {value}", humanize_key(key)));
                }
                ChunkDraft::new(lines.join("\n"), format!("{source}, Entry {}", i + 1), i)
            })
            .collect()
    }
}

/// Turns a `snake_case` or `kebab-case` field name into `Title Case`.
fn humanize_key(key: &str) -> String {
    key.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_short_paragraph_yields_one_chunk() {
        let chunker = ParagraphChunker::new(400);
        let drafts = chunker.chunk_text("Just one short paragraph.", "doc.txt");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].chunk_index, 0);
    }

    #[test]
    fn test_long_text_splits_with_overlap() {
        let chunker = ParagraphChunker::new(10);
        let long_paragraph = "word ".repeat(12);
        let text = format!("{long_paragraph}\n\nshort tail.");
        let drafts = chunker.chunk_text(&text, "doc.txt");
        assert!(drafts.len() >= 2);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = ParagraphChunker::new(400);
        assert!(chunker.chunk_text("   \n\n  ", "doc.txt").is_empty());
    }

    #[test]
    fn test_chunk_structured_formats_entries() {
        let chunker = ParagraphChunker::new(400);
        let mut entry = Entry::new();
        entry.insert("dish_name".to_string(), "Caesar Salad".to_string());
        let drafts = chunker.chunk_structured(&[entry], "recipes.csv");
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].content.contains("Entry 1 from recipes.csv"));
        assert!(drafts[0].content.contains("Dish Name: Caesar Salad"));
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("dish_name"), "Dish Name");
        assert_eq!(humanize_key("cook-time"), "Cook Time");
    }
}
