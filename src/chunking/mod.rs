//! Chunking strategies for the knowledge lifecycle engine.
//!
//! Splits parsed document text into retrievable units. Paragraph boundaries
//! are the chunking unit: they keep a chunk's citation granular enough to
//! attribute an answer to without fragmenting sentences mid-thought.

pub mod paragraph;

pub use paragraph::ParagraphChunker;
