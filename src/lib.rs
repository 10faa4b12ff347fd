//! # Mexar Engine
//!
//! Multi-tenant knowledge lifecycle engine: compiles a system prompt plus a
//! batch of source documents into a per-agent searchable knowledge base,
//! then answers queries against it with cited, confidence-scored responses.
//!
//! ## Pipelines
//!
//! - **Compilation** ([`compilation`]): parse ([`parsing`]) → analyze
//!   ([`analysis`]) → chunk ([`chunking`]) → embed ([`embedding`]) → index
//!   ([`store`]), orchestrated by [`compilation::CompilationOrchestrator`]
//!   under a single-writer-per-agent lease from [`jobs::JobRegistry`].
//! - **Reasoning** ([`reasoning`]): guardrail ([`guardrail`]) → hybrid
//!   retrieval ([`retrieval`]) → rerank ([`reranker`]) → synthesize
//!   ([`synthesis`]) → attribute ([`attribution`]) → score faithfulness
//!   ([`faithfulness`]) and confidence, orchestrated by
//!   [`reasoning::ReasoningOrchestrator`].
//! - **Agents** ([`registry`]): tenant-scoped CRUD over agent records,
//!   keeping [`reasoning::AgentCache`] coherent on writes.
//!
//! ## Ambient stack
//!
//! - **`SQLite` storage** ([`store`]): pooled via `r2d2`, schema versioned.
//! - **Config** ([`config`]): layered env/TOML via `figment`.
//! - **Errors** ([`error`]): a single `thiserror`-derived [`Error`] with a
//!   stable `.code()` per variant.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod analysis;
pub mod attribution;
pub mod chunking;
pub mod cli;
pub mod compilation;
pub mod config;
pub mod embedding;
pub mod error;
pub mod faithfulness;
pub mod guardrail;
pub mod jobs;
pub mod llm;
pub mod model;
pub mod parsing;
pub mod reasoning;
pub mod registry;
pub mod reranker;
pub mod retrieval;
pub mod search;
pub mod store;
pub mod synthesis;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain model types
pub use model::{
    Agent, AgentStatus, AttributedAnswer, AttributedSource, ChunkDraft, CompilationJob,
    ConfidenceBreakdown, DocumentChunk, Explainability, FaithfulnessResult, JobStatus,
    PromptAnalysis, ProgressEvent, normalize_agent_name,
};

// Re-export the store abstraction
pub use store::{DEFAULT_DB_PATH, SqliteStore, Store, StoreStats};

// Re-export chunking types
pub use chunking::ParagraphChunker;

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};

// Re-export embedding types
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use embedding::{DEFAULT_DIMENSIONS, Embedder, FallbackEmbedder, cosine_similarity, create_embedder};

// Re-export LLM provider types
pub use llm::{ChatMessage, ChatRequest, LlmProvider, ModelKind, Role, StubProvider, create_llm_provider};

// Re-export hybrid retrieval and fusion primitives
pub use retrieval::{DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_K};
pub use search::{RrfConfig, reciprocal_rank_fusion, weighted_rrf};

// Re-export the compilation and reasoning orchestrators
pub use compilation::{CompilationOrchestrator, SourceFile};
pub use jobs::{JobLease, JobRegistry};
pub use reasoning::{AgentCache, ChatResponse, ReasoningOrchestrator};
pub use registry::AgentRegistry;
