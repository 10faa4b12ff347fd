//! Core data model shared by every component of the knowledge engine.
//!
//! These types are intentionally persistence-agnostic: they carry no
//! `rusqlite` or `serde_rusqlite` details, only the shape the spec defines.
//! The storage layer (see [`crate::store`]) is responsible for mapping
//! them to and from rows.

mod agent;
mod answer;
mod analysis;
mod chunk;
mod explainability;
mod faithfulness;
mod job;

pub use agent::{Agent, AgentStatus, normalize_agent_name};
pub use analysis::PromptAnalysis;
pub use answer::{AttributedAnswer, AttributedSource};
pub use chunk::{ChunkDraft, DocumentChunk};
pub use explainability::{ConfidenceBreakdown, Explainability, ExplainabilityInputs, SourceSummary, WhyThisAnswer};
pub use faithfulness::FaithfulnessResult;
pub use job::{CompilationJob, JobStatus, ProgressEvent};
