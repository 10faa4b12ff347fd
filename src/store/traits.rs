//! Persistence trait for the knowledge engine's domain model.
//!
//! Mirrors the teacher's `Storage` trait shape (init/reset + per-entity CRUD
//! grouped by comment banner) but targets agents, document chunks, and
//! compilation jobs instead of buffers/chunks/context.

use crate::error::Result;
use crate::model::{Agent, CompilationJob, DocumentChunk, JobStatus};
use serde::Serialize;

/// Trait for persistent storage backends for the knowledge engine.
///
/// Implementations must be `Send + Sync + Clone` since compilation and
/// reasoning run across pooled connections shared by concurrent tasks.
pub trait Store: Send + Sync {
    /// Initializes storage (creates schema, runs migrations). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation or migration fails.
    fn init(&self) -> Result<()>;

    // ==================== Agent Operations ====================

    /// Creates an agent, returning its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::ConflictingCompilation`]-adjacent
    /// uniqueness violations as [`crate::error::StorageError`], or any
    /// other database error.
    fn create_agent(&self, agent: &Agent) -> Result<i64>;

    /// Retrieves an agent by tenant-scoped name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_agent_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<Agent>>;

    /// Retrieves an agent by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_agent(&self, id: i64) -> Result<Option<Agent>>;

    /// Lists all agents for a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_agents(&self, tenant_id: &str) -> Result<Vec<Agent>>;

    /// Updates an existing agent in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent does not exist or the update fails.
    fn update_agent(&self, agent: &Agent) -> Result<()>;

    /// Deletes an agent and its chunks/jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn delete_agent(&self, id: i64) -> Result<()>;

    // ==================== Document Chunk Operations ====================

    /// Inserts chunks for an agent in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if insertion fails.
    fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<()>;

    /// Retrieves all chunks for an agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_chunks(&self, agent_id: i64) -> Result<Vec<DocumentChunk>>;

    /// Retrieves a single chunk by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_chunk(&self, id: i64) -> Result<Option<DocumentChunk>>;

    /// Atomically replaces all of an agent's chunks with `chunks` in a
    /// single transaction (used before recompilation), so a failed insert
    /// never leaves an agent with its old index deleted and no new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    fn replace_chunks(&self, agent_id: i64, chunks: &[DocumentChunk]) -> Result<()>;

    /// Full-text search (BM25) over an agent's chunks.
    ///
    /// Returns chunk IDs with scores, higher is better.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    fn search_fts(&self, agent_id: i64, query: &str, limit: usize) -> Result<Vec<(i64, f64)>>;

    /// Returns `(chunk_id, embedding, embedding_model)` for every chunk of
    /// an agent, for in-process cosine similarity search.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_all_embeddings(&self, agent_id: i64) -> Result<Vec<(i64, Vec<f32>, String)>>;

    // ==================== Compilation Job Operations ====================

    /// Creates a compilation job, returning its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns an error if insertion fails.
    fn create_job(&self, job: &CompilationJob) -> Result<i64>;

    /// Retrieves a job by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_job(&self, id: i64) -> Result<Option<CompilationJob>>;

    /// Retrieves the most recent job for an agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_latest_job(&self, agent_id: i64) -> Result<Option<CompilationJob>>;

    /// Updates a job's progress/step, or marks it terminal with a status
    /// and optional error message.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    fn update_job_progress(
        &self,
        job_id: i64,
        progress: u8,
        current_step: &str,
        status: Option<JobStatus>,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Finds jobs stuck `in_progress` past `stuck_after_minutes`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn find_stuck_jobs(&self, stuck_after_minutes: u64) -> Result<Vec<CompilationJob>>;

    /// Storage statistics, used by diagnostics/health endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    fn stats(&self) -> Result<StoreStats>;
}

/// Aggregate storage statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Number of agents stored.
    pub agent_count: usize,
    /// Total chunks across all agents.
    pub chunk_count: usize,
    /// Number of jobs currently `in_progress`.
    pub active_job_count: usize,
    /// Schema version.
    pub schema_version: u32,
}
