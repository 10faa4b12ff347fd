//! `SQLite` storage implementation, backed by an `r2d2` connection pool.
//!
//! The teacher crate held a single `rusqlite::Connection` behind an
//! `unsafe impl Send + Sync` justified by single-threaded CLI usage. This
//! platform serves concurrent tenants, so every connection is pooled via
//! `r2d2`/`r2d2_sqlite` instead: each call checks out a connection, does its
//! work, and returns it, with no unsafe code (see SPEC_FULL.md §5).

// SQLite stores all integers as i64; these casts are intentional and
// bounded by the non-negative, in-range values we store.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

use crate::error::{Result, StorageError};
use crate::model::{Agent, AgentStatus, CompilationJob, DocumentChunk, JobStatus, PromptAnalysis};
use crate::store::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};
use crate::store::traits::{Store, StoreStats};

/// Pooled `SQLite`-backed implementation of [`Store`].
///
/// Cheap to clone: cloning shares the underlying pool (an `Arc` internally),
/// so callers pass this around by value across async tasks.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Opens or creates a `SQLite` database at `path`, with a pool sized
    /// `pool_size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built or the parent directory
    /// cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Database(e.to_string()))?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        });
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Opens an in-memory database. Useful for tests; the pool is capped at
    /// one connection since `SQLite`'s `:memory:` databases aren't shared
    /// across connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built.
    pub fn in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| StorageError::Database(e.to_string()).into())
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let conn = self.conn()?;
        let version: Option<String> = conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;
        Ok(version.and_then(|v| v.parse().ok()))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn row_to_agent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
        let status_str: String = row.get(4)?;
        let keywords_json: String = row.get(6)?;
        let analysis_json: Option<String> = row.get(7)?;

        Ok(Agent {
            id: Some(row.get(0)?),
            tenant_id: row.get(1)?,
            name: row.get(2)?,
            system_prompt: row.get(3)?,
            status: AgentStatus::parse(&status_str).unwrap_or(AgentStatus::Failed),
            domain: row.get(5)?,
            domain_keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
            prompt_analysis: analysis_json.and_then(|j| serde_json::from_str::<PromptAnalysis>(&j).ok()),
            chunk_count: row.get::<_, i64>(8)? as usize,
            created_at: row.get(9)?,
        })
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentChunk> {
        let embedding_bytes: Vec<u8> = row.get(4)?;
        let embedding = bytes_to_embedding(&embedding_bytes);
        Ok(DocumentChunk {
            id: Some(row.get(0)?),
            agent_id: row.get(1)?,
            content: row.get(2)?,
            source: row.get(3)?,
            embedding,
            embedding_model: row.get(5)?,
            chunk_index: row.get::<_, i64>(6)? as usize,
        })
    }

    fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompilationJob> {
        let status_str: String = row.get(2)?;
        Ok(CompilationJob {
            id: Some(row.get(0)?),
            agent_id: row.get(1)?,
            status: parse_job_status(&status_str),
            progress: row.get::<_, i64>(3)? as u8,
            current_step: row.get(4)?,
            error_message: row.get(5)?,
            created_at: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn parse_job_status(s: &str) -> JobStatus {
    match s {
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        _ => JobStatus::InProgress,
    }
}

const AGENT_COLUMNS: &str = "id, tenant_id, name, system_prompt, status, domain, domain_keywords, prompt_analysis, chunk_count, created_at";
const CHUNK_COLUMNS: &str = "id, agent_id, content, source, embedding, embedding_model, chunk_index";
const JOB_COLUMNS: &str = "id, agent_id, status, progress, current_step, error_message, created_at, completed_at";

impl Store for SqliteStore {
    fn init(&self) -> Result<()> {
        let conn = self.conn()?;
        let is_init: i64 = conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;

        if is_init == 0 {
            conn.execute_batch(SCHEMA_SQL).map_err(StorageError::from)?;
            conn.execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION.to_string()])
                .map_err(StorageError::from)?;
        }
        Ok(())
    }

    fn create_agent(&self, agent: &Agent) -> Result<i64> {
        let conn = self.conn()?;
        let keywords_json = serde_json::to_string(&agent.domain_keywords).map_err(StorageError::from)?;
        let analysis_json = agent
            .prompt_analysis
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::from)?;

        conn.execute(
            "INSERT INTO agents (tenant_id, name, system_prompt, status, domain, domain_keywords, prompt_analysis, chunk_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                agent.tenant_id,
                agent.name,
                agent.system_prompt,
                agent.status.as_str(),
                agent.domain,
                keywords_json,
                analysis_json,
                agent.chunk_count as i64,
                agent.created_at,
            ],
        )
        .map_err(StorageError::from)?;

        Ok(conn.last_insert_rowid())
    }

    fn get_agent_by_name(&self, tenant_id: &str, name: &str) -> Result<Option<Agent>> {
        let conn = self.conn()?;
        let normalized = crate::model::normalize_agent_name(name);
        conn.query_row(
            &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE tenant_id = ? AND name = ?"),
            params![tenant_id, normalized],
            Self::row_to_agent,
        )
        .optional()
        .map_err(|e| StorageError::from(e).into())
    }

    fn get_agent(&self, id: i64) -> Result<Option<Agent>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?"),
            params![id],
            Self::row_to_agent,
        )
        .optional()
        .map_err(|e| StorageError::from(e).into())
    }

    fn list_agents(&self, tenant_id: &str) -> Result<Vec<Agent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE tenant_id = ? ORDER BY id"))
            .map_err(StorageError::from)?;
        let agents = stmt
            .query_map(params![tenant_id], Self::row_to_agent)
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(agents)
    }

    fn update_agent(&self, agent: &Agent) -> Result<()> {
        let id = agent.id.ok_or_else(|| StorageError::BufferNotFound {
            identifier: "agent has no ID".to_string(),
        })?;
        let conn = self.conn()?;
        let keywords_json = serde_json::to_string(&agent.domain_keywords).map_err(StorageError::from)?;
        let analysis_json = agent
            .prompt_analysis
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::from)?;

        conn.execute(
            "UPDATE agents SET system_prompt = ?, status = ?, domain = ?, domain_keywords = ?,
                prompt_analysis = ?, chunk_count = ? WHERE id = ?",
            params![
                agent.system_prompt,
                agent.status.as_str(),
                agent.domain,
                keywords_json,
                analysis_json,
                agent.chunk_count as i64,
                id,
            ],
        )
        .map_err(StorageError::from)?;
        Ok(())
    }

    fn delete_agent(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM agents WHERE id = ?", params![id])
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(StorageError::from)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO document_chunks (agent_id, content, source, embedding, embedding_model, chunk_index, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(StorageError::from)?;
            let now = Self::now();
            for chunk in chunks {
                stmt.execute(params![
                    chunk.agent_id,
                    chunk.content,
                    chunk.source,
                    embedding_to_bytes(&chunk.embedding),
                    chunk.embedding_model,
                    chunk.chunk_index as i64,
                    now,
                ])
                .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn get_chunks(&self, agent_id: i64) -> Result<Vec<DocumentChunk>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CHUNK_COLUMNS} FROM document_chunks WHERE agent_id = ? ORDER BY chunk_index"
            ))
            .map_err(StorageError::from)?;
        let chunks = stmt
            .query_map(params![agent_id], Self::row_to_chunk)
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(chunks)
    }

    fn get_chunk(&self, id: i64) -> Result<Option<DocumentChunk>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {CHUNK_COLUMNS} FROM document_chunks WHERE id = ?"),
            params![id],
            Self::row_to_chunk,
        )
        .optional()
        .map_err(|e| StorageError::from(e).into())
    }

    fn replace_chunks(&self, agent_id: i64, chunks: &[DocumentChunk]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(StorageError::from)?;
        tx.execute("DELETE FROM document_chunks WHERE agent_id = ?", params![agent_id])
            .map_err(StorageError::from)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO document_chunks (agent_id, content, source, embedding, embedding_model, chunk_index, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(StorageError::from)?;
            let now = Self::now();
            for chunk in chunks {
                stmt.execute(params![
                    chunk.agent_id,
                    chunk.content,
                    chunk.source,
                    embedding_to_bytes(&chunk.embedding),
                    chunk.embedding_model,
                    chunk.chunk_index as i64,
                    now,
                ])
                .map_err(StorageError::from)?;
            }
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn search_fts(&self, agent_id: i64, query: &str, limit: usize) -> Result<Vec<(i64, f64)>> {
        let conn = self.conn()?;
        let fts_query = query
            .split_whitespace()
            .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" OR ");

        if fts_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = conn
            .prepare(
                "SELECT dc.id, -bm25(document_chunks_fts) as score
                 FROM document_chunks_fts
                 JOIN document_chunks dc ON dc.id = document_chunks_fts.rowid
                 WHERE document_chunks_fts MATCH ? AND dc.agent_id = ?
                 ORDER BY score DESC
                 LIMIT ?",
            )
            .map_err(StorageError::from)?;

        let results = stmt
            .query_map(params![fts_query, agent_id, limit as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(results)
    }

    fn get_all_embeddings(&self, agent_id: i64) -> Result<Vec<(i64, Vec<f32>, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, embedding, embedding_model FROM document_chunks WHERE agent_id = ?")
            .map_err(StorageError::from)?;
        let results = stmt
            .query_map(params![agent_id], |row| {
                let id: i64 = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                let model: String = row.get(2)?;
                Ok((id, bytes_to_embedding(&bytes), model))
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(results)
    }

    fn create_job(&self, job: &CompilationJob) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO compilation_jobs (agent_id, status, progress, current_step, error_message, created_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                job.agent_id,
                job.status.as_str(),
                i64::from(job.progress),
                job.current_step,
                job.error_message,
                job.created_at,
                job.completed_at,
            ],
        )
        .map_err(StorageError::from)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_job(&self, id: i64) -> Result<Option<CompilationJob>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM compilation_jobs WHERE id = ?"),
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(|e| StorageError::from(e).into())
    }

    fn get_latest_job(&self, agent_id: i64) -> Result<Option<CompilationJob>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM compilation_jobs WHERE agent_id = ? ORDER BY id DESC LIMIT 1"),
            params![agent_id],
            Self::row_to_job,
        )
        .optional()
        .map_err(|e| StorageError::from(e).into())
    }

    fn update_job_progress(
        &self,
        job_id: i64,
        progress: u8,
        current_step: &str,
        status: Option<JobStatus>,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let completed_at = status.filter(|s| s.is_terminal()).map(|_| Self::now());

        if let Some(status) = status {
            conn.execute(
                "UPDATE compilation_jobs SET progress = ?, current_step = ?, status = ?, error_message = ?, completed_at = ? WHERE id = ?",
                params![i64::from(progress), current_step, status.as_str(), error_message, completed_at, job_id],
            )
        } else {
            conn.execute(
                "UPDATE compilation_jobs SET progress = ?, current_step = ? WHERE id = ?",
                params![i64::from(progress), current_step, job_id],
            )
        }
        .map_err(StorageError::from)?;
        Ok(())
    }

    fn find_stuck_jobs(&self, stuck_after_minutes: u64) -> Result<Vec<CompilationJob>> {
        let conn = self.conn()?;
        let cutoff = Self::now() - (stuck_after_minutes as i64) * 60;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM compilation_jobs WHERE status = 'in_progress' AND created_at < ?"
            ))
            .map_err(StorageError::from)?;
        let jobs = stmt
            .query_map(params![cutoff], Self::row_to_job)
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(jobs)
    }

    fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let agent_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        let chunk_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM document_chunks", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        let active_job_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM compilation_jobs WHERE status = 'in_progress'",
                [],
                |row| row.get(0),
            )
            .map_err(StorageError::from)?;
        drop(conn);
        let schema_version = self.get_schema_version()?.unwrap_or(0);

        Ok(StoreStats {
            agent_count: agent_count as usize,
            chunk_count: chunk_count as usize,
            active_job_count: active_job_count as usize,
            schema_version,
        })
    }
}
