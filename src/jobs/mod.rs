//! Job registry and progress bus (C13).
//!
//! Grounded on `compilation_worker.py`'s `CompilationWorker`: `active_jobs`
//! keyed by agent id enforces that only one compilation runs per agent at a
//! time, `start_compilation` creates the job row before handing off to the
//! worker, and `_update_progress` both persists and logs each milestone.
//! Here the milestone write additionally fans out over a broadcast channel
//! so callers (e.g. an SSE/WebSocket handler) can stream progress without
//! polling the store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{CompilationJob, JobStatus, ProgressEvent};
use crate::store::Store;

const PROGRESS_CHANNEL_CAPACITY: usize = 64;

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

fn job_to_progress_event(job: &CompilationJob) -> ProgressEvent {
    ProgressEvent {
        agent_status: job.status.as_str().to_string(),
        progress: job.progress,
        current_step: job.current_step.clone(),
        error_message: job.error_message.clone(),
    }
}

/// Tracks in-flight compilations (single writer per agent) and broadcasts
/// their progress, one channel per agent so a subscriber only sees events
/// for the agent it asked about.
pub struct JobRegistry {
    in_flight: Mutex<HashSet<i64>>,
    channels: Mutex<HashMap<i64, broadcast::Sender<ProgressEvent>>>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self { in_flight: Mutex::new(HashSet::new()), channels: Mutex::new(HashMap::new()) }
    }
}

impl JobRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a compilation for `agent_id`: acquires the per-agent
    /// single-writer lock and creates an `in_progress` job row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingCompilation`] if a compilation is
    /// already running for this agent, or a storage error if the job row
    /// cannot be created (the lock is released in that case).
    pub fn start_compilation(&self, store: &dyn Store, agent_id: i64, agent_name: &str) -> Result<(JobLease<'_>, i64)> {
        let lease = self.acquire(agent_id, agent_name)?;

        let job = CompilationJob {
            id: None,
            agent_id,
            status: JobStatus::InProgress,
            progress: 0,
            current_step: "Initializing".to_string(),
            error_message: None,
            created_at: unix_now(),
            completed_at: None,
        };

        match store.create_job(&job) {
            Ok(job_id) => {
                info!(agent_id, job_id, "compilation job created");
                Ok((lease, job_id))
            }
            Err(e) => Err(e),
        }
    }

    fn acquire(&self, agent_id: i64, agent_name: &str) -> Result<JobLease<'_>> {
        let mut guard = self.in_flight.lock().expect("job registry poisoned");
        if !guard.insert(agent_id) {
            return Err(Error::ConflictingCompilation { name: agent_name.to_string() });
        }
        drop(guard);
        Ok(JobLease { registry: self, agent_id })
    }

    fn release(&self, agent_id: i64) {
        self.in_flight.lock().expect("job registry poisoned").remove(&agent_id);
    }

    /// Subscribes to `agent_id`'s progress bus. Returns the agent's
    /// latest known job state (if any) alongside the receiver, so a late
    /// subscriber that missed earlier events still sees where the
    /// compilation currently stands before the next live update arrives.
    ///
    /// Best-effort: a slow subscriber sees
    /// [`broadcast::error::RecvError::Lagged`] rather than blocking publishers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub fn subscribe(&self, store: &dyn Store, agent_id: i64) -> Result<(Option<ProgressEvent>, broadcast::Receiver<ProgressEvent>)> {
        let snapshot = store.get_latest_job(agent_id)?.as_ref().map(job_to_progress_event);
        let rx = self.channel_for(agent_id).subscribe();
        Ok((snapshot, rx))
    }

    fn channel_for(&self, agent_id: i64) -> broadcast::Sender<ProgressEvent> {
        let mut channels = self.channels.lock().expect("job registry poisoned");
        channels
            .entry(agent_id)
            .or_insert_with(|| broadcast::channel(PROGRESS_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Persists a progress update for `job_id` and fans it out over
    /// `agent_id`'s bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails; the bus publish is always
    /// best-effort and never fails the caller.
    pub fn record_progress(
        &self,
        store: &dyn Store,
        agent_id: i64,
        job_id: i64,
        progress: u8,
        current_step: &str,
        status: Option<JobStatus>,
        error_message: Option<&str>,
    ) -> Result<()> {
        store.update_job_progress(job_id, progress, current_step, status, error_message)?;

        let agent_status = status.map_or_else(|| "in_progress".to_string(), |s| s.as_str().to_string());
        let event = ProgressEvent {
            agent_status,
            progress,
            current_step: current_step.to_string(),
            error_message: error_message.map(str::to_string),
        };
        // No subscribers is the common case outside a live request; the
        // send error (no receivers) is expected and not logged.
        let _ = self.channel_for(agent_id).send(event);
        Ok(())
    }

    /// Lists jobs stuck `in_progress` past `stuck_after_minutes`, logging
    /// each one. Diagnostics only: stuck jobs are never forcibly terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying query fails.
    pub fn find_stuck_jobs(&self, store: &dyn Store, stuck_after_minutes: u64) -> Result<Vec<CompilationJob>> {
        let stuck = store.find_stuck_jobs(stuck_after_minutes)?;
        for job in &stuck {
            warn!(job_id = ?job.id, agent_id = job.agent_id, progress = job.progress, "compilation job appears stuck");
        }
        Ok(stuck)
    }
}

/// RAII guard releasing the single-writer lock for one agent's compilation
/// when dropped, win or lose.
pub struct JobLease<'a> {
    registry: &'a JobRegistry,
    agent_id: i64,
}

impl Drop for JobLease<'_> {
    fn drop(&mut self) {
        self.registry.release(self.agent_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Agent;
    use crate::store::SqliteStore;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        store
    }

    #[test]
    fn test_start_compilation_creates_in_progress_job() {
        let store = store();
        let agent_id = store.create_agent(&Agent::new("t1", "chef", "prompt")).unwrap();
        let registry = JobRegistry::new();

        let (_lease, job_id) = registry.start_compilation(&store, agent_id, "chef").unwrap();
        let job = store.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn test_second_compilation_for_same_agent_is_rejected() {
        let store = store();
        let agent_id = store.create_agent(&Agent::new("t1", "chef", "prompt")).unwrap();
        let registry = JobRegistry::new();

        let (_lease, _job_id) = registry.start_compilation(&store, agent_id, "chef").unwrap();
        let second = registry.start_compilation(&store, agent_id, "chef");
        assert!(matches!(second, Err(Error::ConflictingCompilation { .. })));
    }

    #[test]
    fn test_releasing_lease_allows_a_new_compilation() {
        let store = store();
        let agent_id = store.create_agent(&Agent::new("t1", "chef", "prompt")).unwrap();
        let registry = JobRegistry::new();

        {
            let (_lease, _job_id) = registry.start_compilation(&store, agent_id, "chef").unwrap();
        } // lease dropped here, lock released

        let result = registry.start_compilation(&store, agent_id, "chef");
        assert!(result.is_ok());
    }

    #[test]
    fn test_record_progress_persists_and_publishes() {
        let store = store();
        let agent_id = store.create_agent(&Agent::new("t1", "chef", "prompt")).unwrap();
        let registry = JobRegistry::new();
        let (_lease, job_id) = registry.start_compilation(&store, agent_id, "chef").unwrap();

        let (snapshot, mut rx) = registry.subscribe(&store, agent_id).unwrap();
        assert!(snapshot.is_some());
        registry.record_progress(&store, agent_id, job_id, 42, "Chunking", None, None).unwrap();

        let job = store.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.progress, 42);
        assert_eq!(job.current_step, "Chunking");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.progress, 42);
    }

    #[test]
    fn test_subscribe_for_unknown_agent_returns_no_snapshot() {
        let store = store();
        let agent_id = store.create_agent(&Agent::new("t1", "chef", "prompt")).unwrap();
        let registry = JobRegistry::new();

        let (snapshot, _rx) = registry.subscribe(&store, agent_id).unwrap();
        assert!(snapshot.is_none());
    }

    #[test]
    fn test_subscriber_does_not_see_other_agents_events() {
        let store = store();
        let agent_a = store.create_agent(&Agent::new("t1", "chef", "prompt")).unwrap();
        let agent_b = store.create_agent(&Agent::new("t1", "baker", "prompt")).unwrap();
        let registry = JobRegistry::new();

        let (_, job_a) = registry.start_compilation(&store, agent_a, "chef").unwrap();
        let (_, _job_b) = registry.start_compilation(&store, agent_b, "baker").unwrap();

        let (_, mut rx_b) = registry.subscribe(&store, agent_b).unwrap();
        registry.record_progress(&store, agent_a, job_a, 50, "Chunking", None, None).unwrap();

        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_record_progress_marks_terminal_failure() {
        let store = store();
        let agent_id = store.create_agent(&Agent::new("t1", "chef", "prompt")).unwrap();
        let registry = JobRegistry::new();
        let (_lease, job_id) = registry.start_compilation(&store, agent_id, "chef").unwrap();

        registry
            .record_progress(&store, agent_id, job_id, 30, "Parsing failed", Some(JobStatus::Failed), Some("boom"))
            .unwrap();

        let job = store.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_find_stuck_jobs_delegates_to_store() {
        let store = store();
        let registry = JobRegistry::new();
        let stuck = registry.find_stuck_jobs(&store, 30).unwrap();
        assert!(stuck.is_empty());
    }
}
