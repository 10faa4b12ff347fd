//! `CompilationJob` and the progress events published during compilation (C13).

use serde::{Deserialize, Serialize};

/// Terminal/non-terminal state of a compilation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Worker is running.
    InProgress,
    /// Worker finished successfully.
    Completed,
    /// Worker failed; `error_message` on the job is populated.
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal (no further progress will be published).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A durable record of one compilation attempt for an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationJob {
    /// Surrogate key (assigned by storage).
    pub id: Option<i64>,
    /// Agent this job compiles.
    pub agent_id: i64,
    /// Current status.
    pub status: JobStatus,
    /// Progress percentage, 0..=100.
    pub progress: u8,
    /// Short description of the current pipeline step.
    pub current_step: String,
    /// Failure detail, capped at 500 characters. `None` unless `status == Failed`.
    pub error_message: Option<String>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of completion. `None` while `status == InProgress`.
    pub completed_at: Option<i64>,
}

/// Maximum length of a persisted job error message.
pub const ERROR_MESSAGE_CAP: usize = 500;

impl CompilationJob {
    /// Truncates an error message to [`ERROR_MESSAGE_CAP`] bytes at a valid
    /// char boundary, matching the original compiler's `str[:500]` behavior.
    #[must_use]
    pub fn truncate_error(message: &str) -> String {
        if message.len() <= ERROR_MESSAGE_CAP {
            return message.to_string();
        }
        let mut boundary = ERROR_MESSAGE_CAP;
        while !message.is_char_boundary(boundary) && boundary > 0 {
            boundary -= 1;
        }
        message[..boundary].to_string()
    }
}

/// A single progress update broadcast over the per-agent progress bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Agent status at the time of this event.
    pub agent_status: String,
    /// Progress percentage, 0..=100.
    pub progress: u8,
    /// Short description of the current step.
    pub current_step: String,
    /// Failure detail, set only on the terminal failure event.
    pub error_message: Option<String>,
}

impl ProgressEvent {
    /// True when this event closes the stream (terminal job state).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.progress == 100 || self.error_message.is_some()
    }
}
