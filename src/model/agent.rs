//! Agent: the tenant-scoped unit of compiled knowledge.

use serde::{Deserialize, Serialize};

use super::analysis::PromptAnalysis;

/// Lifecycle state of an agent's knowledge base.
///
/// Transitions are monotonic except `Failed -> InProgress` (a retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Agent record created, compilation not yet started.
    Initializing,
    /// Compilation worker is actively running.
    InProgress,
    /// Compilation succeeded; the agent is queryable.
    Ready,
    /// Compilation failed; the agent is not queryable.
    Failed,
}

impl AgentStatus {
    /// Returns the canonical lowercase name used in storage and APIs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its canonical string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initializing" => Some(Self::Initializing),
            "in_progress" => Some(Self::InProgress),
            "ready" => Some(Self::Ready),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tenant's knowledge agent: persona, compiled domain signature, and
/// lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Surrogate key (assigned by storage).
    pub id: Option<i64>,
    /// Owning tenant.
    pub tenant_id: String,
    /// Normalized agent name, unique within `tenant_id`.
    pub name: String,
    /// The user-authored system prompt describing this agent's persona.
    pub system_prompt: String,
    /// Current lifecycle state.
    pub status: AgentStatus,
    /// Detected domain (e.g. "cooking", "medical"). Empty until analyzed.
    pub domain: String,
    /// Deduplicated domain keyword vocabulary, capped at 80 entries.
    pub domain_keywords: Vec<String>,
    /// Structured system-prompt analysis, set once compilation reaches it.
    pub prompt_analysis: Option<PromptAnalysis>,
    /// Number of chunks currently indexed for this agent.
    pub chunk_count: usize,
    /// Unix timestamp of creation.
    pub created_at: i64,
}

impl Agent {
    /// Creates a freshly-initialized agent record, not yet compiled.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: None,
            tenant_id: tenant_id.into(),
            name: normalize_agent_name(&name.into()),
            system_prompt: system_prompt.into(),
            status: AgentStatus::Initializing,
            domain: String::new(),
            domain_keywords: Vec::new(),
            prompt_analysis: None,
            chunk_count: 0,
            created_at: current_timestamp(),
        }
    }

    /// True when the agent has at least one chunk and non-empty vocabulary,
    /// the invariant required of every `Ready` agent.
    #[must_use]
    pub fn meets_ready_invariant(&self) -> bool {
        self.chunk_count > 0 && !self.domain_keywords.is_empty()
    }
}

/// Normalizes an agent name: trim, lowercase, spaces become underscores.
#[must_use]
pub fn normalize_agent_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[allow(clippy::cast_possible_wrap)]
fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_agent_name() {
        assert_eq!(normalize_agent_name("  Cooking Helper  "), "cooking_helper");
        assert_eq!(normalize_agent_name("Already_Normal"), "already_normal");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AgentStatus::Initializing,
            AgentStatus::InProgress,
            AgentStatus::Ready,
            AgentStatus::Failed,
        ] {
            assert_eq!(AgentStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_new_agent_defaults() {
        let agent = Agent::new("tenant-1", "Cooking Helper", "You are a cooking assistant.");
        assert_eq!(agent.name, "cooking_helper");
        assert_eq!(agent.status, AgentStatus::Initializing);
        assert!(!agent.meets_ready_invariant());
    }
}
