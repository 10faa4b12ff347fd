//! Deterministic no-network `LlmProvider`, used when the `openai` feature
//! is disabled (see the feature doc comment in `Cargo.toml`).
//!
//! Each component that calls an [`LlmProvider`] already has its own
//! documented fallback for LLM failure (C5 lexical detection, C8 apology
//! string, C10 optimistic faithfulness); the stub exists so those paths are
//! exercised deterministically in tests and in network-free deployments
//! without every call site needing to special-case "no provider configured".

use super::traits::{ChatRequest, LlmProvider, ModelKind};
use crate::error::Result;

/// Canned non-JSON response returned by [`StubProvider::chat`].
pub const STUB_CHAT_RESPONSE: &str =
    "I don't have enough information to answer that in detail based on the retrieved context.";

/// A provider that never calls out to the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubProvider;

impl StubProvider {
    /// Creates a new stub provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LlmProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn resolve_model(&self, _kind: ModelKind) -> &str {
        "stub-model"
    }

    fn chat(&self, request: &ChatRequest) -> Result<String> {
        if request.json_mode {
            Ok("{}".to_string())
        } else {
            Ok(STUB_CHAT_RESPONSE.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_returns_empty_object() {
        let provider = StubProvider::new();
        let request = ChatRequest::new("stub-model", "sys", "user").json_mode(true);
        assert_eq!(provider.chat(&request).unwrap(), "{}");
    }

    #[test]
    fn test_chat_mode_returns_canned_response() {
        let provider = StubProvider::new();
        let request = ChatRequest::new("stub-model", "sys", "user");
        assert_eq!(provider.chat(&request).unwrap(), STUB_CHAT_RESPONSE);
    }
}
