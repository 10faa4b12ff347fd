//! Provider-agnostic LLM chat interface consumed by C5, C8, C9, C10.
//!
//! The core treats the LLM as blocking I/O (SPEC_FULL.md §5): callers must
//! not hold a database transaction open across a [`LlmProvider::chat`] call.
//! Concrete providers (e.g. [`crate::llm::OpenAiProvider`]) may run an async
//! client internally but present a synchronous face here, mirroring how the
//! rest of this crate's pipeline is written without infecting it with async.

use crate::error::Result;

/// Role of a message in a chat transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// System/instruction message.
    System,
    /// End-user message.
    User,
    /// Prior assistant response (unused by the current pipeline, kept for
    /// providers that require a well-formed transcript).
    Assistant,
}

/// One message in a chat request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Builds a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Builds a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Which tier of model a call should use. The core refers to models by
/// kind; the mapping to concrete model identifiers is configuration
/// (SPEC_FULL.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Small/cheap model for latency-sensitive or structured-extraction
    /// calls (C5 analysis, C10 claim extraction/verification).
    Fast,
    /// Default conversational model (C8 synthesis).
    Chat,
    /// Larger model reserved for calls that need stronger reasoning.
    Advanced,
}

/// A single chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Transcript to send.
    pub messages: Vec<ChatMessage>,
    /// Concrete model identifier (resolved from a [`ModelKind`] by the caller).
    pub model: String,
    /// Sampling temperature, if the caller wants to override the provider default.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Whether the provider should be asked to return strict JSON.
    pub json_mode: bool,
}

impl ChatRequest {
    /// Builds a single-message (system + user) chat request.
    #[must_use]
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_message)],
            model: model.into(),
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    /// Sets `json_mode`.
    #[must_use]
    pub const fn json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    /// Sets `max_tokens`.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets `temperature`.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A chat-capable LLM backend.
///
/// Implementations back C5 (prompt analysis), C8 (synthesis), C9
/// (attribution's LLM-free but shares the provider type for symmetry), and
/// C10 (faithfulness claim extraction/verification).
pub trait LlmProvider: Send + Sync {
    /// Short provider name, for logging.
    fn name(&self) -> &'static str;

    /// Resolves a [`ModelKind`] to the concrete model identifier this
    /// provider should use for it.
    fn resolve_model(&self, kind: ModelKind) -> &str;

    /// Runs one chat completion, blocking the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LlmFailure`] on network, timeout, or
    /// malformed-response conditions.
    fn chat(&self, request: &ChatRequest) -> Result<String>;
}
