//! LLM provider abstraction (§6 "Provider interfaces (consumed)").
//!
//! Structured the way [`crate::embedding`] and [`crate::chunking`] expose a
//! trait plus a `create_*` factory over concrete strategies.

#[cfg(feature = "openai")]
mod openai;
mod stub;
mod traits;

#[cfg(feature = "openai")]
pub use openai::{OpenAiModels, OpenAiProvider};
pub use stub::{STUB_CHAT_RESPONSE, StubProvider};
pub use traits::{ChatMessage, ChatRequest, LlmProvider, ModelKind, Role};

/// Builds an [`LlmProvider`] from an optional API key.
///
/// With the `openai` feature enabled and `api_key` present, returns an
/// [`OpenAiProvider`] bounded by `chat_timeout_secs`/`json_timeout_secs`
/// (see [`crate::config::EngineConfig`]); otherwise falls back to the
/// deterministic [`StubProvider`] (no network access required).
#[must_use]
pub fn create_llm_provider(
    api_key: Option<String>,
    base_url: Option<&str>,
    #[cfg_attr(not(feature = "openai"), allow(unused_variables))] chat_timeout_secs: u64,
    #[cfg_attr(not(feature = "openai"), allow(unused_variables))] json_timeout_secs: u64,
) -> Box<dyn LlmProvider> {
    #[cfg(feature = "openai")]
    if let Some(key) = api_key {
        let chat_timeout = std::time::Duration::from_secs(chat_timeout_secs);
        let json_timeout = std::time::Duration::from_secs(json_timeout_secs);
        match OpenAiProvider::new(key, base_url, OpenAiModels::default(), chat_timeout, json_timeout) {
            Ok(provider) => return Box::new(provider),
            Err(e) => {
                tracing::warn!(error = %e, "failed to construct openai provider, falling back to stub");
            }
        }
    }

    #[cfg(not(feature = "openai"))]
    let _ = (api_key, base_url);

    Box::new(StubProvider::new())
}
