//! `OpenAI`-compatible `LlmProvider`, backed by `async-openai`.
//!
//! Grounded on the pack's `zircote-rlm` agent provider (same crate, same
//! message-conversion shape); adapted to a blocking facade since this
//! engine's pipeline is synchronous and treats LLM calls as blocking I/O
//! (SPEC_FULL.md §5) rather than threading `async` through every component.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    CreateChatCompletionRequest, ResponseFormat,
};
use tokio::runtime::Runtime;

use super::traits::{ChatMessage, ChatRequest, LlmProvider, ModelKind, Role};
use crate::error::{Error, Result};

/// Concrete model identifiers used for each [`ModelKind`].
#[derive(Debug, Clone)]
pub struct OpenAiModels {
    /// Model backing [`ModelKind::Fast`].
    pub fast: String,
    /// Model backing [`ModelKind::Chat`].
    pub chat: String,
    /// Model backing [`ModelKind::Advanced`].
    pub advanced: String,
}

impl Default for OpenAiModels {
    fn default() -> Self {
        Self {
            fast: "gpt-4o-mini".to_string(),
            chat: "gpt-4o".to_string(),
            advanced: "gpt-4o".to_string(),
        }
    }
}

/// `OpenAI`-compatible LLM provider (also serves Azure/local proxies via
/// `base_url`).
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    models: OpenAiModels,
    runtime: Runtime,
    chat_timeout: Duration,
    json_timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a provider from an API key, optional base URL override, and
    /// model mapping.
    ///
    /// `chat_timeout`/`json_timeout` bound how long a single [`chat`](Self::chat)
    /// call may block, selected by the request's `json_mode` flag, so a
    /// hung upstream call can't wedge the caller's thread forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal blocking runtime cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        models: OpenAiModels,
        chat_timeout: Duration,
        json_timeout: Duration,
    ) -> Result<Self> {
        let mut config = OpenAIConfig::new().with_api_key(api_key.into());
        if let Some(base_url) = base_url {
            config = config.with_api_base(base_url);
        }

        let runtime = Runtime::new().map_err(|e| Error::LlmFailure {
            reason: format!("failed to start async runtime: {e}"),
        })?;

        Ok(Self {
            client: Client::with_config(config),
            models,
            runtime,
            chat_timeout,
            json_timeout,
        })
    }

    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System | Role::Assistant => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
        }
    }

    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();
        let response_format = request.json_mode.then_some(ResponseFormat::JsonObject);

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            response_format,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .field("models", &self.models)
            .finish()
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn resolve_model(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Fast => &self.models.fast,
            ModelKind::Chat => &self.models.chat,
            ModelKind::Advanced => &self.models.advanced,
        }
    }

    fn chat(&self, request: &ChatRequest) -> Result<String> {
        let openai_request = Self::build_request(request);
        let timeout = if request.json_mode { self.json_timeout } else { self.chat_timeout };

        let response = self
            .runtime
            .block_on(tokio::time::timeout(timeout, self.client.chat().create(openai_request)))
            .map_err(|_| Error::LlmFailure { reason: format!("LLM call timed out after {timeout:?}") })?
            .map_err(|e| Error::LlmFailure { reason: e.to_string() })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_system_message() {
        let msg = ChatMessage::system("be terse");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_convert_user_message() {
        let msg = ChatMessage::user("hello");
        let converted = OpenAiProvider::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_build_request_json_mode() {
        let request = ChatRequest::new("gpt-4o-mini", "sys", "user").json_mode(true);
        let built = OpenAiProvider::build_request(&request);
        assert!(built.response_format.is_some());
    }

    #[test]
    fn test_resolve_model_maps_kinds() {
        let models = OpenAiModels::default();
        assert_eq!(models.fast, "gpt-4o-mini");
    }
}
