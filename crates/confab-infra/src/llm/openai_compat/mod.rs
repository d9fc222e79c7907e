//! OpenAI-compatible completion provider.
//!
//! One provider covers any OpenAI-compatible endpoint (OpenAI itself,
//! local inference servers, proxies) via a configurable base URL.
//! Uses [`async_openai`] for type-safe request/response handling and
//! built-in SSE streaming.

pub mod streaming;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionStreamOptions,
    CreateChatCompletionRequest, FinishReason,
};
use async_openai::Client;
use secrecy::{ExposeSecret, SecretString};

use confab_core::llm::provider::{CompletionProvider, EventStream};
use confab_types::chat::Sender;
use confab_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, Usage,
};

use self::streaming::map_openai_stream;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Completion provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the API key lives inside the `async_openai`
/// client and must not leak through debug formatting.
pub struct OpenAiCompatProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
}

impl OpenAiCompatProvider {
    /// Create a provider against the given base URL (`None` means the
    /// official OpenAI endpoint).
    pub fn new(api_key: SecretString, base_url: Option<&str>) -> Self {
        let base_url = base_url.unwrap_or(OPENAI_BASE_URL);
        let config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url);

        Self {
            client: Client::with_config(config),
            provider_name: "openai_compat".to_string(),
        }
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic
    /// [`CompletionRequest`].
    fn build_request(
        request: &CompletionRequest,
        stream: bool,
    ) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }

        for msg in &request.messages {
            let mapped = match msg.sender {
                Sender::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.text.clone()),
                        name: None,
                    })
                }
                Sender::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            msg.text.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            };
            messages.push(mapped);
        }

        let mut req = CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if stream {
            req.stream = Some(true);
            req.stream_options = Some(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            });
        }

        req
    }
}

impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = Self::build_request(request, false);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let stop_reason = response
            .choices
            .first()
            .and_then(|c| c.finish_reason.clone())
            .map(map_finish_reason)
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            model: response.model,
            stop_reason,
            usage,
        })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        let oai_request = Self::build_request(&request, true);
        // Clone the client for the 'static stream closure.
        let client = self.client.clone();

        Box::pin(async_stream::try_stream! {
            let oai_stream = client
                .chat()
                .create_stream(oai_request)
                .await
                .map_err(map_openai_error)?;

            let mut inner = map_openai_stream(oai_stream);

            use futures_util::StreamExt;
            while let Some(event) = inner.next().await {
                yield event?;
            }
        })
    }
}

/// Map an async-openai finish reason onto the domain stop reason.
pub(crate) fn map_finish_reason(reason: FinishReason) -> StopReason {
    match reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        // No tools or filters in this domain; treat the rest as a stop.
        FinishReason::ToolCalls | FinishReason::ContentFilter | FinishReason::FunctionCall => {
            StopReason::EndTurn
        }
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => LlmError::Provider {
            message: api_err.message.clone(),
        },
        OpenAIError::Reqwest(_) => LlmError::Transport(err.to_string()),
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::StreamError(stream_err) => LlmError::Stream(stream_err.to_string()),
        OpenAIError::InvalidArgument(msg) => LlmError::Configuration(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_types::llm::PromptMessage;

    fn request(system: Option<&str>) -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                PromptMessage {
                    sender: Sender::User,
                    text: "Hello".to_string(),
                },
                PromptMessage {
                    sender: Sender::Assistant,
                    text: "Hi there!".to_string(),
                },
            ],
            system: system.map(str::to_string),
            max_tokens: 1024,
            temperature: Some(0.7),
            stream: false,
        }
    }

    #[test]
    fn test_build_request_messages() {
        let oai_req = OpenAiCompatProvider::build_request(&request(Some("Be helpful")), false);
        assert_eq!(oai_req.model, "gpt-4o-mini");
        // 1 system + 2 conversation = 3 messages
        assert_eq!(oai_req.messages.len(), 3);
        assert_eq!(oai_req.max_completion_tokens, Some(1024));
        assert!(oai_req.stream.is_none());
        assert!(oai_req.stream_options.is_none());
    }

    #[test]
    fn test_build_request_streaming_options() {
        let oai_req = OpenAiCompatProvider::build_request(&request(None), true);
        assert_eq!(oai_req.stream, Some(true));
        let opts = oai_req.stream_options.unwrap();
        assert_eq!(opts.include_usage, Some(true));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(FinishReason::Stop), StopReason::EndTurn);
        assert_eq!(
            map_finish_reason(FinishReason::Length),
            StopReason::MaxTokens
        );
        assert_eq!(
            map_finish_reason(FinishReason::ContentFilter),
            StopReason::EndTurn
        );
    }

    #[test]
    fn test_map_openai_error_invalid_argument() {
        use async_openai::error::OpenAIError;
        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()));
        assert!(matches!(err, LlmError::Configuration(_)));
    }

    #[test]
    fn test_provider_name() {
        let provider = OpenAiCompatProvider::new(SecretString::from("sk-test"), None);
        assert_eq!(provider.name(), "openai_compat");
    }
}
