//! Message posting and completion orchestration.
//!
//! `MessageComposer` is the round trip behind "post a message": persist the
//! user's message, create the empty reply record, run the completion, and
//! feed its fragments through a [`StreamingAppender`]. The await on
//! [`MessageComposer::create_message_and_completion`] is the only blocking
//! point the caller sees; it resolves when the full round trip resolves or
//! fails. Failures surface unrecovered -- user-visible reporting is the
//! caller's concern, and nothing here retries.

use std::time::Instant;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use confab_types::chat::{Chat, ChatMessage, Sender};
use confab_types::error::{StoreError, StreamError};
use confab_types::llm::{CompletionRequest, LlmError, PromptMessage, StreamEvent};

use crate::binding::ReplyContext;
use crate::chat::service::ChatService;
use crate::chat::store::ChatStore;
use crate::llm::box_provider::BoxCompletionProvider;
use crate::stream::appender::StreamingAppender;
use crate::stream::scroll::ScrollScheduler;

/// Errors from the message-post round trip.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("message is empty after trimming")]
    EmptyMessage,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("completion cancelled")]
    Cancelled,
}

/// Sampling settings applied to every completion request.
#[derive(Debug, Clone, Copy)]
pub struct ComposeSettings {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// What the caller hands over to post a message.
#[derive(Debug, Clone)]
pub struct NewMessageParams {
    pub chat_id: Uuid,
    pub text: String,
    pub sender: Sender,
}

/// One message-post round trip against a chat.
pub struct MessageComposer<'a, S: ChatStore> {
    service: &'a ChatService<S>,
    provider: &'a BoxCompletionProvider,
    scroll: ScrollScheduler,
    settings: ComposeSettings,
    cancel: CancellationToken,
    params: NewMessageParams,
}

impl<'a, S: ChatStore> MessageComposer<'a, S> {
    pub fn new(
        service: &'a ChatService<S>,
        provider: &'a BoxCompletionProvider,
        scroll: ScrollScheduler,
        settings: ComposeSettings,
        params: NewMessageParams,
    ) -> Self {
        Self {
            service,
            provider,
            scroll,
            settings,
            cancel: CancellationToken::new(),
            params,
        }
    }

    /// Abort the in-flight completion when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Create the user message, run the completion, and return the
    /// finalized reply message.
    ///
    /// With streaming enabled on the chat, fragments are applied to the
    /// reply record in arrival order as they come off the transport; with
    /// streaming disabled, the full text is written in one step. Either
    /// way the reply is frozen and persisted before this returns.
    pub async fn create_message_and_completion(self) -> Result<ChatMessage, ComposeError> {
        let text = self.params.text.trim();
        if text.is_empty() {
            return Err(ComposeError::EmptyMessage);
        }

        let chat = self
            .service
            .get_chat(&self.params.chat_id)
            .await?
            .ok_or(StoreError::ChatNotFound)?;

        self.service
            .append_message(&chat.id, self.params.sender, text.to_string())
            .await?;
        self.scroll.request();

        // History for the request, captured before the empty reply exists.
        let history = self.service.binding(&chat.id)?.snapshot();

        let reply = self
            .service
            .append_message(&chat.id, Sender::Assistant, String::new())
            .await?;
        let reply_ctx = self.service.reply_context(&chat.id, reply.id)?;

        let request = build_request(&chat, &history, self.settings);
        info!(
            chat_id = %chat.id,
            model = %chat.model,
            streaming = chat.streaming_enabled,
            "Posting message"
        );

        let started = Instant::now();
        if chat.streaming_enabled {
            self.stream_reply(request, reply_ctx).await?;
        } else {
            let response = self.provider.complete(&request).await?;
            reply_ctx.append_text(&response.text)?;
            self.scroll.request();
        }
        let response_ms = started.elapsed().as_millis() as u64;

        let finalized = self
            .service
            .finalize_reply(&chat.id, reply.id, chat.model.clone(), response_ms)
            .await?;
        Ok(finalized)
    }

    /// Consume the provider stream, forwarding every text fragment to the
    /// appender. A stale target aborts the stream; dropping it tears down
    /// the transport.
    async fn stream_reply(
        &self,
        request: CompletionRequest,
        reply_ctx: ReplyContext,
    ) -> Result<(), ComposeError> {
        let mut appender = StreamingAppender::new(reply_ctx, self.scroll.clone());
        let mut stream = self.provider.stream(request);

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ComposeError::Cancelled),
                event = stream.next() => event,
            };
            let Some(event) = event else { break };

            match event? {
                StreamEvent::TextDelta { text } => {
                    appender.on_fragment(&text)?;
                }
                StreamEvent::Done => break,
                StreamEvent::Connected
                | StreamEvent::MessageDelta { .. }
                | StreamEvent::Usage(_) => {}
            }
        }

        let applied = appender.finish();
        debug!(applied, "Completion stream drained");
        Ok(())
    }
}

/// Build a completion request from a chat's history.
fn build_request(chat: &Chat, history: &[ChatMessage], settings: ComposeSettings) -> CompletionRequest {
    let messages = history
        .iter()
        .filter(|m| !m.text.is_empty())
        .map(|m| PromptMessage {
            sender: m.sender,
            text: m.text.clone(),
        })
        .collect();

    CompletionRequest {
        model: chat.model.clone(),
        messages,
        system: None,
        max_tokens: settings.max_tokens,
        temperature: Some(settings.temperature),
        stream: chat.streaming_enabled,
    }
}
