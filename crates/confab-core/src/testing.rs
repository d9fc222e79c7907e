//! Test doubles shared by the core's unit tests: an in-memory store and a
//! scripted completion provider.

use std::collections::HashMap;
use std::sync::Mutex;

use futures_util::stream;
use uuid::Uuid;

use confab_types::chat::{Chat, ChatMessage};
use confab_types::error::StoreError;
use confab_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};

use crate::chat::store::ChatStore;
use crate::llm::provider::{CompletionProvider, EventStream};

/// Minimal in-memory `ChatStore` for unit tests.
#[derive(Default)]
pub struct MemStore {
    chats: Mutex<HashMap<Uuid, Chat>>,
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatStore for MemStore {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, StoreError> {
        self.chats.lock().unwrap().insert(chat.id, chat.clone());
        Ok(chat.clone())
    }

    async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<Chat>, StoreError> {
        Ok(self.chats.lock().unwrap().get(chat_id).cloned())
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        let mut chats = self.chats.lock().unwrap();
        if !chats.contains_key(&chat.id) {
            return Err(StoreError::ChatNotFound);
        }
        chats.insert(chat.id, chat.clone());
        Ok(())
    }

    async fn list_chats(&self) -> Result<Vec<Chat>, StoreError> {
        let mut chats: Vec<Chat> = self.chats.lock().unwrap().values().cloned().collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        if self.chats.lock().unwrap().remove(chat_id).is_none() {
            return Err(StoreError::ChatNotFound);
        }
        self.messages
            .lock()
            .unwrap()
            .retain(|m| m.chat_id != *chat_id);
        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut chats = self.chats.lock().unwrap();
        let chat = chats
            .get_mut(&message.chat_id)
            .ok_or(StoreError::ChatNotFound)?;
        chat.message_count += 1;
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn update_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut messages = self.messages.lock().unwrap();
        let stored = messages
            .iter_mut()
            .find(|m| m.id == message.id)
            .ok_or(StoreError::MessageNotFound)?;
        *stored = message.clone();
        Ok(())
    }

    async fn get_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == *chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.position);
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(usize::MAX);
        Ok(messages.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_messages(&self, chat_id: &Uuid) -> Result<u32, StoreError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == *chat_id)
            .count() as u32)
    }
}

/// Scripted provider: streams a fixed fragment sequence, or fails.
pub struct ScriptedProvider {
    pub fragments: Vec<&'static str>,
    pub fail_with: Option<&'static str>,
}

impl ScriptedProvider {
    pub fn streaming(fragments: Vec<&'static str>) -> Self {
        Self {
            fragments,
            fail_with: None,
        }
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            fragments: Vec::new(),
            fail_with: Some(message),
        }
    }
}

impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        if let Some(message) = self.fail_with {
            return Err(LlmError::Transport(message.to_string()));
        }
        Ok(CompletionResponse {
            text: self.fragments.concat(),
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }

    fn stream(&self, _request: CompletionRequest) -> EventStream {
        if let Some(message) = self.fail_with {
            let err = LlmError::Transport(message.to_string());
            let events: Vec<Result<StreamEvent, LlmError>> = vec![Err(err)];
            return Box::pin(stream::iter(events));
        }

        let mut events: Vec<Result<StreamEvent, LlmError>> = vec![Ok(StreamEvent::Connected)];
        events.extend(self.fragments.iter().map(|f| {
            Ok(StreamEvent::TextDelta {
                text: (*f).to_string(),
            })
        }));
        events.push(Ok(StreamEvent::MessageDelta {
            stop_reason: StopReason::EndTurn,
        }));
        events.push(Ok(StreamEvent::Done));
        Box::pin(stream::iter(events))
    }
}
