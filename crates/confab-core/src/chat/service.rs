//! Chat service orchestrating chat lifecycle and the live bindings.
//!
//! `ChatService` coordinates the store and the per-chat message-list
//! bindings: creating chats registers a binding, deleting a chat removes
//! and invalidates it (which is what an in-flight streaming session
//! observes as a stale target). Property edits are deferred: they stage
//! into a batch and apply only on `submit_changes`, mirroring the source
//! system's pending-change model.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use confab_types::chat::{Chat, ChatEdit, ChatMessage, Sender};
use confab_types::error::StoreError;

use crate::binding::{MessageListBinding, ReplyContext};
use crate::chat::store::ChatStore;

/// Orchestrates chat lifecycle, live bindings, and deferred edits.
///
/// Generic over `ChatStore` so the core never depends on a concrete store
/// implementation.
pub struct ChatService<S: ChatStore> {
    store: S,
    bindings: DashMap<Uuid, Arc<MessageListBinding>>,
    pending: Mutex<Vec<ChatEdit>>,
}

impl<S: ChatStore> ChatService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            bindings: DashMap::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Chat lifecycle ---

    /// Create a new chat and register its live binding.
    pub async fn create_chat(
        &self,
        title: Option<String>,
        model: String,
    ) -> Result<Chat, StoreError> {
        let chat = Chat {
            id: Uuid::now_v7(),
            title,
            created_at: Utc::now(),
            streaming_enabled: true,
            message_count: 0,
            model,
        };

        let chat = self.store.create_chat(&chat).await?;
        self.bindings
            .insert(chat.id, MessageListBinding::new(chat.id));
        info!(chat_id = %chat.id, "Chat created");
        Ok(chat)
    }

    pub async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<Chat>, StoreError> {
        self.store.get_chat(chat_id).await
    }

    pub async fn list_chats(&self) -> Result<Vec<Chat>, StoreError> {
        self.store.list_chats().await
    }

    /// Delete a chat: remove it from the store, drop its binding from the
    /// registry, and invalidate the binding so observers and any in-flight
    /// reply handle see the deletion.
    pub async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        self.store.delete_chat(chat_id).await?;
        if let Some((_, binding)) = self.bindings.remove(chat_id) {
            binding.invalidate();
        }
        info!(chat_id = %chat_id, "Chat deleted");
        Ok(())
    }

    /// The live message-list binding a view subscribes to.
    pub fn binding(&self, chat_id: &Uuid) -> Result<Arc<MessageListBinding>, StoreError> {
        self.bindings
            .get(chat_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StoreError::ChatNotFound)
    }

    // --- Messages ---

    /// Append a message to a chat: persist it and mirror it into the live
    /// binding, notifying observers.
    pub async fn append_message(
        &self,
        chat_id: &Uuid,
        sender: Sender,
        text: String,
    ) -> Result<ChatMessage, StoreError> {
        let binding = self.binding(chat_id)?;
        let message = ChatMessage {
            id: Uuid::now_v7(),
            chat_id: *chat_id,
            sender,
            text,
            position: binding.next_position(),
            created_at: Utc::now(),
            model: None,
            response_ms: None,
        };

        self.store.save_message(&message).await?;
        binding.append(message.clone());
        Ok(message)
    }

    /// A mutable-property handle over one message in a chat's binding.
    pub fn reply_context(
        &self,
        chat_id: &Uuid,
        message_id: Uuid,
    ) -> Result<ReplyContext, StoreError> {
        let binding = self.binding(chat_id)?;
        Ok(ReplyContext::new(&binding, message_id))
    }

    /// Persist a completed reply: read its final text from the binding,
    /// stamp metadata, update the stored record, and notify observers that
    /// the message is final.
    pub async fn finalize_reply(
        &self,
        chat_id: &Uuid,
        message_id: Uuid,
        model: String,
        response_ms: u64,
    ) -> Result<ChatMessage, StoreError> {
        let binding = self.binding(chat_id)?;
        let message = binding
            .mark_completed(message_id, Some(model), Some(response_ms))
            .map_err(|_| StoreError::MessageNotFound)?;

        self.store.update_message(&message).await?;
        debug!(
            chat_id = %chat_id,
            message_id = %message_id,
            chars = message.text.len(),
            "Reply finalized"
        );
        Ok(message)
    }

    pub async fn get_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        self.store.get_messages(chat_id, limit, offset).await
    }

    // --- Deferred edits ---

    /// Stage a property edit; nothing changes until `submit_changes`.
    pub fn stage_edit(&self, edit: ChatEdit) {
        debug!(chat_id = %edit.chat_id(), ?edit, "Edit staged");
        self.lock_pending().push(edit);
    }

    /// Number of staged, unflushed edits.
    pub fn pending_edit_count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Flush the staged edit batch, applying edits in staging order.
    ///
    /// Edits targeting a chat that no longer exists are skipped with a
    /// warning. Returns the number of edits applied.
    pub async fn submit_changes(&self) -> Result<usize, StoreError> {
        let edits: Vec<ChatEdit> = self.lock_pending().drain(..).collect();
        let mut applied = 0;

        for edit in edits {
            let chat_id = edit.chat_id();
            let Some(mut chat) = self.store.get_chat(&chat_id).await? else {
                warn!(chat_id = %chat_id, "Staged edit targets a missing chat; skipping");
                continue;
            };

            match edit {
                ChatEdit::StreamingEnabled { enabled, .. } => chat.streaming_enabled = enabled,
                ChatEdit::Title { title, .. } => chat.title = Some(title),
            }

            self.store.update_chat(&chat).await?;
            applied += 1;
        }

        if applied > 0 {
            info!(applied, "Pending edits submitted");
        }
        Ok(applied)
    }

    /// Toggle the streaming flag for a chat through the deferred-edit path
    /// and return the updated chat.
    pub async fn set_streaming_enabled(
        &self,
        chat_id: &Uuid,
        enabled: bool,
    ) -> Result<Chat, StoreError> {
        self.stage_edit(ChatEdit::StreamingEnabled {
            chat_id: *chat_id,
            enabled,
        });
        self.submit_changes().await?;
        self.store
            .get_chat(chat_id)
            .await?
            .ok_or(StoreError::ChatNotFound)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<ChatEdit>> {
        // A poisoned guard still holds consistent data; recover it.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemStore;

    async fn service_with_chat() -> (ChatService<MemStore>, Chat) {
        let service = ChatService::new(MemStore::new());
        let chat = service
            .create_chat(None, "test-model".to_string())
            .await
            .unwrap();
        (service, chat)
    }

    #[tokio::test]
    async fn create_chat_registers_a_binding() {
        let (service, chat) = service_with_chat().await;
        let binding = service.binding(&chat.id).unwrap();
        assert_eq!(binding.chat_id(), chat.id);
        assert!(binding.is_empty());
    }

    #[tokio::test]
    async fn append_message_persists_and_mirrors_into_binding() {
        let (service, chat) = service_with_chat().await;
        let message = service
            .append_message(&chat.id, Sender::User, "hello".to_string())
            .await
            .unwrap();

        assert_eq!(message.position, 0);
        assert_eq!(service.binding(&chat.id).unwrap().len(), 1);
        assert_eq!(
            service.store().count_messages(&chat.id).await.unwrap(),
            1
        );
        let stored = service.get_chat(&chat.id).await.unwrap().unwrap();
        assert_eq!(stored.message_count, 1);
    }

    #[tokio::test]
    async fn delete_chat_invalidates_binding_and_removes_records() {
        let (service, chat) = service_with_chat().await;
        let binding = service.binding(&chat.id).unwrap();
        service
            .append_message(&chat.id, Sender::User, "doomed".to_string())
            .await
            .unwrap();

        service.delete_chat(&chat.id).await.unwrap();

        assert!(binding.is_closed());
        assert!(service.binding(&chat.id).is_err());
        assert!(service.get_chat(&chat.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn staged_edits_apply_only_on_submit() {
        let (service, chat) = service_with_chat().await;
        service.stage_edit(ChatEdit::StreamingEnabled {
            chat_id: chat.id,
            enabled: false,
        });
        service.stage_edit(ChatEdit::Title {
            chat_id: chat.id,
            title: "Renamed".to_string(),
        });
        assert_eq!(service.pending_edit_count(), 2);

        // Nothing applied yet.
        let stored = service.get_chat(&chat.id).await.unwrap().unwrap();
        assert!(stored.streaming_enabled);
        assert!(stored.title.is_none());

        let applied = service.submit_changes().await.unwrap();
        assert_eq!(applied, 2);
        assert_eq!(service.pending_edit_count(), 0);

        let stored = service.get_chat(&chat.id).await.unwrap().unwrap();
        assert!(!stored.streaming_enabled);
        assert_eq!(stored.title.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn submit_skips_edits_for_missing_chats() {
        let (service, chat) = service_with_chat().await;
        service.stage_edit(ChatEdit::StreamingEnabled {
            chat_id: Uuid::now_v7(),
            enabled: false,
        });
        service.stage_edit(ChatEdit::Title {
            chat_id: chat.id,
            title: "Kept".to_string(),
        });

        let applied = service.submit_changes().await.unwrap();
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn set_streaming_enabled_round_trips() {
        let (service, chat) = service_with_chat().await;
        let updated = service.set_streaming_enabled(&chat.id, false).await.unwrap();
        assert!(!updated.streaming_enabled);

        let updated = service.set_streaming_enabled(&chat.id, true).await.unwrap();
        assert!(updated.streaming_enabled);
    }

    #[tokio::test]
    async fn finalize_reply_stamps_metadata_and_persists() {
        let (service, chat) = service_with_chat().await;
        let reply = service
            .append_message(&chat.id, Sender::Assistant, String::new())
            .await
            .unwrap();

        let ctx = service.reply_context(&chat.id, reply.id).unwrap();
        ctx.append_text("streamed text").unwrap();

        let finalized = service
            .finalize_reply(&chat.id, reply.id, "test-model".to_string(), 123)
            .await
            .unwrap();
        assert_eq!(finalized.text, "streamed text");
        assert_eq!(finalized.model.as_deref(), Some("test-model"));
        assert_eq!(finalized.response_ms, Some(123));

        let stored = service
            .get_messages(&chat.id, None, None)
            .await
            .unwrap();
        assert_eq!(stored[0].text, "streamed text");
        assert_eq!(stored[0].response_ms, Some(123));
    }
}
