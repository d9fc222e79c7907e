//! In-memory chat store.
//!
//! Implements `ChatStore` from `confab-core` over dashmap. This is the only
//! store: chats live for the process lifetime and vanish on exit.
//! Per-chat message vectors keep append order, so `position` ordering falls
//! out of insertion.

use dashmap::DashMap;
use uuid::Uuid;

use confab_core::chat::store::ChatStore;
use confab_types::chat::{Chat, ChatMessage};
use confab_types::error::StoreError;

/// Dashmap-backed implementation of `ChatStore`.
#[derive(Default)]
pub struct MemoryChatStore {
    chats: DashMap<Uuid, Chat>,
    messages: DashMap<Uuid, Vec<ChatMessage>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatStore for MemoryChatStore {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, StoreError> {
        if self.chats.contains_key(&chat.id) {
            return Err(StoreError::Conflict(format!(
                "chat {} already exists",
                chat.id
            )));
        }
        self.chats.insert(chat.id, chat.clone());
        self.messages.insert(chat.id, Vec::new());
        Ok(chat.clone())
    }

    async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<Chat>, StoreError> {
        Ok(self.chats.get(chat_id).map(|entry| entry.value().clone()))
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        let Some(mut entry) = self.chats.get_mut(&chat.id) else {
            return Err(StoreError::ChatNotFound);
        };
        *entry.value_mut() = chat.clone();
        Ok(())
    }

    async fn list_chats(&self) -> Result<Vec<Chat>, StoreError> {
        let mut chats: Vec<Chat> = self
            .chats
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        // UUIDv7 ids are time-ordered; newest first.
        chats.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(chats)
    }

    async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), StoreError> {
        if self.chats.remove(chat_id).is_none() {
            return Err(StoreError::ChatNotFound);
        }
        self.messages.remove(chat_id);
        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let Some(mut chat) = self.chats.get_mut(&message.chat_id) else {
            return Err(StoreError::ChatNotFound);
        };
        chat.message_count += 1;

        self.messages
            .entry(message.chat_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn update_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let Some(mut messages) = self.messages.get_mut(&message.chat_id) else {
            return Err(StoreError::ChatNotFound);
        };
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
        let Some(messages) = self.messages.get(chat_id) else {
            return Err(StoreError::ChatNotFound);
        };
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(usize::MAX);
        Ok(messages
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_messages(&self, chat_id: &Uuid) -> Result<u32, StoreError> {
        let Some(messages) = self.messages.get(chat_id) else {
            return Err(StoreError::ChatNotFound);
        };
        Ok(messages.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use confab_types::chat::Sender;

    fn chat() -> Chat {
        Chat {
            id: Uuid::now_v7(),
            title: None,
            created_at: Utc::now(),
            streaming_enabled: true,
            message_count: 0,
            model: "test-model".to_string(),
        }
    }

    fn message(chat_id: Uuid, position: u32, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            chat_id,
            sender: Sender::User,
            text: text.to_string(),
            position,
            created_at: Utc::now(),
            model: None,
            response_ms: None,
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let store = MemoryChatStore::new();
        let created = store.create_chat(&chat()).await.unwrap();
        let loaded = store.get_chat(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, created.id);
    }

    #[tokio::test]
    async fn create_duplicate_is_a_conflict() {
        let store = MemoryChatStore::new();
        let c = chat();
        store.create_chat(&c).await.unwrap();
        assert!(matches!(
            store.create_chat(&c).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn list_chats_newest_first() {
        let store = MemoryChatStore::new();
        let first = store.create_chat(&chat()).await.unwrap();
        let second = store.create_chat(&chat()).await.unwrap();

        let chats = store.list_chats().await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, second.id);
        assert_eq!(chats[1].id, first.id);
    }

    #[tokio::test]
    async fn save_message_increments_count_and_keeps_order() {
        let store = MemoryChatStore::new();
        let c = store.create_chat(&chat()).await.unwrap();

        store.save_message(&message(c.id, 0, "one")).await.unwrap();
        store.save_message(&message(c.id, 1, "two")).await.unwrap();

        let loaded = store.get_chat(&c.id).await.unwrap().unwrap();
        assert_eq!(loaded.message_count, 2);

        let messages = store.get_messages(&c.id, None, None).await.unwrap();
        assert_eq!(messages[0].text, "one");
        assert_eq!(messages[1].text, "two");
        assert_eq!(store.count_messages(&c.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn get_messages_respects_limit_and_offset() {
        let store = MemoryChatStore::new();
        let c = store.create_chat(&chat()).await.unwrap();
        for (i, text) in ["a", "b", "c", "d"].iter().enumerate() {
            store
                .save_message(&message(c.id, i as u32, text))
                .await
                .unwrap();
        }

        let page = store.get_messages(&c.id, Some(2), Some(1)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].text, "b");
        assert_eq!(page[1].text, "c");
    }

    #[tokio::test]
    async fn delete_chat_removes_messages_too() {
        let store = MemoryChatStore::new();
        let c = store.create_chat(&chat()).await.unwrap();
        store.save_message(&message(c.id, 0, "gone")).await.unwrap();

        store.delete_chat(&c.id).await.unwrap();
        assert!(store.get_chat(&c.id).await.unwrap().is_none());
        assert!(matches!(
            store.get_messages(&c.id, None, None).await,
            Err(StoreError::ChatNotFound)
        ));
        assert!(matches!(
            store.delete_chat(&c.id).await,
            Err(StoreError::ChatNotFound)
        ));
    }

    #[tokio::test]
    async fn update_message_overwrites_final_text() {
        let store = MemoryChatStore::new();
        let c = store.create_chat(&chat()).await.unwrap();
        let mut m = message(c.id, 0, "");
        store.save_message(&m).await.unwrap();

        m.text = "final".to_string();
        m.response_ms = Some(99);
        store.update_message(&m).await.unwrap();

        let messages = store.get_messages(&c.id, None, None).await.unwrap();
        assert_eq!(messages[0].text, "final");
        assert_eq!(messages[0].response_ms, Some(99));
    }
}
