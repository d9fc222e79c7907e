//! ChatStore trait definition.
//!
//! Provides CRUD operations for chats and their messages. Implementations
//! live in confab-infra (the in-memory store; persistence is out of scope).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use confab_types::chat::{Chat, ChatMessage};
use confab_types::error::StoreError;
use uuid::Uuid;

/// Store port for chats and messages.
pub trait ChatStore: Send + Sync {
    /// Create a new chat record.
    fn create_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<Chat, StoreError>> + Send;

    /// Get a chat by its unique ID.
    fn get_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, StoreError>> + Send;

    /// Update an existing chat (title, streaming flag, counters).
    fn update_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// List all chats, newest first.
    fn list_chats(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, StoreError>> + Send;

    /// Delete a chat and its messages.
    fn delete_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Save a new message within a chat.
    ///
    /// Atomically increments the chat's `message_count`.
    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite an existing message (final streamed text plus metadata).
    fn update_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Get messages for a chat, ordered by position.
    fn get_messages(
        &self,
        chat_id: &Uuid,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, StoreError>> + Send;

    /// Total number of messages in a chat.
    fn count_messages(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u32, StoreError>> + Send;
}
