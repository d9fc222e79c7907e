//! Live message-list binding with change broadcasting.
//!
//! `MessageListBinding` is the order-preserving collection a view binds to:
//! one per chat, holding that chat's messages and broadcasting granular
//! [`ListEvent`]s on every change. `ReplyContext` is the mutable-property
//! handle over a single message's text that the streaming appender writes
//! through.
//!
//! Built on `tokio::sync::broadcast`; publishing with no active subscribers
//! is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tokio::sync::broadcast;
use uuid::Uuid;

use confab_types::chat::ChatMessage;
use confab_types::error::StreamError;

/// Broadcast channel capacity per binding.
const EVENT_CAPACITY: usize = 256;

/// Change events emitted by a [`MessageListBinding`].
#[derive(Debug, Clone)]
pub enum ListEvent {
    /// A message was appended to the list.
    Appended { message: ChatMessage },

    /// Text was appended to an existing message (a streaming fragment).
    TextDelta {
        message_id: Uuid,
        position: u32,
        delta: String,
    },

    /// A streamed message reached its final form.
    Completed { message_id: Uuid },

    /// The binding's chat was deleted; the list is gone.
    Invalidated,
}

/// Order-preserving, observable message collection for one chat.
pub struct MessageListBinding {
    chat_id: Uuid,
    messages: RwLock<Vec<ChatMessage>>,
    events: broadcast::Sender<ListEvent>,
    closed: AtomicBool,
}

impl MessageListBinding {
    pub fn new(chat_id: Uuid) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            chat_id,
            messages: RwLock::new(Vec::new()),
            events,
            closed: AtomicBool::new(false),
        })
    }

    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    /// Create a new subscriber that will receive all future change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Whether the binding has been invalidated by chat deletion.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The position the next appended message will take.
    pub fn next_position(&self) -> u32 {
        self.read().len() as u32
    }

    /// A point-in-time copy of the message list, in append order.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.read().clone()
    }

    /// Append a message to the end of the list and notify observers.
    pub fn append(&self, message: ChatMessage) {
        {
            let mut messages = self.write();
            debug_assert_eq!(message.position as usize, messages.len());
            messages.push(message.clone());
        }
        let _ = self.events.send(ListEvent::Appended { message });
    }

    /// Append `delta` to the text of the message identified by `message_id`.
    ///
    /// The mutation and the position lookup happen under one write lock, so
    /// concurrent appends to different messages can never interleave within
    /// a single message's text. Fails with `StaleTarget` when the binding is
    /// closed or the message has been removed.
    pub fn append_text(&self, message_id: Uuid, delta: &str) -> Result<(), StreamError> {
        if self.is_closed() {
            return Err(StreamError::StaleTarget { message_id });
        }

        let position = {
            let mut messages = self.write();
            // Streamed replies are the newest entry; search from the tail.
            let Some(message) = messages.iter_mut().rev().find(|m| m.id == message_id) else {
                return Err(StreamError::StaleTarget { message_id });
            };
            message.text.push_str(delta);
            message.position
        };

        let _ = self.events.send(ListEvent::TextDelta {
            message_id,
            position,
            delta: delta.to_string(),
        });
        Ok(())
    }

    /// Current text of the message identified by `message_id`.
    pub fn text(&self, message_id: Uuid) -> Result<String, StreamError> {
        if self.is_closed() {
            return Err(StreamError::StaleTarget { message_id });
        }
        self.read()
            .iter()
            .rev()
            .find(|m| m.id == message_id)
            .map(|m| m.text.clone())
            .ok_or(StreamError::StaleTarget { message_id })
    }

    /// Overwrite a message's metadata fields after its stream completed,
    /// then notify observers that the message is final.
    pub fn mark_completed(
        &self,
        message_id: Uuid,
        model: Option<String>,
        response_ms: Option<u64>,
    ) -> Result<ChatMessage, StreamError> {
        let message = {
            let mut messages = self.write();
            let Some(message) = messages.iter_mut().rev().find(|m| m.id == message_id) else {
                return Err(StreamError::StaleTarget { message_id });
            };
            message.model = model;
            message.response_ms = response_ms;
            message.clone()
        };
        let _ = self.events.send(ListEvent::Completed { message_id });
        Ok(message)
    }

    /// Remove a single message from the list.
    ///
    /// Any `ReplyContext` targeting it observes `StaleTarget` afterwards.
    /// Returns whether the message was present.
    pub fn remove(&self, message_id: Uuid) -> bool {
        let mut messages = self.write();
        let before = messages.len();
        messages.retain(|m| m.id != message_id);
        messages.len() != before
    }

    /// Invalidate the binding: the chat was deleted.
    ///
    /// All subsequent property access fails with `StaleTarget`, and
    /// observers receive a final `Invalidated` event.
    pub fn invalidate(&self) {
        self.closed.store(true, Ordering::Release);
        let _ = self.events.send(ListEvent::Invalidated);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<ChatMessage>> {
        // A poisoned guard still holds consistent data; recover it.
        self.messages.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<ChatMessage>> {
        self.messages.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for MessageListBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageListBinding")
            .field("chat_id", &self.chat_id)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Mutable-property handle over one in-progress reply message.
///
/// Holds the binding weakly: if the chat is deleted (binding dropped or
/// invalidated) or the message removed, every access fails with
/// [`StreamError::StaleTarget`].
#[derive(Clone)]
pub struct ReplyContext {
    binding: Weak<MessageListBinding>,
    message_id: Uuid,
}

impl ReplyContext {
    pub fn new(binding: &Arc<MessageListBinding>, message_id: Uuid) -> Self {
        Self {
            binding: Arc::downgrade(binding),
            message_id,
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    /// Current text of the target message.
    pub fn text(&self) -> Result<String, StreamError> {
        self.upgrade()?.text(self.message_id)
    }

    /// Append `delta` to the target message's text.
    pub fn append_text(&self, delta: &str) -> Result<(), StreamError> {
        self.upgrade()?.append_text(self.message_id, delta)
    }

    fn upgrade(&self) -> Result<Arc<MessageListBinding>, StreamError> {
        self.binding.upgrade().ok_or(StreamError::StaleTarget {
            message_id: self.message_id,
        })
    }
}

impl std::fmt::Debug for ReplyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyContext")
            .field("message_id", &self.message_id)
            .field("stale", &self.binding.upgrade().is_none())
            .finish()
    }
}
