//! Incremental materialization of a streamed reply into a bound message.
//!
//! `StreamingAppender` owns one streaming session: fragments arrive from
//! the completion transport and are applied, in arrival order, to the reply
//! message behind a [`ReplyContext`]. Each applied fragment triggers a
//! fire-and-forget scroll request. A stale target (chat deleted, message
//! removed) aborts the session permanently.
//!
//! Fragments are not deduplicated: delivering the same fragment twice
//! appends it twice. Exactly one appender may target a given reply record
//! at a time; that single-writer obligation sits with the orchestrator.

use tracing::{debug, warn};

use confab_types::error::StreamError;

use crate::binding::ReplyContext;
use crate::stream::scroll::ScrollScheduler;

/// Applies streamed text fragments to a reply record in arrival order.
pub struct StreamingAppender {
    reply: ReplyContext,
    scroll: ScrollScheduler,
    applied: usize,
    aborted: bool,
}

impl StreamingAppender {
    pub fn new(reply: ReplyContext, scroll: ScrollScheduler) -> Self {
        Self {
            reply,
            scroll,
            applied: 0,
            aborted: false,
        }
    }

    /// Apply one fragment.
    ///
    /// Empty fragments are ignored: no mutation, no scroll request. A
    /// non-empty fragment is appended to the reply text synchronously
    /// (fragments can never interleave or reorder) and then a scroll is
    /// requested. Returns the number of fragments applied so far.
    ///
    /// # Errors
    ///
    /// `StaleTarget` when the reply record is no longer bound; the session
    /// latches aborted and every later call returns `SessionAborted`.
    pub fn on_fragment(&mut self, chunk: &str) -> Result<usize, StreamError> {
        if self.aborted {
            return Err(StreamError::SessionAborted);
        }
        if chunk.is_empty() {
            debug!(message_id = %self.reply.message_id(), "Skipping empty fragment");
            return Ok(self.applied);
        }

        if let Err(err) = self.reply.append_text(chunk) {
            warn!(
                message_id = %self.reply.message_id(),
                applied = self.applied,
                "Streaming target went stale; aborting session"
            );
            self.aborted = true;
            return Err(err);
        }

        self.applied += 1;
        self.scroll.request();
        Ok(self.applied)
    }

    /// Number of fragments applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Whether the session has latched into the aborted state.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Freeze the reply and end the session.
    ///
    /// Consuming the appender is what makes the record immutable: no handle
    /// remains to mutate it. Persisting the final record is the
    /// orchestrator's job. Returns the applied-fragment count.
    pub fn finish(self) -> usize {
        debug!(
            message_id = %self.reply.message_id(),
            applied = self.applied,
            aborted = self.aborted,
            "Streaming session finished"
        );
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    use confab_types::chat::{ChatMessage, Sender};

    use crate::binding::MessageListBinding;

    fn fresh_reply(binding: &Arc<MessageListBinding>) -> ReplyContext {
        let message = ChatMessage {
            id: Uuid::now_v7(),
            chat_id: binding.chat_id(),
            sender: Sender::Assistant,
            text: String::new(),
            position: binding.next_position(),
            created_at: Utc::now(),
            model: None,
            response_ms: None,
        };
        let id = message.id;
        binding.append(message);
        ReplyContext::new(binding, id)
    }

    #[test]
    fn fragments_concatenate_in_arrival_order() {
        let binding = MessageListBinding::new(Uuid::now_v7());
        let reply = fresh_reply(&binding);
        let scroll = ScrollScheduler::immediate();
        let mut appender = StreamingAppender::new(reply.clone(), scroll.clone());

        for chunk in ["Hel", "lo, ", "world!"] {
            appender.on_fragment(chunk).unwrap();
        }

        assert_eq!(reply.text().unwrap(), "Hello, world!");
        assert_eq!(scroll.request_count(), 3);
        assert_eq!(appender.finish(), 3);
    }

    #[test]
    fn empty_fragment_is_a_no_op_without_scroll() {
        let binding = MessageListBinding::new(Uuid::now_v7());
        let reply = fresh_reply(&binding);
        let scroll = ScrollScheduler::immediate();
        let mut appender = StreamingAppender::new(reply.clone(), scroll.clone());

        appender.on_fragment("A").unwrap();
        appender.on_fragment("").unwrap();
        appender.on_fragment("B").unwrap();

        assert_eq!(reply.text().unwrap(), "AB");
        assert_eq!(scroll.request_count(), 2);
        assert_eq!(appender.applied(), 2);
    }

    #[test]
    fn stale_target_aborts_and_later_fragments_never_apply() {
        let binding = MessageListBinding::new(Uuid::now_v7());
        let reply = fresh_reply(&binding);
        let scroll = ScrollScheduler::immediate();
        let mut appender = StreamingAppender::new(reply.clone(), scroll);

        appender.on_fragment("one ").unwrap();
        appender.on_fragment("two").unwrap();

        // The record disappears between fragments 2 and 3.
        assert!(binding.remove(reply.message_id()));

        assert!(matches!(
            appender.on_fragment(" three"),
            Err(StreamError::StaleTarget { .. })
        ));
        assert!(appender.is_aborted());
        assert!(matches!(
            appender.on_fragment(" four"),
            Err(StreamError::SessionAborted)
        ));
        assert_eq!(appender.applied(), 2);
    }

    #[test]
    fn chat_deletion_mid_stream_surfaces_as_stale() {
        let binding = MessageListBinding::new(Uuid::now_v7());
        let reply = fresh_reply(&binding);
        let mut appender = StreamingAppender::new(reply, ScrollScheduler::immediate());

        appender.on_fragment("partial").unwrap();
        binding.invalidate();

        assert!(matches!(
            appender.on_fragment("more"),
            Err(StreamError::StaleTarget { .. })
        ));
    }

    #[test]
    fn redelivered_fragment_duplicates_text() {
        // Fragments are not deduplicated; redelivery is visible by design.
        let binding = MessageListBinding::new(Uuid::now_v7());
        let reply = fresh_reply(&binding);
        let mut appender = StreamingAppender::new(reply.clone(), ScrollScheduler::immediate());

        appender.on_fragment("echo ").unwrap();
        appender.on_fragment("echo ").unwrap();

        assert_eq!(reply.text().unwrap(), "echo echo ");
        assert_eq!(appender.applied(), 2);
    }

    #[test]
    fn timing_gaps_do_not_affect_final_text() {
        let binding = MessageListBinding::new(Uuid::now_v7());
        let reply = fresh_reply(&binding);
        let mut appender = StreamingAppender::new(reply.clone(), ScrollScheduler::immediate());

        // Arrival order is all that matters; apply with arbitrary pauses
        // between deliveries.
        appender.on_fragment("a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        appender.on_fragment("b").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1));
        appender.on_fragment("c").unwrap();

        assert_eq!(reply.text().unwrap(), "abc");
    }
}
