use thiserror::Error;
use uuid::Uuid;

/// Errors from the streaming append protocol.
///
/// A stale target latches the session: after the first `StaleTarget`, every
/// further fragment for that session fails with `SessionAborted` and the
/// record is never touched again.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stale target: message {message_id} is no longer bound")]
    StaleTarget { message_id: Uuid },

    #[error("session aborted after stale target")]
    SessionAborted,
}

/// Errors from chat store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat not found")]
    ChatNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_display() {
        let id = Uuid::now_v7();
        let err = StreamError::StaleTarget { message_id: id };
        assert!(err.to_string().contains(&id.to_string()));
        assert_eq!(
            StreamError::SessionAborted.to_string(),
            "session aborted after stale target"
        );
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict("duplicate position".to_string());
        assert_eq!(err.to_string(), "conflict: duplicate position");
    }
}
