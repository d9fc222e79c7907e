//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use confab_core::chat::composer::ComposeError;
use confab_types::error::{StoreError, StreamError};
use confab_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Store-level errors.
    Store(StoreError),
    /// Streaming append protocol errors.
    Stream(StreamError),
    /// Completion provider errors.
    Llm(LlmError),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<StreamError> for AppError {
    fn from(e: StreamError) -> Self {
        AppError::Stream(e)
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Llm(e)
    }
}

impl From<ComposeError> for AppError {
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::EmptyMessage => {
                AppError::Validation("message must be non-empty".to_string())
            }
            ComposeError::Store(e) => AppError::Store(e),
            ComposeError::Stream(e) => AppError::Stream(e),
            ComposeError::Llm(e) => AppError::Llm(e),
            ComposeError::Cancelled => AppError::Internal("completion cancelled".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Store(StoreError::ChatNotFound) => (
                StatusCode::NOT_FOUND,
                "CHAT_NOT_FOUND",
                "Chat not found".to_string(),
            ),
            AppError::Store(StoreError::MessageNotFound) => (
                StatusCode::NOT_FOUND,
                "MESSAGE_NOT_FOUND",
                "Message not found".to_string(),
            ),
            AppError::Store(StoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Stream(StreamError::StaleTarget { .. }) => (
                StatusCode::GONE,
                "STALE_TARGET",
                "The reply target was deleted mid-stream".to_string(),
            ),
            AppError::Stream(e) => (
                StatusCode::CONFLICT,
                "STREAM_ERROR",
                e.to_string(),
            ),
            AppError::Llm(e) => (
                StatusCode::BAD_GATEWAY,
                "COMPLETION_FAILED",
                e.to_string(),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = json!({
            "data": null,
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
