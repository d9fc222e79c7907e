//! Chat CRUD and SSE streaming endpoints.
//!
//! `POST /api/v1/chats/{id}/messages` streams the reply as Server-Sent
//! Events. The composer runs on its own task; this handler subscribes to
//! the chat's live binding and relays its change events, so the SSE client
//! observes exactly what a bound view would.
//!
//! SSE event types:
//! - `message` -- a message was appended: the full message record
//! - `text_delta` -- incremental reply text: `{ "text": "..." }`
//! - `done` -- reply complete: `{ "message_id": "..." }`
//! - `error` -- failure mid-stream: `{ "message": "..." }`

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Deserialize;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use confab_core::binding::ListEvent;
use confab_core::chat::composer::{ComposeSettings, MessageComposer, NewMessageParams};
use confab_core::stream::scroll::ScrollScheduler;
use confab_types::chat::{Chat, ChatMessage, Sender};
use confab_types::error::StoreError;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for chat creation.
#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
    /// Completion model; defaults to the configured model.
    pub model: Option<String>,
}

/// Request body for the streaming toggle.
#[derive(Debug, Deserialize)]
pub struct SetStreamingRequest {
    pub enabled: bool,
}

/// Request body for posting a message.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

/// Query parameters for message listing.
#[derive(Debug, Deserialize)]
pub struct MessagePage {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// POST /api/v1/chats -- create a chat.
pub async fn create_chat(
    State(state): State<AppState>,
    Json(body): Json<CreateChatRequest>,
) -> Result<Json<Chat>, AppError> {
    let model = body
        .model
        .unwrap_or_else(|| state.config.default_model.clone());
    let chat = state.chat_service.create_chat(body.title, model).await?;
    Ok(Json(chat))
}

/// GET /api/v1/chats -- list chats, newest first.
pub async fn list_chats(
    State(state): State<AppState>,
) -> Result<Json<Vec<Chat>>, AppError> {
    Ok(Json(state.chat_service.list_chats().await?))
}

/// GET /api/v1/chats/{id} -- fetch one chat.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Chat>, AppError> {
    let chat = state
        .chat_service
        .get_chat(&id)
        .await?
        .ok_or(StoreError::ChatNotFound)?;
    Ok(Json(chat))
}

/// DELETE /api/v1/chats/{id} -- delete a chat and its messages.
///
/// Any stream in flight against this chat observes a stale target.
pub async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, AppError> {
    state.chat_service.delete_chat(&id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// PUT /api/v1/chats/{id}/streaming -- toggle incremental streaming.
///
/// Goes through the deferred-edit path: stage, then flush.
pub async fn set_streaming(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetStreamingRequest>,
) -> Result<Json<Chat>, AppError> {
    let chat = state
        .chat_service
        .set_streaming_enabled(&id, body.enabled)
        .await?;
    Ok(Json(chat))
}

/// GET /api/v1/chats/{id}/messages -- list messages in append order.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<MessagePage>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let messages = state
        .chat_service
        .get_messages(&id, page.limit, page.offset)
        .await?;
    Ok(Json(messages))
}

/// POST /api/v1/chats/{id}/messages -- post a message, stream the reply.
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PostMessageRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message must be non-empty".to_string()));
    }
    // Subscribe before the composer starts so no event is missed.
    let binding = state.chat_service.binding(&id)?;
    let mut events = binding.subscribe();

    let service = Arc::clone(&state.chat_service);
    let provider = Arc::clone(&state.provider);
    let scroll = ScrollScheduler::new(Duration::from_millis(state.config.scroll_delay_ms));
    let settings = ComposeSettings {
        temperature: state.config.temperature,
        max_tokens: state.config.max_tokens,
    };
    let params = NewMessageParams {
        chat_id: id,
        text: body.message,
        sender: Sender::User,
    };

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let mut task = tokio::spawn(async move {
        let composer = MessageComposer::new(&service, &provider, scroll, settings, params)
            .with_cancellation(token);
        composer.create_message_and_completion().await
    });

    // Dropping the SSE stream (client disconnect) cancels the composer.
    let cancel_guard = cancel.drop_guard();

    let stream = async_stream::stream! {
        let _cancel_guard = cancel_guard;
        let mut composer_done = false;
        loop {
            tokio::select! {
                result = &mut task, if !composer_done => {
                    composer_done = true;
                    match result {
                        // Success: the Completed event is already queued on
                        // the binding channel; keep draining until it lands.
                        Ok(Ok(_)) => {}
                        Ok(Err(err)) => {
                            yield Ok(error_event(&err.to_string()));
                            break;
                        }
                        Err(_) => {
                            yield Ok(error_event("completion task failed"));
                            break;
                        }
                    }
                }
                event = events.recv() => {
                    match event {
                        Ok(ListEvent::Appended { message }) => {
                            yield Ok(json_event("message", serde_json::json!(message)));
                        }
                        Ok(ListEvent::TextDelta { delta, .. }) => {
                            yield Ok(json_event("text_delta", serde_json::json!({ "text": delta })));
                        }
                        Ok(ListEvent::Completed { message_id }) => {
                            yield Ok(json_event("done", serde_json::json!({ "message_id": message_id })));
                            break;
                        }
                        Ok(ListEvent::Invalidated) => {
                            yield Ok(error_event("chat was deleted"));
                            break;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn json_event(name: &str, body: serde_json::Value) -> Event {
    Event::default().event(name).data(body.to_string())
}

fn error_event(message: &str) -> Event {
    json_event("error", serde_json::json!({ "message": message }))
}
