//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat CRUD
        .route("/chats", post(handlers::chat::create_chat))
        .route("/chats", get(handlers::chat::list_chats))
        .route("/chats/{id}", get(handlers::chat::get_chat))
        .route("/chats/{id}", delete(handlers::chat::delete_chat))
        // Deferred streaming toggle
        .route("/chats/{id}/streaming", put(handlers::chat::set_streaming))
        // Messages
        .route("/chats/{id}/messages", get(handlers::chat::get_messages))
        .route("/chats/{id}/messages", post(handlers::chat::post_message));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
