//! REST API server.

pub mod error;
pub mod handlers;
pub mod router;

use tracing::info;

use crate::state::AppState;

/// Bind and serve the REST API until shutdown.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = router::build_router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(%host, port, "REST API listening");
    axum::serve(listener, router).await?;
    Ok(())
}
