//! Completion provider port.
//!
//! Implementations live in confab-infra. Uses native async fn in traits
//! (RPITIT); `stream` returns a boxed stream because the events outlive
//! the call.

use std::pin::Pin;

use futures_util::Stream;

use confab_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// A boxed stream of completion events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Port for a remote completion service.
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name for logging.
    fn name(&self) -> &str;

    /// Send a completion request and await the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request.
    ///
    /// The returned stream yields events in transport order; text fragments
    /// must be consumed without reordering.
    fn stream(&self, request: CompletionRequest) -> EventStream;
}
