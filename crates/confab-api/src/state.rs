//! Application state wiring all services together.
//!
//! `AppState` holds the concrete service instances used by both the CLI
//! and the REST API. Services are generic over store traits, but AppState
//! pins them to the concrete infra implementations.

use std::sync::Arc;

use secrecy::SecretString;

use confab_core::chat::service::ChatService;
use confab_core::llm::box_provider::BoxCompletionProvider;
use confab_infra::config::{data_dir, load_global_config};
use confab_infra::llm::OpenAiCompatProvider;
use confab_infra::store::MemoryChatStore;
use confab_types::config::GlobalConfig;

/// Concrete service type pinned to the in-memory store.
pub type ConcreteChatService = ChatService<MemoryChatStore>;

/// Shared application state used by CLI commands and REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub provider: Arc<BoxCompletionProvider>,
    pub config: GlobalConfig,
}

impl AppState {
    /// Initialize the application state: load config, wire the provider
    /// and services.
    pub async fn init() -> anyhow::Result<Self> {
        let config = load_global_config(&data_dir()).await;

        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!(
                "{} is not set. Export your provider API key first.",
                config.api_key_env
            )
        })?;
        let provider = OpenAiCompatProvider::new(
            SecretString::from(api_key),
            config.base_url.as_deref(),
        );

        Ok(Self {
            chat_service: Arc::new(ChatService::new(MemoryChatStore::new())),
            provider: Arc::new(BoxCompletionProvider::new(provider)),
            config,
        })
    }
}
