//! Wiring of the chat service from configuration.

use anyhow::Result;
use recruit_chat_core::chat::ChatService;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding;
use crate::llm;
use crate::sqlite_store::SqliteStore;

/// Open the database and build a [`ChatService`] with the configured
/// language model and, when enabled, the embedding provider.
pub async fn build_chat_service(config: &Config) -> Result<ChatService> {
    let store = SqliteStore::open(config).await?;
    let model = llm::create_chat_model(&config.llm)?;

    let mut service = ChatService::new(Arc::new(store), model, config.chat_settings());
    if let Some(embedder) = embedding::create_embedder(&config.embedding)? {
        service = service.with_embedder(embedder);
    }

    tracing::debug!(
        llm = %config.llm.provider,
        embedding = %config.embedding.provider,
        "chat service ready"
    );
    Ok(service)
}
