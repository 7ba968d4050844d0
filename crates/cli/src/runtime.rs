//! Wiring from [`AppConfig`] to the running core.
//!
//! Every command that touches the conversation core builds a [`Runtime`]
//! first, so `run`, `chat`, `ask` and `remember` share one composition.

use std::sync::Arc;

use chatrecall_agent::{ConversationStore, DocumentAssembler, OrchestratorConfig, QueryOrchestrator};
use chatrecall_channels::{CommandRouter, Dispatcher};
use chatrecall_config::AppConfig;
use chatrecall_core::channel::Channel;
use chatrecall_core::index::{Embedder, RetrievalIndex};
use chatrecall_core::provider::Provider;
use chatrecall_memory::HashingEmbedder;
use chatrecall_providers::ProviderEmbedder;
use tracing::{info, warn};

pub struct Runtime {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub index: Arc<dyn RetrievalIndex>,
    pub assembler: Arc<DocumentAssembler>,
    pub orchestrator: Arc<QueryOrchestrator>,
}

impl Runtime {
    pub fn from_config(config: AppConfig) -> Self {
        let provider = chatrecall_providers::build_from_config(&config);
        Self::with_provider(config, provider)
    }

    /// Build everything around an already constructed provider.
    pub fn with_provider(config: AppConfig, provider: Arc<dyn Provider>) -> Self {
        let embedder = build_embedder(&config, provider.clone());
        let index = chatrecall_memory::build_index(&config.store, embedder);
        let store = Arc::new(ConversationStore::new(config.bot.history_size));

        let assembler = Arc::new(DocumentAssembler::new(store.clone(), index.clone()));
        let mut orchestrator = QueryOrchestrator::new(
            store,
            index.clone(),
            provider.clone(),
            OrchestratorConfig::from_app_config(&config),
        );
        if let Some(search) = chatrecall_providers::build_web_search(&config) {
            orchestrator = orchestrator.with_web_search(search);
        }

        info!(
            provider = %provider.name(),
            store = %index.name(),
            history_size = config.bot.history_size,
            top_k = config.bot.top_k,
            "Runtime ready"
        );

        Self {
            config,
            provider,
            index,
            assembler,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Route every message from `channel` until it closes or Ctrl+C, then
    /// drain in-flight work and flush pending documents.
    pub async fn serve(&self, channel: Arc<dyn Channel>) -> Result<(), Box<dyn std::error::Error>> {
        let router = CommandRouter::from_config(
            &self.config,
            self.assembler.clone(),
            self.orchestrator.clone(),
            channel.clone(),
        );
        let mut dispatcher = Dispatcher::new(Arc::new(router));
        let mut inbound = channel.start().await?;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                item = inbound.recv() => match item {
                    Some(Ok(message)) => dispatcher.dispatch(message),
                    Some(Err(e)) => warn!(channel = %channel.name(), error = %e, "Channel error"),
                    None => break,
                },
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Err(e) = channel.stop().await {
            warn!(channel = %channel.name(), error = %e, "Channel did not stop cleanly");
        }
        dispatcher.shutdown().await;

        match self.assembler.flush_all().await {
            Ok(flushed) => info!(documents = flushed, "Pending documents flushed"),
            Err(e) => warn!(error = %e, "Some pending documents could not be indexed"),
        }
        Ok(())
    }
}

/// The memory backend falls back to the offline hashing embedder when no
/// API key is configured; everything else embeds through the provider.
fn build_embedder(config: &AppConfig, provider: Arc<dyn Provider>) -> Arc<dyn Embedder> {
    if config.store.backend == "memory" && config.provider.api_key.is_none() {
        warn!("No API key configured, using the offline hashing embedder");
        return Arc::new(HashingEmbedder::new(config.store.vector_size));
    }
    Arc::new(ProviderEmbedder::new(
        provider,
        &config.provider.embedding_model,
        config.store.vector_size,
    ))
}
