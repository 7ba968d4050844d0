//! Provider-backed embedder.
//!
//! Adapts any [`Provider`] with an embeddings endpoint to the [`Embedder`]
//! trait the retrieval indexes consume.

use std::sync::Arc;

use async_trait::async_trait;
use chatrecall_core::error::ProviderError;
use chatrecall_core::index::Embedder;
use chatrecall_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimensions: usize,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await?;

        if response.embeddings.len() != texts.len() {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            });
        }

        if let Some(bad) = response.embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!(
                    "model '{}' returned {}-dimensional vectors, expected {}",
                    self.model,
                    bad.len(),
                    self.dimensions
                ),
            });
        }

        debug!(model = %self.model, count = texts.len(), "Embedded texts");
        Ok(response.embeddings)
    }
}
