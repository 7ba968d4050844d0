//! Retrieval index: the long-term semantic memory.
//!
//! The index is consumed through two operations only:
//! - `index(document)`: upsert by document id (re-indexing replaces)
//! - `search(query, k)`: up to `k` texts, most similar first
//!
//! Ranking ties must resolve deterministically for a fixed index state; the
//! exact tie-break rule belongs to the implementation. Implementations never
//! retry: an unreachable store is reported as [`IndexError::StoreUnavailable`].

use async_trait::async_trait;

use crate::document::Document;
use crate::error::{IndexError, ProviderError};

/// The core RetrievalIndex trait.
///
/// Implementations: in-memory (cosine over local vectors), Qdrant.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// The backend name (e.g., "memory", "qdrant").
    fn name(&self) -> &str;

    /// Insert or replace the document stored under `document.id`.
    async fn index(&self, document: &Document) -> Result<(), IndexError>;

    /// The `k` most similar stored texts, in descending similarity.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, IndexError>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize, IndexError>;

    /// Health check: is the store reachable?
    async fn health_check(&self) -> Result<bool, IndexError> {
        Ok(true)
    }
}

/// Turns texts into vectors for an index.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Vector dimensionality produced by this embedder.
    fn dimensions(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "embedding response contained no vectors".into(),
            })
    }
}
