//! In-memory retrieval index: useful for testing and ephemeral sessions.
//!
//! Documents live in a Vec in first-insertion order; re-indexing an id
//! replaces the entry in place, so ranking ties resolve by first insertion.

use std::sync::Arc;

use async_trait::async_trait;
use chatrecall_core::document::Document;
use chatrecall_core::error::IndexError;
use chatrecall_core::index::{Embedder, RetrievalIndex};
use tokio::sync::RwLock;
use tracing::debug;

use crate::vector::top_k;

struct StoredDocument {
    document: Document,
    embedding: Vec<f32>,
}

/// A retrieval index that keeps documents and their embeddings in memory.
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredDocument>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Look up a stored document by id.
    pub async fn get(&self, id: &str) -> Option<Document> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.document.id == id)
            .map(|e| e.document.clone())
    }
}

#[async_trait]
impl RetrievalIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn index(&self, document: &Document) -> Result<(), IndexError> {
        // Embed before taking the lock so readers are not blocked on the embedder.
        let embedding = self.embedder.embed_one(&document.text).await?;

        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.document.id == document.id) {
            Some(existing) => {
                existing.document = document.clone();
                existing.embedding = embedding;
                debug!(id = %document.id, "Replaced document");
            }
            None => {
                entries.push(StoredDocument {
                    document: document.clone(),
                    embedding,
                });
                debug!(id = %document.id, "Stored document");
            }
        }
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed_one(query).await?;

        let entries = self.entries.read().await;
        let ranked = top_k(
            entries.iter().map(|e| e.embedding.as_slice()),
            &query_embedding,
            k,
        );
        Ok(ranked
            .into_iter()
            .map(|(pos, _)| entries[pos].document.text.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.entries.read().await.len())
    }
}
