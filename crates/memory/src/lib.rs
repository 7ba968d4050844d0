//! Retrieval index implementations for ChatRecall.
//!
//! - [`InMemoryIndex`]: cosine similarity over vectors held in memory
//! - [`QdrantIndex`]: a Qdrant collection over REST
//! - [`HashingEmbedder`]: an offline embedder for the in-memory backend and tests

pub mod hashing;
pub mod in_memory;
pub mod qdrant;
pub mod vector;

use std::sync::Arc;

use chatrecall_config::StoreConfig;
use chatrecall_core::index::{Embedder, RetrievalIndex};

pub use hashing::HashingEmbedder;
pub use in_memory::InMemoryIndex;
pub use qdrant::QdrantIndex;
pub use vector::{cosine_similarity, top_k};

/// Build the configured retrieval index on top of `embedder`.
pub fn build_index(config: &StoreConfig, embedder: Arc<dyn Embedder>) -> Arc<dyn RetrievalIndex> {
    match config.backend.as_str() {
        "memory" => Arc::new(InMemoryIndex::new(embedder)),
        _ => Arc::new(QdrantIndex::new(
            &config.url,
            config.api_key.clone(),
            &config.collection,
            embedder,
        )),
    }
}
