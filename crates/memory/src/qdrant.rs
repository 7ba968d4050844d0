//! Qdrant retrieval index over the REST API.
//!
//! Documents are stored as points in a single collection. Point ids are
//! UUIDv5 digests of the document id, so re-indexing the same document
//! overwrites its point. The collection is created on first use with
//! cosine distance.
//!
//! The index never retries: transport failures surface as
//! [`IndexError::StoreUnavailable`] and non-2xx responses as
//! [`IndexError::Rejected`].

use std::sync::Arc;

use async_trait::async_trait;
use chatrecall_core::document::Document;
use chatrecall_core::error::IndexError;
use chatrecall_core::index::{Embedder, RetrievalIndex};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct QdrantIndex {
    base_url: String,
    api_key: Option<String>,
    collection: String,
    embedder: Arc<dyn Embedder>,
    client: reqwest::Client,
    collection_ready: OnceCell<()>,
}

impl QdrantIndex {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        collection: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            collection: collection.into(),
            embedder,
            client,
            collection_ready: OnceCell::new(),
        }
    }

    /// Point id for a document id.
    pub fn point_id(document_id: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, document_id.as_bytes())
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    fn point_body(document: &Document, vector: Vec<f32>) -> serde_json::Value {
        serde_json::json!({
            "points": [{
                "id": Self::point_id(&document.id).to_string(),
                "vector": vector,
                "payload": {
                    "doc_id": document.id,
                    "text": document.text,
                    "author": document.author,
                    "timestamp": document.timestamp.to_rfc3339(),
                },
            }]
        })
    }

    fn search_body(vector: Vec<f32>, k: usize) -> serde_json::Value {
        serde_json::json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, IndexError> {
        let request = match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| IndexError::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Qdrant rejected request");
            return Err(IndexError::Rejected {
                status_code: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, IndexError> {
        let response = self.send(request).await?;
        let envelope: QdrantResponse<T> = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;
        Ok(envelope.result)
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), IndexError> {
        self.collection_ready
            .get_or_try_init(|| async {
                let exists: ExistsResult = self
                    .send_json(self.client.get(self.collection_url("/exists")))
                    .await?;
                if exists.exists {
                    debug!(collection = %self.collection, "Collection exists");
                    return Ok(());
                }

                let body = serde_json::json!({
                    "vectors": {
                        "size": self.embedder.dimensions(),
                        "distance": "Cosine",
                    }
                });
                self.send(self.client.put(self.collection_url("")).json(&body))
                    .await?;
                info!(
                    collection = %self.collection,
                    size = self.embedder.dimensions(),
                    "Created collection"
                );
                Ok::<(), IndexError>(())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl RetrievalIndex for QdrantIndex {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn index(&self, document: &Document) -> Result<(), IndexError> {
        self.ensure_collection().await?;
        let vector = self.embedder.embed_one(&document.text).await?;

        let body = Self::point_body(document, vector);
        self.send(
            self.client
                .put(self.collection_url("/points?wait=true"))
                .json(&body),
        )
        .await?;

        debug!(id = %document.id, "Upserted point");
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        self.ensure_collection().await?;
        let vector = self.embedder.embed_one(query).await?;

        let hits: Vec<ScoredPoint> = self
            .send_json(
                self.client
                    .post(self.collection_url("/points/search"))
                    .json(&Self::search_body(vector, k)),
            )
            .await?;

        Ok(hits.into_iter().filter_map(ScoredPoint::into_text).collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        self.ensure_collection().await?;
        let result: CountResult = self
            .send_json(
                self.client
                    .post(self.collection_url("/points/count"))
                    .json(&serde_json::json!({ "exact": true })),
            )
            .await?;
        Ok(result.count)
    }

    async fn health_check(&self) -> Result<bool, IndexError> {
        match self.send(self.client.get(format!("{}/collections", self.base_url))).await {
            Ok(_) => Ok(true),
            Err(IndexError::Rejected { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// --- Qdrant API types (internal) ---

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ScoredPoint {
    fn into_text(self) -> Option<String> {
        let text = self
            .payload
            .as_ref()
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(String::from);
        if text.is_none() {
            warn!(score = self.score, "Search hit without text payload");
        }
        text
    }
}
