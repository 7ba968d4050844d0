//! Error types for the ChatRecall domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; the top-level [`Error`] tags
//! them with the pipeline step that failed without rewriting the cause.

use thiserror::Error;

/// The top-level error type for ChatRecall operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `search` against the retrieval index failed while answering a query.
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(#[source] IndexError),

    /// Indexing a document (flush, remember, or answer record) failed.
    #[error("Indexing failed: {0}")]
    IndexingFailed(#[source] IndexError),

    /// The generation service failed; nothing was recorded for the answer.
    #[error("Generation failed: {0}")]
    GenerationFailed(#[source] ProviderError),

    #[error("Web search failed: {0}")]
    WebSearchFailed(#[source] SearchError),
}

impl Error {
    /// Whether the root cause is an unreachable vector store.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            Error::RetrievalFailed(IndexError::StoreUnavailable(_))
                | Error::IndexingFailed(IndexError::StoreUnavailable(_))
        )
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Vector store rejected request: {message} (status: {status_code})")]
    Rejected { status_code: u16, message: String },

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Malformed store response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for IndexError {
    fn from(err: ProviderError) -> Self {
        IndexError::EmbeddingFailed(err.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Web search not configured: {0}")]
    NotConfigured(String),

    #[error("Search API failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid update payload: {0}")]
    InvalidPayload(String),
}
