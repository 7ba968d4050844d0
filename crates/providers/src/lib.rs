//! Collaborator implementations for ChatRecall: the generation provider,
//! provider-backed embeddings, and web search backends.
//!
//! The router builds the configured instances from `AppConfig`.

pub mod duckduckgo;
pub mod embedder;
pub mod google;
pub mod openai_compat;
pub mod router;

pub use duckduckgo::DuckDuckGoSearch;
pub use embedder::ProviderEmbedder;
pub use google::GoogleSearch;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, build_web_search};
