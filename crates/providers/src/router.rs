//! Builds the configured collaborators: the generation provider and the
//! web search backend.

use std::sync::Arc;

use chatrecall_config::AppConfig;
use chatrecall_core::provider::Provider;
use chatrecall_core::search::WebSearch;
use tracing::{info, warn};

use crate::duckduckgo::DuckDuckGoSearch;
use crate::google::GoogleSearch;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the generation provider from configuration.
///
/// Every supported backend speaks the OpenAI-compatible protocol; the
/// provider name only selects the default base URL.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let provider_config = &config.provider;
    let base_url = provider_config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&provider_config.name));
    let api_key = provider_config.api_key.clone().unwrap_or_default();

    if api_key.is_empty() && provider_config.name != "ollama" {
        warn!(provider = %provider_config.name, "No API key configured");
    }

    Arc::new(OpenAiCompatProvider::new(
        &provider_config.name,
        &base_url,
        &api_key,
    ))
}

/// Build the web search backend, or `None` when disabled or incomplete.
pub fn build_web_search(config: &AppConfig) -> Option<Arc<dyn WebSearch>> {
    let search = &config.web_search;
    match search.backend.as_str() {
        "duckduckgo" => Some(Arc::new(DuckDuckGoSearch::new(&search.region))),
        "google" => match (&search.api_key, &search.engine_id) {
            (Some(key), Some(cx)) => Some(Arc::new(GoogleSearch::new(key, cx))),
            _ => {
                warn!("Google search needs GOOGLE_API_KEY and SEARCH_ENGINE; web search disabled");
                None
            }
        },
        other => {
            info!(backend = other, "Web search disabled");
            None
        }
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "together" => "https://api.together.xyz/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
