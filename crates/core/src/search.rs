//! Web search trait: ranked snippets from the open web.
//!
//! Used by the web-search variant of the query pipeline in place of memory
//! retrieval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// One ranked web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl WebResult {
    /// Single-line rendering used inside generation prompts.
    pub fn render(&self) -> String {
        match (self.title.is_empty(), self.url.is_empty()) {
            (false, false) => format!("{} ({}): {}", self.title, self.url, self.snippet),
            (true, false) => format!("{}: {}", self.url, self.snippet),
            _ => self.snippet.clone(),
        }
    }
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Backend name (e.g., "duckduckgo", "google").
    fn name(&self) -> &str;

    /// Up to `k` results, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebResult>, SearchError>;
}
