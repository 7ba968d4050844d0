//! Google Custom Search JSON API.

use async_trait::async_trait;
use chatrecall_core::error::SearchError;
use chatrecall_core::search::{WebResult, WebSearch};
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The API serves at most 10 results per request.
const MAX_NUM: usize = 10;

pub struct GoogleSearch {
    endpoint: String,
    api_key: String,
    engine_id: String,
    client: reqwest::Client,
}

impl GoogleSearch {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            client,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    fn name(&self) -> &str {
        "google"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebResult>, SearchError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let num = k.min(MAX_NUM).to_string();
        debug!(query, k, "Searching Google");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Google Custom Search returned error");
            return Err(SearchError::ApiError {
                status_code: status,
                message: body,
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| SearchError::ApiError {
            status_code: status,
            message: format!("Failed to parse response: {e}"),
        })?;

        Ok(parsed.into_results(k))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SearchResponse {
    fn into_results(self, k: usize) -> Vec<WebResult> {
        self.items
            .into_iter()
            .take(k)
            .map(|item| WebResult {
                title: item.title,
                url: item.link,
                snippet: item.snippet.replace('\n', " "),
            })
            .collect()
    }
}
