//! DuckDuckGo web search via the Instant Answer API (no API key required).
//!
//! The abstract (when present) comes first, followed by related topics.
//! Nested topic groups are flattened in document order.

use async_trait::async_trait;
use chatrecall_core::error::SearchError;
use chatrecall_core::search::{WebResult, WebSearch};
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";

pub struct DuckDuckGoSearch {
    endpoint: String,
    region: String,
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new(region: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, region)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("chatrecall/0.1")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            client,
        }
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebResult>, SearchError> {
        debug!(query, k, "Searching DuckDuckGo");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
                ("kl", self.region.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "DuckDuckGo returned error");
            return Err(SearchError::ApiError {
                status_code: status,
                message: body,
            });
        }

        // DuckDuckGo serves JSON as `application/x-javascript`, so parse the text.
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|e| SearchError::ApiError {
                status_code: status,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(answer.into_results(k))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl InstantAnswer {
    fn into_results(self, k: usize) -> Vec<WebResult> {
        let mut results = Vec::new();

        if !self.abstract_text.is_empty() {
            results.push(WebResult {
                title: self.heading,
                url: self.abstract_url,
                snippet: self.abstract_text,
            });
        }

        let mut stack: Vec<RelatedTopic> = self.related_topics.into_iter().rev().collect();
        while let Some(topic) = stack.pop() {
            if results.len() >= k {
                break;
            }
            match topic {
                RelatedTopic::Topic { text, first_url } if !text.is_empty() => {
                    results.push(WebResult {
                        title: String::new(),
                        url: first_url,
                        snippet: text,
                    });
                }
                RelatedTopic::Topic { .. } => {}
                RelatedTopic::Group { topics } => stack.extend(topics.into_iter().rev()),
            }
        }

        results.truncate(k);
        results
    }
}
