//! Scripted collaborators for tests.
//!
//! Enabled in this crate's own tests and, through the `test-helpers`
//! feature, in downstream crates' dev builds.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chatrecall_core::document::Document;
use chatrecall_core::error::{IndexError, ProviderError, SearchError};
use chatrecall_core::index::RetrievalIndex;
use chatrecall_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use chatrecall_core::search::{WebResult, WebSearch};

/// A provider that returns a sequence of scripted outcomes.
///
/// The last outcome repeats once the script runs out. Every prompt is kept
/// for inspection.
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Always fails with an API error.
    pub fn failing() -> Self {
        Self::new(vec![Err(ProviderError::ApiError {
            status_code: 503,
            message: "model overloaded".into(),
        })])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);

        let mut outcomes = self.outcomes.lock().unwrap();
        let outcome = if outcomes.len() > 1 {
            outcomes.pop_front()
        } else {
            outcomes.front().cloned()
        };

        match outcome.unwrap_or_else(|| Ok(String::new())) {
            Ok(text) => Ok(make_text_response(&text)),
            Err(e) => Err(e),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        text: text.to_string(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// An index that records every upsert and answers searches from a script.
///
/// Upserts replace by id like a real store. When no search results are
/// scripted, `search` returns stored texts in insertion order.
#[derive(Default)]
pub struct RecordingIndex {
    documents: Mutex<Vec<Document>>,
    index_calls: Mutex<usize>,
    queries: Mutex<Vec<String>>,
    search_results: Mutex<Option<Vec<String>>>,
    failure: Mutex<Option<IndexError>>,
    write_failure: Mutex<Option<IndexError>>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these texts from every search.
    pub fn with_search_results(results: Vec<&str>) -> Self {
        let index = Self::default();
        *index.search_results.lock().unwrap() =
            Some(results.into_iter().map(String::from).collect());
        index
    }

    /// Make every subsequent call fail with `error` (or succeed on `None`).
    pub fn set_failure(&self, error: Option<IndexError>) {
        *self.failure.lock().unwrap() = error;
    }

    /// Make only `index` calls fail, leaving searches working.
    pub fn set_write_failure(&self, error: Option<IndexError>) {
        *self.write_failure.lock().unwrap() = error;
    }

    pub fn documents(&self) -> Vec<Document> {
        self.documents.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.documents().into_iter().map(|d| d.text).collect()
    }

    /// Successful `index` calls, including replacements.
    pub fn index_calls(&self) -> usize {
        *self.index_calls.lock().unwrap()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), IndexError> {
        match self.failure.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RetrievalIndex for RecordingIndex {
    fn name(&self) -> &str {
        "recording"
    }

    async fn index(&self, document: &Document) -> Result<(), IndexError> {
        self.check_failure()?;
        if let Some(e) = self.write_failure.lock().unwrap().clone() {
            return Err(e);
        }
        let mut documents = self.documents.lock().unwrap();
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document.clone(),
            None => documents.push(document.clone()),
        }
        *self.index_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, IndexError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.check_failure()?;
        let results = match self.search_results.lock().unwrap().clone() {
            Some(scripted) => scripted,
            None => self.texts(),
        };
        Ok(results.into_iter().take(k).collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        self.check_failure()?;
        Ok(self.documents.lock().unwrap().len())
    }
}

/// A web search backend that returns fixed results and records queries.
pub struct StaticWebSearch {
    results: Result<Vec<WebResult>, SearchError>,
    queries: Mutex<Vec<String>>,
}

impl StaticWebSearch {
    pub fn new(results: Vec<WebResult>) -> Self {
        Self {
            results: Ok(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            results: Err(SearchError::Network("connection reset".into())),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for StaticWebSearch {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results
            .clone()
            .map(|results| results.into_iter().take(k).collect())
    }
}

/// Shorthand for a web result.
pub fn web_result(title: &str, url: &str, snippet: &str) -> WebResult {
    WebResult {
        title: title.into(),
        url: url.into(),
        snippet: snippet.into(),
    }
}
