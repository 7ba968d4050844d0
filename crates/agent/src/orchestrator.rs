//! Query orchestration: retrieval-augmented answers.
//!
//! # Flow
//!
//! 1. Append the formatted question to history
//! 2. Gather context: memory retrieval, or a web search
//! 3. Compose the prompt (persona, history, question, context)
//! 4. Generate the answer
//! 5. Index the answer as a document, then append it to history
//!
//! Steps 4 and 5 are all-or-nothing: a failed generation records nothing,
//! and an answer that cannot be indexed never reaches history. Steps 1 and
//! 2 are not rolled back. The conversation lock is held throughout, so
//! concurrent requests on one conversation cannot interleave.

use std::sync::Arc;

use chatrecall_config::AppConfig;
use chatrecall_core::conversation::ConversationId;
use chatrecall_core::document::{Document, format_entry};
use chatrecall_core::error::{Error, Result, SearchError};
use chatrecall_core::index::RetrievalIndex;
use chatrecall_core::provider::{Provider, ProviderRequest};
use chatrecall_core::search::WebSearch;
use tracing::{debug, info};

use crate::prompt::{ContextSection, PromptConfig};
use crate::store::{ConversationState, ConversationStore};

/// Reply to a successful remember request.
pub const REMEMBER_ACK: &str = "✅ Запомнил";

/// Knobs for answering.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How the bot appears in history and documents (`@name`).
    pub bot_identity: String,
    pub top_k: usize,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub prompt: PromptConfig,
}

impl OrchestratorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            bot_identity: config.bot_handle(),
            top_k: config.bot.top_k,
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_tokens: Some(config.provider.max_tokens),
            prompt: PromptConfig::from_bot_config(&config.bot),
        }
    }
}

/// One question addressed to the bot.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub conversation_id: ConversationId,
    /// Id of the message carrying the question.
    pub message_id: String,
    /// Id under which the answer is recorded (the bot's reply message).
    pub response_message_id: String,
    pub author: String,
    /// Message text with the bot mention removed; this is what history records.
    pub text: String,
    /// What to search and answer when it differs from `text`, e.g. the web
    /// search query without its trigger word.
    pub query: Option<String>,
}

impl QueryRequest {
    /// The question to search for and put in the prompt.
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or(&self.text)
    }
}

pub struct QueryOrchestrator {
    store: Arc<ConversationStore>,
    index: Arc<dyn RetrievalIndex>,
    provider: Arc<dyn Provider>,
    web_search: Option<Arc<dyn WebSearch>>,
    config: OrchestratorConfig,
}

impl QueryOrchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        index: Arc<dyn RetrievalIndex>,
        provider: Arc<dyn Provider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            index,
            provider,
            web_search: None,
            config,
        }
    }

    /// Enable the web-search variant.
    pub fn with_web_search(mut self, web_search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(web_search);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Answer from memory.
    pub async fn answer(&self, request: &QueryRequest) -> Result<String> {
        let state = self.store.get_or_create(&request.conversation_id);
        let mut state = state.lock().await;

        state
            .history
            .push(format_entry(&request.author, &request.text));

        let snippets = self
            .index
            .search(request.query(), self.config.top_k)
            .await
            .map_err(Error::RetrievalFailed)?;
        debug!(
            conversation = %request.conversation_id,
            snippets = snippets.len(),
            "Retrieved memory"
        );

        self.generate_and_record(&mut state, request, ContextSection::Memory(snippets))
            .await
    }

    /// Answer from a web search on `request.query()`.
    pub async fn web_search(&self, request: &QueryRequest) -> Result<String> {
        let web_search = self.web_search.as_ref().ok_or_else(|| {
            Error::WebSearchFailed(SearchError::NotConfigured("no web search backend".into()))
        })?;

        let state = self.store.get_or_create(&request.conversation_id);
        let mut state = state.lock().await;

        state
            .history
            .push(format_entry(&request.author, &request.text));

        let results = web_search
            .search(request.query(), self.config.top_k)
            .await
            .map_err(Error::WebSearchFailed)?;
        debug!(
            conversation = %request.conversation_id,
            backend = web_search.name(),
            results = results.len(),
            "Web search finished"
        );

        self.generate_and_record(&mut state, request, ContextSection::Web(results))
            .await
    }

    /// Store `text` as its own document without generating anything.
    ///
    /// The document is indexed first; history only gains the entry once the
    /// index accepted it. Any pending author streak is left untouched.
    pub async fn remember(
        &self,
        conversation: &ConversationId,
        message_id: &str,
        author: &str,
        text: &str,
    ) -> Result<String> {
        let state = self.store.get_or_create(conversation);
        let mut state = state.lock().await;

        let entry = format_entry(author, text);
        let document = Document::new(conversation, message_id, author, entry.clone());
        self.index
            .index(&document)
            .await
            .map_err(Error::IndexingFailed)?;
        state.history.push(entry);

        info!(conversation = %conversation, doc_id = %document.id, "Remembered message");
        Ok(REMEMBER_ACK.to_string())
    }

    async fn generate_and_record(
        &self,
        state: &mut ConversationState,
        request: &QueryRequest,
        context: ContextSection,
    ) -> Result<String> {
        let prompt = self.config.prompt.compose(
            &state.history.entries(),
            &request.author,
            request.query(),
            &context,
        );
        debug!(conversation = %request.conversation_id, prompt = %prompt, "Composed prompt");

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.config.model.clone(),
                prompt,
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            })
            .await
            .map_err(Error::GenerationFailed)?;
        let answer = response.text;

        let entry = format_entry(&self.config.bot_identity, &answer);
        let document = Document::new(
            &request.conversation_id,
            &request.response_message_id,
            &self.config.bot_identity,
            entry.clone(),
        );
        self.index
            .index(&document)
            .await
            .map_err(Error::IndexingFailed)?;
        state.history.push(entry);

        info!(
            conversation = %request.conversation_id,
            doc_id = %document.id,
            answer_len = answer.len(),
            "Answered query"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::DocumentAssembler;
    use crate::history::HistoryBuffer;
    use crate::prompt::MEMORY_PLACEHOLDER;
    use crate::test_helpers::{RecordingIndex, ScriptedProvider, StaticWebSearch, web_result};
    use chatrecall_core::error::IndexError;

    struct Harness {
        orchestrator: QueryOrchestrator,
        index: Arc<RecordingIndex>,
        provider: Arc<ScriptedProvider>,
        history: HistoryBuffer,
        store: Arc<ConversationStore>,
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            bot_identity: "@bot".into(),
            top_k: 3,
            model: "test-model".into(),
            temperature: 0.7,
            max_tokens: None,
            prompt: PromptConfig::default(),
        }
    }

    fn harness(index: RecordingIndex, provider: ScriptedProvider) -> Harness {
        let store = Arc::new(ConversationStore::new(10));
        let index = Arc::new(index);
        let provider = Arc::new(provider);
        Harness {
            orchestrator: QueryOrchestrator::new(
                store.clone(),
                index.clone(),
                provider.clone(),
                config(),
            ),
            index,
            provider,
            history: HistoryBuffer::new(store.clone()),
            store,
        }
    }

    fn request(text: &str) -> QueryRequest {
        QueryRequest {
            conversation_id: ConversationId::from("c1"),
            message_id: "10".into(),
            response_message_id: "11".into(),
            author: "@alice".into(),
            text: text.into(),
            query: None,
        }
    }

    #[tokio::test]
    async fn answer_records_question_and_answer() {
        let h = harness(
            RecordingIndex::with_search_results(vec!["fact1", "fact2"]),
            ScriptedProvider::answering("Созвон в пятницу"),
        );

        let answer = h.orchestrator.answer(&request("когда созвон?")).await.unwrap();
        assert_eq!(answer, "Созвон в пятницу");

        let chat = ConversationId::from("c1");
        assert_eq!(
            h.history.get(&chat).await,
            vec!["От @alice: когда созвон?", "От @bot: Созвон в пятницу"]
        );

        let docs = h.index.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "c1_11");
        assert_eq!(docs[0].author, "@bot");
        assert_eq!(docs[0].text, "От @bot: Созвон в пятницу");

        assert_eq!(h.index.queries(), vec!["когда созвон?"]);
        let prompt = &h.provider.prompts()[0];
        assert!(prompt.contains("<MEMORY>fact1\nfact2</MEMORY>"));
        assert!(prompt.contains("<DIALOG>От @alice: когда созвон?</DIALOG>"));
    }

    #[tokio::test]
    async fn empty_retrieval_uses_placeholder() {
        let h = harness(RecordingIndex::new(), ScriptedProvider::answering("ok"));
        h.orchestrator.answer(&request("что-нибудь?")).await.unwrap();

        let prompt = &h.provider.prompts()[0];
        assert!(prompt.contains(&format!("<MEMORY>{MEMORY_PLACEHOLDER}</MEMORY>")));
    }

    #[tokio::test]
    async fn generation_failure_records_nothing_but_the_question() {
        let h = harness(RecordingIndex::new(), ScriptedProvider::failing());

        let err = h.orchestrator.answer(&request("вопрос")).await.unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(_)));

        assert_eq!(h.index.index_calls(), 0);
        assert_eq!(
            h.history.get(&ConversationId::from("c1")).await,
            vec!["От @alice: вопрос"]
        );
    }

    #[tokio::test]
    async fn indexing_failure_keeps_answer_out_of_history() {
        let h = harness(RecordingIndex::new(), ScriptedProvider::answering("ответ"));
        h.index.set_write_failure(Some(IndexError::Rejected {
            status_code: 400,
            message: "bad vector".into(),
        }));

        let err = h.orchestrator.answer(&request("вопрос")).await.unwrap_err();
        assert!(matches!(err, Error::IndexingFailed(_)));
        assert_eq!(h.provider.call_count(), 1);
        assert!(h.index.documents().is_empty());
        assert_eq!(
            h.history.get(&ConversationId::from("c1")).await,
            vec!["От @alice: вопрос"]
        );
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_retrieval_failure() {
        let h = harness(RecordingIndex::new(), ScriptedProvider::answering("x"));
        h.index
            .set_failure(Some(IndexError::StoreUnavailable("refused".into())));

        let err = h.orchestrator.answer(&request("q")).await.unwrap_err();
        assert!(err.is_store_unavailable());
        assert_eq!(h.history.get(&ConversationId::from("c1")).await.len(), 1);
    }

    #[tokio::test]
    async fn remember_indexes_and_acknowledges_without_generation() {
        let h = harness(RecordingIndex::new(), ScriptedProvider::answering("unused"));
        let chat = ConversationId::from("c1");

        let ack = h
            .orchestrator
            .remember(&chat, "5", "@x", "запомни купить молоко")
            .await
            .unwrap();

        assert_eq!(ack, REMEMBER_ACK);
        assert_eq!(h.provider.call_count(), 0);
        let docs = h.index.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "От @x: запомни купить молоко");
        assert_eq!(h.history.get(&chat).await, vec!["От @x: запомни купить молоко"]);
    }

    #[tokio::test]
    async fn remember_failure_leaves_history_alone() {
        let h = harness(RecordingIndex::new(), ScriptedProvider::answering("unused"));
        h.index
            .set_failure(Some(IndexError::StoreUnavailable("down".into())));
        let chat = ConversationId::from("c1");

        let err = h.orchestrator.remember(&chat, "5", "@x", "запомни").await.unwrap_err();
        assert!(matches!(err, Error::IndexingFailed(_)));
        assert!(h.history.get(&chat).await.is_empty());
    }

    #[tokio::test]
    async fn remember_and_answer_leave_pending_streak_alone() {
        let h = harness(RecordingIndex::new(), ScriptedProvider::answering("ответ"));
        let assembler = DocumentAssembler::new(h.store.clone(), h.index.clone());
        let chat = ConversationId::from("c1");

        assembler.track(&chat, "1", "@alice", "привет").await.unwrap();
        h.orchestrator.remember(&chat, "2", "@bob", "запомни x").await.unwrap();
        h.orchestrator.answer(&request("вопрос")).await.unwrap();

        let pending = assembler.pending(&chat).await.unwrap();
        assert_eq!(pending.text, "От @alice: привет");
        assert_eq!(h.index.index_calls(), 2);
    }

    #[tokio::test]
    async fn web_search_variant_uses_search_section() {
        let store = Arc::new(ConversationStore::new(10));
        let index = Arc::new(RecordingIndex::new());
        let provider = Arc::new(ScriptedProvider::answering("BTC стоит много"));
        let search = Arc::new(StaticWebSearch::new(vec![web_result(
            "Курс",
            "https://example.org/btc",
            "100k",
        )]));
        let orchestrator =
            QueryOrchestrator::new(store.clone(), index.clone(), provider.clone(), config())
                .with_web_search(search.clone());

        let answer = orchestrator.web_search(&request("курс биткоина")).await.unwrap();
        assert_eq!(answer, "BTC стоит много");
        assert_eq!(search.queries(), vec!["курс биткоина"]);
        assert!(index.queries().is_empty());

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("<SEARCH>Курс (https://example.org/btc): 100k</SEARCH>"));
        assert_eq!(index.texts(), vec!["От @bot: BTC стоит много"]);
    }

    #[tokio::test]
    async fn web_search_records_full_text_but_searches_the_query() {
        let store = Arc::new(ConversationStore::new(10));
        let provider = Arc::new(ScriptedProvider::answering("100k"));
        let search = Arc::new(StaticWebSearch::new(vec![]));
        let orchestrator = QueryOrchestrator::new(
            store.clone(),
            Arc::new(RecordingIndex::new()),
            provider.clone(),
            config(),
        )
        .with_web_search(search.clone());

        let mut req = request("загугли курс биткоина");
        req.query = Some("курс биткоина".into());
        orchestrator.web_search(&req).await.unwrap();

        assert_eq!(search.queries(), vec!["курс биткоина"]);
        assert_eq!(
            HistoryBuffer::new(store).get(&ConversationId::from("c1")).await,
            vec!["От @alice: загугли курс биткоина", "От @bot: 100k"]
        );
        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("от @alice: \"курс биткоина\""));
    }

    #[tokio::test]
    async fn web_search_empty_results_use_placeholder() {
        let provider = Arc::new(ScriptedProvider::answering("не знаю"));
        let orchestrator = QueryOrchestrator::new(
            Arc::new(ConversationStore::new(10)),
            Arc::new(RecordingIndex::new()),
            provider.clone(),
            config(),
        )
        .with_web_search(Arc::new(StaticWebSearch::new(vec![])));

        orchestrator.web_search(&request("x")).await.unwrap();
        assert!(provider.prompts()[0].contains("<SEARCH>Ничего не нашлось.</SEARCH>"));
    }

    #[tokio::test]
    async fn web_search_failure_and_missing_backend() {
        let provider = Arc::new(ScriptedProvider::answering("x"));
        let without = QueryOrchestrator::new(
            Arc::new(ConversationStore::new(10)),
            Arc::new(RecordingIndex::new()),
            provider.clone(),
            config(),
        );
        assert!(matches!(
            without.web_search(&request("x")).await.unwrap_err(),
            Error::WebSearchFailed(SearchError::NotConfigured(_))
        ));

        let failing = QueryOrchestrator::new(
            Arc::new(ConversationStore::new(10)),
            Arc::new(RecordingIndex::new()),
            provider.clone(),
            config(),
        )
        .with_web_search(Arc::new(StaticWebSearch::failing()));
        assert!(matches!(
            failing.web_search(&request("x")).await.unwrap_err(),
            Error::WebSearchFailed(SearchError::Network(_))
        ));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn history_window_bounds_the_prompt() {
        let store = Arc::new(ConversationStore::new(2));
        let provider = Arc::new(ScriptedProvider::answering("ok"));
        let index = Arc::new(RecordingIndex::new());
        let assembler = DocumentAssembler::new(store.clone(), index.clone());
        let orchestrator = QueryOrchestrator::new(store, index, provider.clone(), config());
        let chat = ConversationId::from("c1");

        assembler.track(&chat, "1", "@a", "old").await.unwrap();
        assembler.track(&chat, "2", "@b", "recent").await.unwrap();
        orchestrator.answer(&request("q")).await.unwrap();

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("<DIALOG>От @b: recent\nОт @alice: q</DIALOG>"));
    }
}
