//! Document assembly: consecutive messages by one author become one document.
//!
//! Per conversation the assembler is either idle (nothing pending) or
//! accumulating an author streak. A message from a different author closes
//! the pending streak and opens a new one; closed streaks are indexed in
//! order. A streak the index refused stays queued and is retried on the next
//! tracked message or flush, so a store outage never drops or merges
//! streaks. Every tracked message lands in history regardless.

use std::sync::Arc;

use chatrecall_core::conversation::ConversationId;
use chatrecall_core::document::{Document, format_entry};
use chatrecall_core::error::{Error, Result};
use chatrecall_core::index::RetrievalIndex;
use tracing::{debug, info, warn};

use crate::store::{ConversationState, ConversationStore};

pub struct DocumentAssembler {
    store: Arc<ConversationStore>,
    index: Arc<dyn RetrievalIndex>,
}

impl DocumentAssembler {
    pub fn new(store: Arc<ConversationStore>, index: Arc<dyn RetrievalIndex>) -> Self {
        Self { store, index }
    }

    /// Record a plain chat message.
    ///
    /// The message always joins history and the streak bookkeeping. An error
    /// means some closed streak could not be indexed yet; it stays queued.
    pub async fn track(
        &self,
        conversation: &ConversationId,
        message_id: &str,
        author: &str,
        text: &str,
    ) -> Result<()> {
        let state = self.store.get_or_create(conversation);
        let mut state = state.lock().await;

        let entry = format_entry(author, text);
        state.history.push(entry.clone());

        let same_author = state.last_author.as_deref() == Some(author);
        let extended = match state.pending.as_mut() {
            Some(pending) if same_author => {
                pending.append_line(&entry);
                debug!(conversation = %conversation, doc_id = %pending.id, "Extended pending document");
                true
            }
            _ => false,
        };

        if !extended {
            if let Some(closed) = state.pending.take() {
                state.unflushed.push(closed);
            }
            let document = Document::new(conversation, message_id, author, entry);
            debug!(conversation = %conversation, doc_id = %document.id, author, "Opened document");
            state.pending = Some(document);
            state.last_author = Some(author.to_string());
        }

        self.index_unflushed(conversation, &mut state).await.map(|_| ())
    }

    /// Index the pending document of `conversation` together with any
    /// queued streaks.
    ///
    /// Returns whether anything was indexed. On failure the remaining
    /// documents stay queued.
    pub async fn flush(&self, conversation: &ConversationId) -> Result<bool> {
        let Some(state) = self.store.get(conversation) else {
            return Ok(false);
        };
        let mut state = state.lock().await;
        if let Some(pending) = state.pending.take() {
            state.unflushed.push(pending);
        }
        self.index_unflushed(conversation, &mut state)
            .await
            .map(|indexed| indexed > 0)
    }

    /// Flush every conversation. All conversations are attempted; the first
    /// error is returned after the rest have been tried.
    pub async fn flush_all(&self) -> Result<usize> {
        let mut flushed = 0;
        let mut first_error = None;

        for conversation in self.store.conversation_ids() {
            match self.flush(&conversation).await {
                Ok(true) => flushed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(conversation = %conversation, error = %e, "Flush failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(flushed, "Flushed pending documents");
                Ok(flushed)
            }
        }
    }

    /// Copy of the pending document for `conversation`.
    pub async fn pending(&self, conversation: &ConversationId) -> Option<Document> {
        let state = self.store.get(conversation)?;
        let state = state.lock().await;
        state.pending.clone()
    }

    /// Closed streaks still waiting to be indexed.
    pub async fn unflushed(&self, conversation: &ConversationId) -> Vec<Document> {
        match self.store.get(conversation) {
            Some(state) => state.lock().await.unflushed.clone(),
            None => Vec::new(),
        }
    }

    /// Index queued streaks oldest first, stopping at the first failure.
    async fn index_unflushed(
        &self,
        conversation: &ConversationId,
        state: &mut ConversationState,
    ) -> Result<usize> {
        let mut indexed = 0;
        while let Some(document) = state.unflushed.first() {
            if let Err(e) = self.index.index(document).await {
                warn!(
                    conversation = %conversation,
                    doc_id = %document.id,
                    queued = state.unflushed.len(),
                    error = %e,
                    "Indexing deferred"
                );
                return Err(Error::IndexingFailed(e));
            }
            info!(
                conversation = %conversation,
                doc_id = %document.id,
                lines = document.text.lines().count(),
                "Indexed document"
            );
            state.unflushed.remove(0);
            indexed += 1;
        }
        Ok(indexed)
    }
}
