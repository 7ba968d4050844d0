//! Short-term memory: a sliding window of recent formatted messages.

use std::collections::VecDeque;
use std::sync::Arc;

use chatrecall_core::conversation::ConversationId;

use crate::store::ConversationStore;

/// Fixed-capacity FIFO of formatted history entries.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    capacity: usize,
    entries: VecDeque<String>,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an entry, evicting the oldest one past capacity.
    pub fn push(&mut self, entry: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Conversation-keyed access to the history windows in a [`ConversationStore`].
#[derive(Clone)]
pub struct HistoryBuffer {
    store: Arc<ConversationStore>,
}

impl HistoryBuffer {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn append(&self, conversation: &ConversationId, entry: impl Into<String>) {
        let state = self.store.get_or_create(conversation);
        state.lock().await.history.push(entry.into());
    }

    /// Entries for `conversation`, oldest first. Unseen conversations yield
    /// an empty list and are not created.
    pub async fn get(&self, conversation: &ConversationId) -> Vec<String> {
        match self.store.get(conversation) {
            Some(state) => state.lock().await.history.entries(),
            None => Vec::new(),
        }
    }
}
