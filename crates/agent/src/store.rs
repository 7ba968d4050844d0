//! Per-conversation state.
//!
//! Every conversation owns a [`ConversationState`] behind its own async
//! mutex. Operations lock it for their whole read-modify-write sequence,
//! including awaited I/O, so work on one conversation is serialized while
//! distinct conversations never contend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chatrecall_core::conversation::ConversationId;
use chatrecall_core::document::Document;
use tokio::sync::Mutex;

use crate::history::HistoryWindow;

/// Mutable state of one conversation.
#[derive(Debug)]
pub struct ConversationState {
    /// Most recent formatted messages, oldest first.
    pub history: HistoryWindow,

    /// Author of the most recently tracked message.
    pub last_author: Option<String>,

    /// The author streak that has not been indexed yet.
    pub pending: Option<Document>,

    /// Closed streaks whose indexing failed, oldest first. Retried before
    /// anything else is flushed.
    pub unflushed: Vec<Document>,
}

impl ConversationState {
    pub fn new(history_size: usize) -> Self {
        Self {
            history: HistoryWindow::new(history_size),
            last_author: None,
            pending: None,
            unflushed: Vec::new(),
        }
    }
}

pub type SharedState = Arc<Mutex<ConversationState>>;

/// Lazily-populated map of conversation states.
pub struct ConversationStore {
    history_size: usize,
    conversations: RwLock<HashMap<ConversationId, SharedState>>,
}

impl ConversationStore {
    pub fn new(history_size: usize) -> Self {
        Self {
            history_size: history_size.max(1),
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// State for `id`, created on first use.
    pub fn get_or_create(&self, id: &ConversationId) -> SharedState {
        if let Some(state) = self.get(id) {
            return state;
        }
        let mut map = self
            .conversations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationState::new(self.history_size))))
            .clone()
    }

    /// State for `id` if the conversation has been seen.
    pub fn get(&self, id: &ConversationId) -> Option<SharedState> {
        self.conversations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
    }

    /// Every conversation seen so far, in id order.
    pub fn conversation_ids(&self) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self
            .conversations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
