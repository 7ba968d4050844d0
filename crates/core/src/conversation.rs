//! Conversation identity.
//!
//! Every piece of per-chat state is keyed by a [`ConversationId`]. Ids are
//! stable for the lifetime of a chat (a Telegram chat id, a terminal session
//! name) and are embedded in document ids, so two conversations can never
//! collide inside the shared retrieval index.

use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation (group chat).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
