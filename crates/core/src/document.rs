//! Documents: the unit of long-term memory.
//!
//! A document is either an author streak assembled from consecutive chat
//! messages, an explicit "remember" request, or a recorded bot answer.
//! Its id is derived from the conversation and the originating message, so
//! re-indexing the same document replaces it instead of duplicating it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;

/// A single indexable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// `"<conversation>_<message>"`, stable across re-indexing
    pub id: String,

    /// Formatted text, one history entry per line
    pub text: String,

    /// Author identifier (e.g. `@username`)
    pub author: String,

    /// When the document was opened (serialized as RFC 3339)
    pub timestamp: DateTime<Utc>,
}

impl Document {
    /// Open a document for the message `message_id` in `conversation`.
    pub fn new(
        conversation: &ConversationId,
        message_id: &str,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: document_id(conversation, message_id),
            text: text.into(),
            author: author.into(),
            timestamp: Utc::now(),
        }
    }

    /// Append one more formatted entry on its own line.
    pub fn append_line(&mut self, line: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
    }
}

/// Deterministic document id for a message within a conversation.
pub fn document_id(conversation: &ConversationId, message_id: &str) -> String {
    format!("{}_{}", conversation, message_id)
}

/// Format a chat message the way it is stored in history and documents.
pub fn format_entry(author: &str, text: &str) -> String {
    format!("От {author}: {text}")
}
