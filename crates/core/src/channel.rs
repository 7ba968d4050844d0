//! Channel trait: the abstraction over chat transports.
//!
//! A Channel connects ChatRecall to a messaging platform (Telegram, a local
//! terminal session). It yields inbound messages, and delivers replies back,
//! including the "pending" placeholder that is later edited into the answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::error::ChannelError;

/// A message received from a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The chat this message belongs to
    pub conversation_id: ConversationId,

    /// Platform message id, unique within the conversation
    pub message_id: String,

    /// Author identifier as shown to the model (e.g. `@username`)
    pub sender: String,

    /// The text content
    pub content: String,

    /// Whether the message replies to one of the bot's messages
    #[serde(default)]
    pub is_reply_to_bot: bool,

    /// Whether the message mentions the bot
    #[serde(default)]
    pub mentions_bot: bool,
}

impl ChannelMessage {
    /// A plain message that neither replies to nor mentions the bot.
    pub fn plain(
        conversation_id: impl Into<ConversationId>,
        message_id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            sender: sender.into(),
            content: content.into(),
            is_reply_to_bot: false,
            mentions_bot: false,
        }
    }
}

/// The core Channel trait.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "telegram", "terminal").
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    ///
    /// Returns a receiver that yields incoming messages. The channel
    /// implementation handles polling internally.
    async fn start(
        &self,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError>;

    /// Send a message to a chat, optionally as a reply. Returns the id of
    /// the delivered message.
    async fn send(
        &self,
        chat_id: &ConversationId,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError>;

    /// Replace the text of a previously sent message.
    ///
    /// Default implementation sends a new message instead.
    async fn edit(
        &self,
        chat_id: &ConversationId,
        _message_id: &str,
        content: &str,
    ) -> Result<(), ChannelError> {
        self.send(chat_id, content, None).await.map(|_| ())
    }

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _chat_id: &ConversationId) -> Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Stop the channel gracefully.
    async fn stop(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Health check: is the channel connected and operational?
    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_flags_are_off() {
        let msg = ChannelMessage::plain("chat", "1", "@alice", "hello");
        assert_eq!(msg.conversation_id.as_str(), "chat");
        assert!(!msg.is_reply_to_bot);
        assert!(!msg.mentions_bot);
    }

    #[test]
    fn flags_default_when_missing_from_json() {
        let msg: ChannelMessage = serde_json::from_str(
            r#"{"conversation_id":"c","message_id":"7","sender":"@b","content":"hi"}"#,
        )
        .unwrap();
        assert_eq!(msg.message_id, "7");
        assert!(!msg.mentions_bot);
    }
}
