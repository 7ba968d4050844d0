//! Terminal channel: a local group chat on stdin/stdout.
//!
//! Each input line is one chat message. `author: text` sets the author
//! (a missing `@` is added); bare lines come from the default author.
//! Useful for trying the bot without Telegram.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chatrecall_core::channel::{Channel, ChannelMessage};
use chatrecall_core::conversation::ConversationId;
use chatrecall_core::error::ChannelError;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Conversation id used for every terminal message.
pub const TERMINAL_CONVERSATION: &str = "terminal";

/// Interactive terminal channel.
pub struct TerminalChannel {
    default_author: String,
    next_id: Arc<AtomicU64>,
}

impl TerminalChannel {
    pub fn new(default_author: impl Into<String>) -> Self {
        Self {
            default_author: normalize_author(&default_author.into()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn allocate_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

impl Default for TerminalChannel {
    fn default() -> Self {
        Self::new("@you")
    }
}

/// Split `author: text`; lines without an author prefix use `default_author`.
pub fn parse_line(line: &str, default_author: &str) -> (String, String) {
    if let Some((author, text)) = line.split_once(':') {
        let author = author.trim();
        let looks_like_author = !author.is_empty()
            && author
                .trim_start_matches('@')
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_');
        if looks_like_author {
            return (normalize_author(author), text.trim().to_string());
        }
    }
    (default_author.to_string(), line.trim().to_string())
}

fn normalize_author(author: &str) -> String {
    if author.starts_with('@') {
        author.to_string()
    } else {
        format!("@{author}")
    }
}

#[async_trait]
impl Channel for TerminalChannel {
    fn name(&self) -> &str {
        "terminal"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let default_author = self.default_author.clone();
        let next_id = self.next_id.clone();

        tokio::spawn(async move {
            let reader = BufReader::new(io::stdin());
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        if matches!(line.as_str(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let (sender, content) = parse_line(&line, &default_author);
                        let message = ChannelMessage {
                            conversation_id: ConversationId::from(TERMINAL_CONVERSATION),
                            message_id: next_id.fetch_add(1, Ordering::SeqCst).to_string(),
                            sender,
                            content,
                            is_reply_to_bot: false,
                            mentions_bot: false,
                        };

                        if tx.send(Ok(message)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(
        &self,
        _chat_id: &ConversationId,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        println!("🤖 {content}");
        Ok(self.allocate_id())
    }

    async fn edit(
        &self,
        _chat_id: &ConversationId,
        _message_id: &str,
        content: &str,
    ) -> Result<(), ChannelError> {
        println!("🤖 {content}");
        Ok(())
    }
}
