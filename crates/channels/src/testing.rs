//! In-process channel for tests: records every outbound call and lets tests
//! inject inbound messages.

use std::sync::Mutex;

use async_trait::async_trait;
use chatrecall_core::channel::{Channel, ChannelMessage};
use chatrecall_core::conversation::ConversationId;
use chatrecall_core::error::ChannelError;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub id: String,
    pub chat: ConversationId,
    pub text: String,
    pub reply_to: Option<String>,
}

pub struct RecordingChannel {
    sent: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<(String, String)>>,
    typing: Mutex<usize>,
    next_id: Mutex<u64>,
    inject_tx: tokio::sync::Mutex<Option<mpsc::Sender<Result<ChannelMessage, ChannelError>>>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            typing: Mutex::new(0),
            next_id: Mutex::new(100),
            inject_tx: tokio::sync::Mutex::new(None),
        }
    }

    /// Deliver `message` as if it came from the platform.
    pub async fn inject_message(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        let guard = self.inject_tx.lock().await;
        match guard.as_ref() {
            Some(tx) => tx
                .send(Ok(message))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Message channel closed".into())),
            None => Err(ChannelError::ConnectionLost("Channel not started".into())),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// `(message_id, new_text)` per edit, in order.
    pub fn edits(&self) -> Vec<(String, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn typing_count(&self) -> usize {
        *self.typing.lock().unwrap()
    }

    /// What the chat shows now: sent messages with edits applied.
    pub fn visible_texts(&self) -> Vec<String> {
        let edits = self.edits();
        self.sent()
            .into_iter()
            .map(|m| {
                edits
                    .iter()
                    .rev()
                    .find(|(id, _)| *id == m.id)
                    .map(|(_, text)| text.clone())
                    .unwrap_or(m.text)
            })
            .collect()
    }
}

impl Default for RecordingChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send(
        &self,
        chat_id: &ConversationId,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            next.to_string()
        };
        self.sent.lock().unwrap().push(SentMessage {
            id: id.clone(),
            chat: chat_id.clone(),
            text: content.to_string(),
            reply_to: reply_to.map(String::from),
        });
        Ok(id)
    }

    async fn edit(
        &self,
        _chat_id: &ConversationId,
        message_id: &str,
        content: &str,
    ) -> Result<(), ChannelError> {
        self.edits
            .lock()
            .unwrap()
            .push((message_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn send_typing(&self, _chat_id: &ConversationId) -> Result<(), ChannelError> {
        *self.typing.lock().unwrap() += 1;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        *self.inject_tx.lock().await = None;
        Ok(())
    }
}
