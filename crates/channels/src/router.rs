//! Command router: turns classified messages into core operations and
//! chat replies.

use std::sync::Arc;

use async_trait::async_trait;
use chatrecall_agent::{DocumentAssembler, QueryOrchestrator, QueryRequest};
use chatrecall_config::AppConfig;
use chatrecall_core::channel::{Channel, ChannelMessage};
use chatrecall_core::error::{ChannelError, Error};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandPolicy, EmptyInput};

const QUERY_PENDING: &str = "Обрабатываю запрос...";
const SEARCH_PENDING: &str = "Ищу информацию...";

/// Something that consumes inbound messages one at a time.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: ChannelMessage) -> Result<(), ChannelError>;
}

pub struct CommandRouter {
    policy: CommandPolicy,
    assembler: Arc<DocumentAssembler>,
    orchestrator: Arc<QueryOrchestrator>,
    channel: Arc<dyn Channel>,
    pending_messages: Vec<String>,
}

impl CommandRouter {
    pub fn new(
        policy: CommandPolicy,
        assembler: Arc<DocumentAssembler>,
        orchestrator: Arc<QueryOrchestrator>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            policy,
            assembler,
            orchestrator,
            channel,
            pending_messages: Vec::new(),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        assembler: Arc<DocumentAssembler>,
        orchestrator: Arc<QueryOrchestrator>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self::new(
            CommandPolicy::from_bot_config(&config.bot),
            assembler,
            orchestrator,
            channel,
        )
        .with_pending_messages(config.bot.pending_messages.clone())
    }

    /// Use a random phrase from `messages` as the placeholder reply.
    pub fn with_pending_messages(mut self, messages: Vec<String>) -> Self {
        self.pending_messages = messages.into_iter().filter(|m| !m.trim().is_empty()).collect();
        self
    }

    fn pending_text(&self, fallback: &'static str) -> String {
        if self.pending_messages.is_empty() {
            return fallback.to_string();
        }
        let idx = rand::rng().random_range(0..self.pending_messages.len());
        self.pending_messages[idx].clone()
    }

    async fn answer(
        &self,
        message: &ChannelMessage,
        text: String,
        query: Option<String>,
    ) -> Result<(), ChannelError> {
        let web = query.is_some();
        let conversation = &message.conversation_id;
        if let Err(e) = self.channel.send_typing(conversation).await {
            debug!(error = %e, "Typing indicator failed");
        }

        let placeholder = self.pending_text(if web { SEARCH_PENDING } else { QUERY_PENDING });
        let placeholder_id = self
            .channel
            .send(conversation, &placeholder, Some(&message.message_id))
            .await?;

        let request = QueryRequest {
            conversation_id: conversation.clone(),
            message_id: message.message_id.clone(),
            response_message_id: placeholder_id.clone(),
            author: message.sender.clone(),
            text,
            query,
        };
        let outcome = if web {
            self.orchestrator.web_search(&request).await
        } else {
            self.orchestrator.answer(&request).await
        };

        let reply = match outcome {
            Ok(answer) if answer.trim().is_empty() => "🤷".to_string(),
            Ok(answer) => answer,
            Err(e) => {
                warn!(conversation = %conversation, error = %e, "Query failed");
                user_error_text(&e).to_string()
            }
        };

        self.channel
            .edit(conversation, &placeholder_id, &reply)
            .await
    }
}

#[async_trait]
impl MessageHandler for CommandRouter {
    async fn handle(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        let conversation = &message.conversation_id;

        match self.policy.classify(&message) {
            Ok(Command::Track) => {
                if let Err(e) = self
                    .assembler
                    .track(conversation, &message.message_id, &message.sender, &message.content)
                    .await
                {
                    warn!(conversation = %conversation, error = %e, "Tracking failed");
                }
                Ok(())
            }
            Ok(Command::Remember { text }) => {
                info!(conversation = %conversation, author = %message.sender, "Remember command");
                let reply = match self
                    .orchestrator
                    .remember(conversation, &message.message_id, &message.sender, &text)
                    .await
                {
                    Ok(ack) => ack,
                    Err(e) => {
                        warn!(conversation = %conversation, error = %e, "Remember failed");
                        user_error_text(&e).to_string()
                    }
                };
                self.channel
                    .send(conversation, &reply, Some(&message.message_id))
                    .await
                    .map(|_| ())
            }
            Ok(Command::WebSearch { query, text }) => {
                info!(conversation = %conversation, author = %message.sender, "Web search command");
                self.answer(&message, text, Some(query)).await
            }
            Ok(Command::Query { text }) => {
                info!(conversation = %conversation, author = %message.sender, "Query command");
                self.answer(&message, text, None).await
            }
            Err(EmptyInput) => self
                .channel
                .send(conversation, &self.policy.usage_hint(), Some(&message.message_id))
                .await
                .map(|_| ()),
        }
    }
}

/// Short user-facing text for a failed operation.
pub fn user_error_text(error: &Error) -> &'static str {
    match error {
        e if e.is_store_unavailable() => "⚠️ Память сейчас недоступна, попробуй позже.",
        Error::RetrievalFailed(_) | Error::IndexingFailed(_) => {
            "⚠️ Не получилось поработать с памятью, попробуй позже."
        }
        Error::GenerationFailed(_) => "⚠️ Не получилось сгенерировать ответ, попробуй позже.",
        Error::WebSearchFailed(_) => "⚠️ Поиск сейчас недоступен, попробуй позже.",
    }
}
