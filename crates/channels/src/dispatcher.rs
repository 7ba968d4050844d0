//! Per-conversation ordering.
//!
//! Inbound messages are fanned out to one worker task per conversation.
//! Each worker handles its messages strictly in arrival order; different
//! conversations proceed in parallel. Worker queues are unbounded so the
//! inbound pump never waits on a busy conversation.

use std::collections::HashMap;
use std::sync::Arc;

use chatrecall_core::channel::ChannelMessage;
use chatrecall_core::conversation::ConversationId;
use chatrecall_core::error::ChannelError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::router::MessageHandler;

pub struct Dispatcher {
    handler: Arc<dyn MessageHandler>,
    workers: HashMap<ConversationId, mpsc::UnboundedSender<ChannelMessage>>,
    handles: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            handler,
            workers: HashMap::new(),
            handles: Vec::new(),
        }
    }

    /// Queue `message` behind earlier messages of the same conversation.
    ///
    /// Never waits: a slow conversation only grows its own queue.
    pub fn dispatch(&mut self, message: ChannelMessage) {
        let conversation = message.conversation_id.clone();
        let sender = match self.workers.get(&conversation) {
            Some(tx) if !tx.is_closed() => tx.clone(),
            _ => self.spawn_worker(conversation.clone()),
        };

        if let Err(mpsc::error::SendError(message)) = sender.send(message) {
            warn!(conversation = %conversation, "Worker gone, restarting");
            let sender = self.spawn_worker(conversation);
            if sender.send(message).is_err() {
                warn!("Dropped message: worker unavailable");
            }
        }
    }

    fn spawn_worker(&mut self, conversation: ConversationId) -> mpsc::UnboundedSender<ChannelMessage> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ChannelMessage>();
        let handler = self.handler.clone();
        let id = conversation.clone();

        self.handles.push(tokio::spawn(async move {
            debug!(conversation = %id, "Worker started");
            while let Some(message) = rx.recv().await {
                if let Err(e) = handler.handle(message).await {
                    warn!(conversation = %id, error = %e, "Failed to deliver reply");
                }
            }
            debug!(conversation = %id, "Worker stopped");
        }));

        self.workers.insert(conversation, tx.clone());
        tx
    }

    /// Number of conversations with a live worker.
    pub fn active_conversations(&self) -> usize {
        self.workers.values().filter(|tx| !tx.is_closed()).count()
    }

    /// Pump `inbound` until the channel closes, then drain every worker.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<Result<ChannelMessage, ChannelError>>) {
        while let Some(item) = inbound.recv().await {
            match item {
                Ok(message) => self.dispatch(message),
                Err(e) => warn!(error = %e, "Channel error"),
            }
        }
        self.shutdown().await;
    }

    /// Stop accepting messages and wait until queued ones are handled.
    pub async fn shutdown(mut self) {
        self.workers.clear();
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task failed");
            }
        }
        info!(workers = count, "Dispatcher stopped");
    }
}
