//! Chat transports and inbound message routing for ChatRecall.
//!
//! - **Telegram**: Bot API long polling
//! - **Terminal**: a local chat on stdin/stdout
//! - **Command router**: classifies each message and drives the core
//! - **Dispatcher**: one ordered worker per conversation

pub mod command;
pub mod dispatcher;
pub mod router;
pub mod telegram;
pub mod terminal;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use command::{Command, CommandPolicy, EmptyInput};
pub use dispatcher::Dispatcher;
pub use router::{CommandRouter, MessageHandler, user_error_text};
pub use telegram::{TelegramChannel, TelegramConfig};
pub use terminal::{TERMINAL_CONVERSATION, TerminalChannel};
