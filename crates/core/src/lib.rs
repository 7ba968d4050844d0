//! # ChatRecall Core
//!
//! Domain types, collaborator traits, and error definitions for the ChatRecall
//! group-chat memory layer. This crate carries no transport, storage, or HTTP
//! code: it defines the model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`RetrievalIndex`] / [`Embedder`]: the semantic store
//! - [`Provider`]: the text-generation service
//! - [`WebSearch`]: ranked web snippets
//! - [`Channel`]: the chat transport
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted or in-memory versions.

pub mod channel;
pub mod conversation;
pub mod document;
pub mod error;
pub mod index;
pub mod provider;
pub mod search;

// Re-export key types at crate root for ergonomics
pub use channel::{Channel, ChannelMessage};
pub use conversation::ConversationId;
pub use document::{Document, format_entry};
pub use error::{Error, Result};
pub use index::{Embedder, RetrievalIndex};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use search::{WebResult, WebSearch};
