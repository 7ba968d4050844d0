//! The ChatRecall conversation core.
//!
//! Every message a group chat produces flows through here:
//!
//! 1. **Track**: plain messages join the short-term history window and are
//!    grouped into author-streak documents ([`DocumentAssembler`])
//! 2. **Recall**: questions addressed to the bot retrieve related documents
//!    from long-term memory, or search the web ([`QueryOrchestrator`])
//! 3. **Answer**: the prompt combines persona, history, question and the
//!    recalled context; the generated answer is itself remembered
//!
//! Per-conversation state lives in a [`ConversationStore`]; each operation
//! holds its conversation's lock from start to finish.

pub mod assembler;
pub mod history;
pub mod orchestrator;
pub mod prompt;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use assembler::DocumentAssembler;
pub use history::{HistoryBuffer, HistoryWindow};
pub use orchestrator::{OrchestratorConfig, QueryOrchestrator, QueryRequest, REMEMBER_ACK};
pub use prompt::{ContextSection, MEMORY_PLACEHOLDER, PromptConfig, SEARCH_PLACEHOLDER};
pub use store::{ConversationState, ConversationStore};
