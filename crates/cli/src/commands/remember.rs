//! `chatrecall remember`: Store one message in long-term memory.

use chatrecall_config::AppConfig;
use chatrecall_core::conversation::ConversationId;

use crate::runtime::Runtime;

pub async fn run(
    text: String,
    conversation: String,
    author: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err("Nothing to remember".into());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.store.backend == "memory" {
        println!("⚠️  The memory store is not persistent; this entry is lost on exit.");
    }
    let runtime = Runtime::from_config(config);

    let conversation = ConversationId::new(conversation);
    let message_id = format!("cli-{}", uuid::Uuid::new_v4());
    let ack = runtime
        .orchestrator
        .remember(&conversation, &message_id, &author, &text)
        .await?;

    println!("{ack}");
    Ok(())
}
