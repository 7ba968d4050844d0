//! `chatrecall chat`: A local group chat in the terminal.

use std::sync::Arc;

use chatrecall_channels::TerminalChannel;
use chatrecall_config::AppConfig;

use crate::runtime::Runtime;

pub async fn run(author: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let handle = config.bot_handle();
    let runtime = Runtime::from_config(config);

    println!("🧠 ChatRecall — terminal chat");
    println!("   Lines are messages. Prefix `name:` to speak as someone else.");
    println!("   Address the bot with `{handle} ...`; `exit` or Ctrl+D to quit.\n");

    runtime.serve(Arc::new(TerminalChannel::new(author))).await
}
