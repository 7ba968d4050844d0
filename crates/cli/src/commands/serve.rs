//! `chatrecall run`: Serve Telegram group chats.

use std::sync::Arc;

use chatrecall_channels::{TelegramChannel, TelegramConfig};
use chatrecall_config::AppConfig;
use tracing::info;

use crate::runtime::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let bot_token = config
        .telegram
        .bot_token
        .clone()
        .ok_or("No Telegram token — set telegram.bot_token or TELEGRAM_TOKEN")?;
    let channel = Arc::new(TelegramChannel::new(TelegramConfig {
        bot_token,
        bot_username: config.bot.identity.clone(),
        poll_timeout_secs: config.telegram.poll_timeout_secs,
    }));

    let runtime = Runtime::from_config(config);
    println!("🧠 ChatRecall serving Telegram as {}", runtime.config.bot_handle());
    println!("   Press Ctrl+C to stop.\n");

    runtime.serve(channel).await?;
    info!("ChatRecall stopped");
    Ok(())
}
