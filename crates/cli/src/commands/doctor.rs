//! `chatrecall doctor`: Diagnose backend health.

use std::sync::Arc;

use chatrecall_channels::{TelegramChannel, TelegramConfig};
use chatrecall_config::AppConfig;
use chatrecall_core::channel::Channel;

use crate::runtime::Runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 ChatRecall Doctor — Backend Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found");
    } else {
        println!("  ⚠️  No config file — run `chatrecall onboard` (using defaults)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    if config.provider.api_key.is_none() {
        println!("  ⚠️  No API key configured — set provider.api_key or TOGETHER_API_KEY");
        issues += 1;
    }

    let runtime = Runtime::from_config(config);

    match runtime.provider.health_check().await {
        Ok(true) => println!("  ✅ Provider '{}' reachable", runtime.provider.name()),
        Ok(false) => {
            println!("  ❌ Provider '{}' rejected the request", runtime.provider.name());
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Provider '{}' unreachable: {e}", runtime.provider.name());
            issues += 1;
        }
    }

    match runtime.index.health_check().await {
        Ok(true) => match runtime.index.count().await {
            Ok(count) => println!(
                "  ✅ Store '{}' reachable ({count} documents)",
                runtime.index.name()
            ),
            Err(e) => println!("  ⚠️  Store '{}' reachable, count failed: {e}", runtime.index.name()),
        },
        Ok(false) => {
            println!("  ❌ Store '{}' is not ready", runtime.index.name());
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Store '{}' unreachable: {e}", runtime.index.name());
            issues += 1;
        }
    }

    match runtime.config.telegram.bot_token.clone() {
        Some(bot_token) => {
            let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(TelegramConfig {
                bot_token,
                bot_username: runtime.config.bot.identity.clone(),
                poll_timeout_secs: runtime.config.telegram.poll_timeout_secs,
            }));
            match channel.health_check().await {
                Ok(true) => println!("  ✅ Telegram bot token accepted"),
                Ok(false) => {
                    println!("  ❌ Telegram rejected the bot token");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Telegram unreachable: {e}");
                    issues += 1;
                }
            }
        }
        None => println!("  ⚠️  No Telegram token — only `chat`, `ask` and `remember` will work"),
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
