//! `chatrecall onboard`: First-time setup.

use chatrecall_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🧠 ChatRecall — First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set provider.api_key (or TOGETHER_API_KEY)");
    println!("   2. Set telegram.bot_token (or TELEGRAM_TOKEN) and bot.identity");
    println!("   3. Point store.url at Qdrant, or set store.backend = \"memory\"");
    println!("   4. Run: chatrecall doctor\n");

    println!("🎉 Setup complete! Try `chatrecall chat` for a local session.\n");

    Ok(())
}
