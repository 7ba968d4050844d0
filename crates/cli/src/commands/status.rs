//! `chatrecall status`: Show the effective configuration.

use chatrecall_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let configured = |value: bool| if value { "configured" } else { "missing" };

    println!("🧠 ChatRecall Status");
    println!("===================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Bot:           {}", config.bot_handle());
    if !config.bot.participants.is_empty() {
        println!("  Participants:  {}", config.bot.participants.join(", "));
    }
    println!("  History size:  {}", config.bot.history_size);
    println!("  Top-k:         {}", config.bot.top_k);
    println!("  Provider:      {}", config.provider.name);
    println!("  Model:         {}", config.provider.model);
    println!("  Embeddings:    {}", config.provider.embedding_model);
    println!("  Temperature:   {}", config.provider.temperature);
    println!("  API key:       {}", configured(config.provider.api_key.is_some()));
    println!("  Store:         {}", config.store.backend);
    if config.store.backend == "qdrant" {
        println!("  Qdrant:        {} ({})", config.store.url, config.store.collection);
    }
    println!("  Vector size:   {}", config.store.vector_size);
    println!("  Web search:    {}", config.web_search.backend);
    println!(
        "  Telegram:      {}",
        configured(config.telegram.bot_token.is_some())
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `chatrecall onboard` first");
    }

    Ok(())
}
