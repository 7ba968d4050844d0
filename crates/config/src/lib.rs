//! Configuration loading, validation, and management for ChatRecall.
//!
//! Loads configuration from `~/.chatrecall/config.toml`, then applies
//! environment variable overrides (the same variable names the bot has
//! always been deployed with). Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatrecall/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bot identity, participants, memory window, and command triggers
    #[serde(default)]
    pub bot: BotConfig,

    /// Generation + embedding provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Retrieval index backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Web search backend
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Telegram transport
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// The bot's username without the leading `@`
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Chat participants as they appear in messages (e.g. `@alice`)
    #[serde(default)]
    pub participants: Vec<String>,

    /// Sliding-window capacity of the per-chat history
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Retrieval breadth (top-k) for memory and web search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Persona / instruction text placed at the top of every prompt
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Case-insensitive substrings that turn a command into "remember"
    #[serde(default = "default_remember_triggers")]
    pub remember_triggers: Vec<String>,

    /// Case-insensitive substrings that turn a command into a web search
    #[serde(default = "default_web_search_triggers")]
    pub web_search_triggers: Vec<String>,

    /// Placeholder replies shown while an answer is being generated.
    /// Empty = use the fixed per-command placeholders.
    #[serde(default)]
    pub pending_messages: Vec<String>,
}

fn default_identity() -> String {
    "chatrecall_bot".into()
}
fn default_history_size() -> usize {
    10
}
fn default_top_k() -> usize {
    3
}
fn default_persona() -> String {
    "Ты — бот в групповом чате друзей. Отвечай максимально коротко и по делу. \
     Не пиши лишнего. Используй историю чата и свою память."
        .into()
}
fn default_remember_triggers() -> Vec<String> {
    vec!["запомни".into()]
}
fn default_web_search_triggers() -> Vec<String> {
    vec!["загугли".into()]
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            participants: vec![],
            history_size: default_history_size(),
            top_k: default_top_k(),
            persona: default_persona(),
            remember_triggers: default_remember_triggers(),
            web_search_triggers: default_web_search_triggers(),
            pending_messages: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name, used to pick a default base URL
    #[serde(default = "default_provider")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_provider() -> String {
    "together".into()
}
fn default_model() -> String {
    "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_embedding_model() -> String {
    "togethercomputer/m2-bert-80M-32k-retrieval".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider(),
            api_key: None,
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            embedding_model: default_embedding_model(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "qdrant"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default = "default_store_url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Embedding dimensionality; must match the embedding model
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,
}

fn default_store_backend() -> String {
    "qdrant".into()
}
fn default_store_url() -> String {
    "http://localhost:6333".into()
}
fn default_collection() -> String {
    "telegram_history".into()
}
fn default_vector_size() -> usize {
    1024
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
            api_key: None,
            collection: default_collection(),
            vector_size: default_vector_size(),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("collection", &self.collection)
            .field("vector_size", &self.vector_size)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// "duckduckgo", "google", or "none"
    #[serde(default = "default_search_backend")]
    pub backend: String,

    /// Google Custom Search API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Google Custom Search engine id (`cx`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,
}

fn default_search_backend() -> String {
    "duckduckgo".into()
}
fn default_region() -> String {
    "ru-ru".into()
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            backend: default_search_backend(),
            api_key: None,
            engine_id: None,
            region: default_region(),
        }
    }
}

impl std::fmt::Debug for WebSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearchConfig")
            .field("backend", &self.backend)
            .field("api_key", &redact(&self.api_key))
            .field("engine_id", &self.engine_id)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Long-polling timeout passed to `getUpdates`
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_poll_timeout() -> u64 {
    20
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

const STORE_BACKENDS: &[&str] = &["memory", "qdrant"];
const SEARCH_BACKENDS: &[&str] = &["duckduckgo", "google", "none"];

impl AppConfig {
    /// Load configuration from the default path (~/.chatrecall/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("TELEGRAM_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(name) = lookup("BOT_USERNAME") {
            self.bot.identity = name.trim_start_matches('@').to_string();
        }
        if let Some(raw) = lookup("N_LAST_MESSAGES") {
            match raw.trim().parse() {
                Ok(n) => self.bot.history_size = n,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid N_LAST_MESSAGES"),
            }
        }
        if let Some(raw) = lookup("BOT_PARTICIPANTS") {
            self.bot.participants = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if self.provider.api_key.is_none() {
            self.provider.api_key =
                lookup("CHATRECALL_API_KEY").or_else(|| lookup("TOGETHER_API_KEY"));
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.provider.model = model;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.provider.embedding_model = model;
        }

        if let Some(host) = lookup("QDRANT_HOST") {
            self.store.url = if host.contains("://") {
                host
            } else {
                format!("http://{host}")
            };
        }
        if let Some(key) = lookup("QDRANT_API_KEY") {
            if !key.is_empty() {
                self.store.api_key = Some(key);
            }
        }
        if let Some(collection) = lookup("QDRANT_COLLECTION") {
            self.store.collection = collection;
        }

        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.web_search.api_key = Some(key);
        }
        if let Some(engine) = lookup("SEARCH_ENGINE") {
            self.web_search.engine_id = Some(engine);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatrecall")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.identity.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bot.identity must not be empty".into(),
            ));
        }
        if self.bot.history_size == 0 {
            return Err(ConfigError::ValidationError(
                "bot.history_size must be at least 1".into(),
            ));
        }
        if self.bot.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "bot.top_k must be at least 1".into(),
            ));
        }
        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.store.vector_size == 0 {
            return Err(ConfigError::ValidationError(
                "store.vector_size must be at least 1".into(),
            ));
        }
        if !STORE_BACKENDS.contains(&self.store.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown store.backend '{}' (expected one of: {})",
                self.store.backend,
                STORE_BACKENDS.join(", ")
            )));
        }
        if !SEARCH_BACKENDS.contains(&self.web_search.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown web_search.backend '{}' (expected one of: {})",
                self.web_search.backend,
                SEARCH_BACKENDS.join(", ")
            )));
        }
        Ok(())
    }

    /// The bot identity as it appears in chat (`@name`).
    pub fn bot_handle(&self) -> String {
        format!("@{}", self.bot.identity)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.bot.history_size, 10);
        assert_eq!(config.bot.top_k, 3);
        assert_eq!(config.store.collection, "telegram_history");
        assert_eq!(config.store.vector_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.bot.identity, config.bot.identity);
        assert_eq!(parsed.provider.model, config.provider.model);
        assert_eq!(parsed.bot.remember_triggers, vec!["запомни".to_string()]);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[bot]
identity = "memo_bot"
participants = ["@dan", "@alex", "@artem"]
history_size = 4

[store]
backend = "memory"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.bot.identity, "memo_bot");
        assert_eq!(config.bot.participants.len(), 3);
        assert_eq!(config.bot.history_size, 4);
        assert_eq!(config.bot.top_k, 3);
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.web_search.region, "ru-ru");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bot\nidentity = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.name, "together");
    }

    #[test]
    fn zero_history_rejected() {
        let mut config = AppConfig::default();
        config.bot.history_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut config = AppConfig::default();
        config.bot.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_store_backend_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = "chroma".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chroma"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("BOT_USERNAME", "@memo_bot"),
            ("N_LAST_MESSAGES", "25"),
            ("TOGETHER_API_KEY", "tg-key"),
            ("QDRANT_HOST", "qdrant:6333"),
            ("QDRANT_COLLECTION", "history"),
            ("BOT_PARTICIPANTS", "@dan, @alex,,@artem"),
        ]));

        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.bot.identity, "memo_bot");
        assert_eq!(config.bot_handle(), "@memo_bot");
        assert_eq!(config.bot.history_size, 25);
        assert_eq!(config.provider.api_key.as_deref(), Some("tg-key"));
        assert_eq!(config.store.url, "http://qdrant:6333");
        assert_eq!(config.store.collection, "history");
        assert_eq!(config.bot.participants, vec!["@dan", "@alex", "@artem"]);
    }

    #[test]
    fn invalid_numeric_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[("N_LAST_MESSAGES", "lots")]));
        assert_eq!(config.bot.history_size, 10);
    }

    #[test]
    fn file_api_key_wins_over_env() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("from-file".into());
        config.apply_env_overrides(env(&[("TOGETHER_API_KEY", "from-env")]));
        assert_eq!(config.provider.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret".into());
        config.telegram.bot_token = Some("123:token".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("123:token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("telegram_history"));
        assert!(toml_str.contains("history_size"));
    }
}
