//! Telegram channel adapter over the Bot API.
//!
//! Long-polls `getUpdates` in a background task and converts text messages
//! into [`ChannelMessage`]s. Replies go out through `sendMessage`, the
//! pending placeholder is replaced with `editMessageText`. Answers longer
//! than one Telegram message continue in follow-up replies.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatrecall_core::channel::{Channel, ChannelMessage};
use chatrecall_core::conversation::ConversationId;
use chatrecall_core::error::ChannelError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const API_BASE: &str = "https://api.telegram.org";
const RETRY_DELAY: Duration = Duration::from_secs(5);
/// Longest text Telegram accepts in one message, in characters.
const MESSAGE_LIMIT: usize = 4096;

/// Telegram channel configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: String,
    /// Bot username without the leading `@`.
    pub bot_username: String,
    /// Long-polling timeout for `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("bot_username", &self.bot_username)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

/// Thin Bot API client shared with the polling task.
struct BotApi {
    base: String,
    client: reqwest::Client,
}

impl BotApi {
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, ChannelError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.base))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidPayload(e.to_string()))?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(ChannelError::DeliveryFailed {
                channel: "telegram".into(),
                reason: format!("{method}: {}", description.unwrap_or_else(|| "no result".into())),
            }),
        }
    }
}

/// Telegram channel adapter.
pub struct TelegramChannel {
    config: TelegramConfig,
    api: Arc<BotApi>,
    running: Arc<AtomicBool>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self::with_api_base(config, API_BASE)
    }

    /// Point the client at a different Bot API server.
    pub fn with_api_base(config: TelegramConfig, api_base: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let base = format!("{}/bot{}", api_base.trim_end_matches('/'), config.bot_token);
        Self {
            config,
            api: Arc::new(BotApi { base, client }),
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        if self.config.bot_token.is_empty() {
            return Err(ChannelError::NotConfigured(
                "Telegram bot token is not set (TELEGRAM_TOKEN)".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let api = self.api.clone();
        let running = self.running.clone();
        let bot_username = self.config.bot_username.clone();
        let timeout = self.config.poll_timeout_secs;
        running.store(true, Ordering::SeqCst);

        info!(bot = %bot_username, "Telegram channel starting (long polling)");

        tokio::spawn(async move {
            let mut offset: i64 = 0;
            while running.load(Ordering::SeqCst) {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": timeout,
                    "allowed_updates": ["message"],
                });
                let updates: Vec<Update> = match api.call("getUpdates", &body).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        warn!(error = %e, "getUpdates failed, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(message) = convert_update(update, &bot_username) else {
                        continue;
                    };
                    if tx.send(Ok(message)).await.is_err() {
                        debug!("Receiver dropped, stopping poller");
                        return;
                    }
                }
            }
            info!("Telegram poller stopped");
        });

        Ok(rx)
    }

    async fn send(
        &self,
        chat_id: &ConversationId,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<String, ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id_value(chat_id),
            "text": content,
        });
        if let Some(id) = reply_to.and_then(|id| id.parse::<i64>().ok()) {
            body["reply_parameters"] = serde_json::json!({
                "message_id": id,
                "allow_sending_without_reply": true,
            });
        }

        let sent: TgMessage = self.api.call("sendMessage", &body).await?;
        debug!(chat_id = %chat_id, message_id = sent.message_id, "Telegram message sent");
        Ok(sent.message_id.to_string())
    }

    async fn edit(
        &self,
        chat_id: &ConversationId,
        message_id: &str,
        content: &str,
    ) -> Result<(), ChannelError> {
        let id: i64 = message_id.parse().map_err(|_| {
            ChannelError::InvalidPayload(format!("not a Telegram message id: {message_id}"))
        })?;
        let chunks = split_message(content, MESSAGE_LIMIT);
        let (first, rest) = chunks.split_first().unwrap_or((&content, &[]));

        let body = serde_json::json!({
            "chat_id": chat_id_value(chat_id),
            "message_id": id,
            "text": first,
        });
        // Returns the edited Message; only success matters here.
        let _: serde_json::Value = self.api.call("editMessageText", &body).await?;

        for chunk in rest {
            self.send(chat_id, chunk, Some(message_id)).await?;
        }
        if !rest.is_empty() {
            debug!(chat_id = %chat_id, parts = chunks.len(), "Long answer split");
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: &ConversationId) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id_value(chat_id),
            "action": "typing",
        });
        let _: bool = self.api.call("sendChatAction", &body).await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Telegram channel stopping");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        if self.config.bot_token.is_empty() {
            return Ok(false);
        }
        let me: TgUser = self.api.call("getMe", &serde_json::json!({})).await?;
        Ok(me.is_bot)
    }
}

/// Cut `text` into pieces of at most `limit` characters, preferring to
/// break after a newline. The newline at a break is dropped.
fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while let Some((cut, _)) = rest.char_indices().nth(limit) {
        let (chunk, next) = if rest[cut..].starts_with('\n') {
            (&rest[..cut], &rest[cut + 1..])
        } else {
            match rest[..cut].rfind('\n') {
                Some(nl) if nl > 0 => (&rest[..nl], &rest[nl + 1..]),
                _ => (&rest[..cut], &rest[cut..]),
            }
        };
        chunks.push(chunk);
        rest = next;
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Numeric chat ids go out as numbers, anything else as a string.
fn chat_id_value(chat_id: &ConversationId) -> serde_json::Value {
    match chat_id.as_str().parse::<i64>() {
        Ok(id) => serde_json::json!(id),
        Err(_) => serde_json::json!(chat_id.as_str()),
    }
}

/// Convert an update into a channel message. Non-text updates yield `None`.
fn convert_update(update: Update, bot_username: &str) -> Option<ChannelMessage> {
    let message = update.message?;
    let text = message.text?;
    let from = message.from?;

    let is_reply_to_bot = message
        .reply_to_message
        .as_ref()
        .and_then(|r| r.from.as_ref())
        .and_then(|u| u.username.as_deref())
        .is_some_and(|name| name.eq_ignore_ascii_case(bot_username));
    let handle = format!("@{bot_username}").to_lowercase();
    let mentions_bot = text.to_lowercase().contains(&handle);

    Some(ChannelMessage {
        conversation_id: ConversationId::from(message.chat.id),
        message_id: message.message_id.to_string(),
        sender: from.handle(),
        content: text,
        is_reply_to_bot,
        mentions_bot,
    })
}

// --- Bot API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    #[serde(default)]
    from: Option<TgUser>,
    chat: TgChat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: String,
}

impl TgUser {
    /// `@username`, falling back to the first name or the numeric id.
    fn handle(&self) -> String {
        match (&self.username, self.first_name.is_empty()) {
            (Some(name), _) => format!("@{name}"),
            (None, false) => self.first_name.clone(),
            (None, true) => format!("id{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:test-token".into(),
            bot_username: "recall_bot".into(),
            poll_timeout_secs: 1,
        }
    }

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn channel_name_and_redacted_debug() {
        let ch = TelegramChannel::new(test_config());
        assert_eq!(ch.name(), "telegram");
        assert!(!format!("{:?}", test_config()).contains("test-token"));
        assert!(ch.api.base.ends_with("/bot123:test-token"));
    }

    #[test]
    fn converts_group_text_message() {
        let msg = convert_update(
            update(
                r#"{"update_id": 10, "message": {
                    "message_id": 42,
                    "from": {"id": 1, "is_bot": false, "first_name": "Dan", "username": "dan"},
                    "chat": {"id": -1001234, "type": "supergroup"},
                    "date": 1700000000,
                    "text": "@Recall_Bot когда созвон?"
                }}"#,
            ),
            "recall_bot",
        )
        .unwrap();

        assert_eq!(msg.conversation_id.as_str(), "-1001234");
        assert_eq!(msg.message_id, "42");
        assert_eq!(msg.sender, "@dan");
        assert!(msg.mentions_bot);
        assert!(!msg.is_reply_to_bot);
    }

    #[test]
    fn detects_reply_to_bot() {
        let msg = convert_update(
            update(
                r#"{"update_id": 11, "message": {
                    "message_id": 43,
                    "from": {"id": 2, "is_bot": false, "first_name": "Лёша"},
                    "chat": {"id": 5},
                    "text": "а подробнее?",
                    "reply_to_message": {
                        "message_id": 40,
                        "from": {"id": 99, "is_bot": true, "first_name": "Bot", "username": "recall_bot"},
                        "chat": {"id": 5},
                        "text": "В пятницу"
                    }
                }}"#,
            ),
            "recall_bot",
        )
        .unwrap();

        assert!(msg.is_reply_to_bot);
        assert_eq!(msg.sender, "Лёша");
    }

    #[test]
    fn skips_non_text_updates() {
        assert!(convert_update(update(r#"{"update_id": 12}"#), "recall_bot").is_none());
        assert!(
            convert_update(
                update(
                    r#"{"update_id": 13, "message": {
                        "message_id": 1, "from": {"id": 1}, "chat": {"id": 5},
                        "photo": []
                    }}"#
                ),
                "recall_bot"
            )
            .is_none()
        );
    }

    #[test]
    fn parses_error_envelope() {
        let parsed: ApiResponse<TgMessage> = serde_json::from_str(
            r#"{"ok": false, "error_code": 400, "description": "Bad Request: message is not modified"}"#,
        )
        .unwrap();
        assert!(!parsed.ok);
        assert!(parsed.result.is_none());
        assert!(parsed.description.unwrap().contains("not modified"));
    }

    #[test]
    fn chat_ids_serialize_as_numbers_when_possible() {
        assert_eq!(chat_id_value(&ConversationId::from(-100i64)), serde_json::json!(-100));
        assert_eq!(chat_id_value(&ConversationId::from("terminal")), serde_json::json!("terminal"));
    }

    #[tokio::test]
    async fn start_requires_token() {
        let ch = TelegramChannel::new(TelegramConfig {
            bot_token: String::new(),
            ..test_config()
        });
        assert!(matches!(ch.start().await, Err(ChannelError::NotConfigured(_))));
        assert!(!ch.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_api_is_connection_lost() {
        let ch = TelegramChannel::with_api_base(test_config(), "http://127.0.0.1:9");
        let err = ch
            .send(&ConversationId::from(5i64), "hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::ConnectionLost(_)));
    }

    #[tokio::test]
    async fn edit_rejects_non_numeric_ids() {
        let ch = TelegramChannel::with_api_base(test_config(), "http://127.0.0.1:9");
        let err = ch
            .edit(&ConversationId::from(5i64), "abc", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPayload(_)));
    }

    #[test]
    fn short_text_is_one_message() {
        assert_eq!(split_message("привет", MESSAGE_LIMIT), vec!["привет"]);
        assert_eq!(split_message("", MESSAGE_LIMIT), vec![""]);
    }

    #[test]
    fn long_text_splits_on_char_boundaries() {
        let text = "ж".repeat(10);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks, vec!["жжжж", "жжжж", "жж"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn long_text_prefers_newline_breaks() {
        let chunks = split_message("abc\ndefgh\nij", 9);
        assert_eq!(chunks, vec!["abc\ndefgh", "ij"]);

        let chunks = split_message("abc\ndefgh\nij", 8);
        assert_eq!(chunks, vec!["abc", "defgh\nij"]);

        let chunks = split_message("abcdefghij\nk", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij\nk"]);

        assert_eq!(split_message("abcd\n", 4), vec!["abcd"]);
    }

    type ApiCalls = Arc<std::sync::Mutex<Vec<(String, serde_json::Value)>>>;

    /// Minimal Bot API stand-in: records `(method, body)` per call and
    /// answers every `sendMessage` with message id 900.
    async fn fake_bot_api() -> (String, ApiCalls) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let calls = ApiCalls::default();
        let recorded = calls.clone();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                if answer_api_call(socket, &recorded).await.is_err() {
                    return;
                }
            }
        });

        (base, calls)
    }

    async fn answer_api_call(
        mut socket: tokio::net::TcpStream,
        recorded: &ApiCalls,
    ) -> std::io::Result<()> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let length: usize = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        while buf.len() < head_end + length {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let path = head.split_whitespace().nth(1).unwrap_or_default();
        let method = path.rsplit('/').next().unwrap_or_default().to_string();
        let body: serde_json::Value =
            serde_json::from_slice(&buf[head_end..head_end + length]).unwrap_or_default();
        recorded.lock().unwrap().push((method.clone(), body));

        let reply = if method == "sendMessage" {
            r#"{"ok":true,"result":{"message_id":900,"chat":{"id":5}}}"#
        } else {
            r#"{"ok":true,"result":true}"#
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
            reply.len()
        );
        socket.write_all(response.as_bytes()).await?;
        socket.shutdown().await
    }

    #[tokio::test]
    async fn long_edit_continues_in_follow_up_replies() {
        let (base, calls) = fake_bot_api().await;
        let ch = TelegramChannel::with_api_base(test_config(), &base);
        let answer = format!("{}\n{}", "а".repeat(MESSAGE_LIMIT), "конец");

        ch.edit(&ConversationId::from(5i64), "42", &answer).await.unwrap();

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "editMessageText");
        assert_eq!(calls[0].1["message_id"], 42);
        assert_eq!(calls[0].1["text"].as_str().unwrap().chars().count(), MESSAGE_LIMIT);
        assert_eq!(calls[1].0, "sendMessage");
        assert_eq!(calls[1].1["text"], "конец");
        assert_eq!(calls[1].1["reply_parameters"]["message_id"], 42);
    }

    #[tokio::test]
    async fn short_edit_is_a_single_call() {
        let (base, calls) = fake_bot_api().await;
        let ch = TelegramChannel::with_api_base(test_config(), &base);

        ch.edit(&ConversationId::from(5i64), "42", "готово").await.unwrap();

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["text"], "готово");
    }
}
