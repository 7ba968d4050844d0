//! Command classification.
//!
//! Decides what an inbound chat message asks for before anything touches
//! the conversation core. Classification is a pure function of the message
//! and the [`CommandPolicy`].

use chatrecall_config::BotConfig;
use chatrecall_core::channel::ChannelMessage;
use thiserror::Error;

/// What a message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ordinary chat: record it, say nothing.
    Track,
    /// Store `text` verbatim in long-term memory.
    Remember { text: String },
    /// Answer `query` from a web search; `text` is the whole command as
    /// written after the mention.
    WebSearch { query: String, text: String },
    /// Answer `text` from memory.
    Query { text: String },
}

/// The message addressed the bot but carried no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("command has no text after the bot mention")]
pub struct EmptyInput;

/// Trigger phrases and the bot handle used for classification.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    bot_handle: String,
    remember_triggers: Vec<String>,
    web_search_triggers: Vec<String>,
}

impl CommandPolicy {
    pub fn new(
        bot_handle: impl Into<String>,
        remember_triggers: Vec<String>,
        web_search_triggers: Vec<String>,
    ) -> Self {
        let bot_handle = bot_handle.into();
        let bot_handle = if bot_handle.starts_with('@') {
            bot_handle
        } else {
            format!("@{bot_handle}")
        };
        Self {
            bot_handle,
            remember_triggers: remember_triggers.into_iter().filter(|t| !t.is_empty()).collect(),
            web_search_triggers: web_search_triggers.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    pub fn from_bot_config(bot: &BotConfig) -> Self {
        Self::new(
            bot.identity.clone(),
            bot.remember_triggers.clone(),
            bot.web_search_triggers.clone(),
        )
    }

    pub fn bot_handle(&self) -> &str {
        &self.bot_handle
    }

    /// Hint sent back when a command has no text.
    pub fn usage_hint(&self) -> String {
        format!(
            "❗️ Укажи вопрос после {handle}.\nПример: {handle} Как дела?",
            handle = self.bot_handle
        )
    }

    pub fn classify(&self, message: &ChannelMessage) -> Result<Command, EmptyInput> {
        let content = message.content.trim();

        let text = if let Some(rest) = self.strip_mention(content) {
            rest
        } else if message.is_reply_to_bot {
            content
        } else {
            return Ok(Command::Track);
        };

        if text.is_empty() {
            return Err(EmptyInput);
        }

        if self.remember_triggers.iter().any(|t| find_ci(text, t).is_some()) {
            return Ok(Command::Remember { text: text.to_string() });
        }

        for trigger in &self.web_search_triggers {
            if let Some((start, end)) = find_ci(text, trigger) {
                let query = join_around(&text[..start], &text[end..]);
                if query.is_empty() {
                    return Err(EmptyInput);
                }
                return Ok(Command::WebSearch {
                    query,
                    text: text.to_string(),
                });
            }
        }

        Ok(Command::Query { text: text.to_string() })
    }

    /// Text after a leading bot mention, or `None` when the message does
    /// not start with one. `@bot_helper` does not count as `@bot`.
    fn strip_mention<'a>(&self, content: &'a str) -> Option<&'a str> {
        let (start, end) = find_ci(content, &self.bot_handle)?;
        if start != 0 {
            return None;
        }
        let rest = &content[end..];
        if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            return None;
        }
        Some(rest.trim_start_matches([',', ':']).trim())
    }
}

/// Byte range of the first case-insensitive occurrence of `needle`.
fn find_ci(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return None;
    }

    'outer: for (start, _) in haystack.char_indices() {
        let mut rest = haystack[start..].char_indices();
        let mut end = start;
        for expected in &needle {
            match rest.next() {
                Some((offset, c)) if eq_ci(c, *expected) => end = start + offset + c.len_utf8(),
                _ => continue 'outer,
            }
        }
        return Some((start, end));
    }
    None
}

fn eq_ci(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn join_around(before: &str, after: &str) -> String {
    let joined = format!("{before} {after}");
    joined
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches([',', ':', ' '])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CommandPolicy {
        CommandPolicy::new("recall_bot", vec!["запомни".into()], vec!["загугли".into()])
    }

    fn msg(content: &str) -> ChannelMessage {
        ChannelMessage::plain("c1", "1", "@alice", content)
    }

    fn reply(content: &str) -> ChannelMessage {
        let mut m = msg(content);
        m.is_reply_to_bot = true;
        m
    }

    #[test]
    fn plain_message_is_tracked() {
        assert_eq!(policy().classify(&msg("всем привет")), Ok(Command::Track));
    }

    #[test]
    fn mention_in_the_middle_is_tracked() {
        assert_eq!(
            policy().classify(&msg("спроси у @recall_bot потом")),
            Ok(Command::Track)
        );
    }

    #[test]
    fn leading_mention_is_a_query() {
        assert_eq!(
            policy().classify(&msg("@recall_bot когда созвон?")),
            Ok(Command::Query { text: "когда созвон?".into() })
        );
    }

    #[test]
    fn mention_match_ignores_case_but_not_longer_names() {
        assert_eq!(
            policy().classify(&msg("@Recall_Bot, привет")),
            Ok(Command::Query { text: "привет".into() })
        );
        assert_eq!(policy().classify(&msg("@recall_bot2 привет")), Ok(Command::Track));
    }

    #[test]
    fn bare_mention_is_empty_input() {
        assert_eq!(policy().classify(&msg("@recall_bot")), Err(EmptyInput));
        assert_eq!(policy().classify(&msg("  @recall_bot   ")), Err(EmptyInput));
    }

    #[test]
    fn reply_to_bot_uses_full_text() {
        assert_eq!(
            policy().classify(&reply("а подробнее?")),
            Ok(Command::Query { text: "а подробнее?".into() })
        );
        assert_eq!(policy().classify(&reply("   ")), Err(EmptyInput));
    }

    #[test]
    fn remember_trigger_is_case_insensitive() {
        assert_eq!(
            policy().classify(&msg("@recall_bot ЗАПОМНИ: купить молоко")),
            Ok(Command::Remember { text: "ЗАПОМНИ: купить молоко".into() })
        );
        assert_eq!(
            policy().classify(&reply("Запомни пароль от wifi")),
            Ok(Command::Remember { text: "Запомни пароль от wifi".into() })
        );
    }

    #[test]
    fn web_search_strips_trigger() {
        assert_eq!(
            policy().classify(&msg("@recall_bot загугли курс биткоина")),
            Ok(Command::WebSearch {
                query: "курс биткоина".into(),
                text: "загугли курс биткоина".into(),
            })
        );
        assert_eq!(
            policy().classify(&msg("@recall_bot погоду в Москве Загугли")),
            Ok(Command::WebSearch {
                query: "погоду в Москве".into(),
                text: "погоду в Москве Загугли".into(),
            })
        );
    }

    #[test]
    fn remember_takes_precedence_over_web_search() {
        assert_eq!(
            policy().classify(&msg("@recall_bot загугли и запомни")),
            Ok(Command::Remember { text: "загугли и запомни".into() })
        );
    }

    #[test]
    fn web_search_without_query_is_empty_input() {
        assert_eq!(policy().classify(&msg("@recall_bot загугли")), Err(EmptyInput));
    }

    #[test]
    fn usage_hint_names_the_bot() {
        assert_eq!(
            policy().usage_hint(),
            "❗️ Укажи вопрос после @recall_bot.\nПример: @recall_bot Как дела?"
        );
    }

    #[test]
    fn find_ci_handles_multibyte_text() {
        assert_eq!(find_ci("Привет ЗАГУГЛИ", "загугли"), Some((13, 27)));
        assert_eq!(find_ci("abc", ""), None);
        assert_eq!(find_ci("abc", "abcd"), None);
    }
}
