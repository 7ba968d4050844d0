//! Generation request composition.
//!
//! A prompt is the persona, the chat history, the question being answered,
//! and one context section: either snippets recalled from memory or results
//! from a web search.

use chatrecall_config::BotConfig;
use chatrecall_core::search::WebResult;

/// Shown in the memory section when retrieval finds nothing.
pub const MEMORY_PLACEHOLDER: &str = "Пока ничего не помнишь.";

/// Shown in the search section when the web search finds nothing.
pub const SEARCH_PLACEHOLDER: &str = "Ничего не нашлось.";

/// Persona and participant identities injected into every prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptConfig {
    pub persona: String,
    pub participants: Vec<String>,
}

impl PromptConfig {
    pub fn from_bot_config(bot: &BotConfig) -> Self {
        Self {
            persona: bot.persona.clone(),
            participants: bot.participants.clone(),
        }
    }
}

/// The context section appended after the question.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextSection {
    /// Texts recalled from the retrieval index, in retrieval order.
    Memory(Vec<String>),
    /// Web search hits, best first.
    Web(Vec<WebResult>),
}

impl ContextSection {
    /// Body of the section: entries joined by newlines, or the placeholder.
    pub fn body(&self) -> String {
        match self {
            ContextSection::Memory(snippets) if snippets.is_empty() => MEMORY_PLACEHOLDER.into(),
            ContextSection::Memory(snippets) => snippets.join("\n"),
            ContextSection::Web(results) if results.is_empty() => SEARCH_PLACEHOLDER.into(),
            ContextSection::Web(results) => results
                .iter()
                .map(WebResult::render)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn render(&self) -> String {
        match self {
            ContextSection::Memory(_) => {
                format!("## Информация из твоей памяти:\n<MEMORY>{}</MEMORY>", self.body())
            }
            ContextSection::Web(_) => {
                format!("## Найденные сайты по теме:\n<SEARCH>{}</SEARCH>", self.body())
            }
        }
    }
}

impl PromptConfig {
    /// Compose the full prompt. `history` is oldest first and already
    /// contains the question being answered.
    pub fn compose(
        &self,
        history: &[String],
        author: &str,
        query: &str,
        context: &ContextSection,
    ) -> String {
        let mut prompt = String::new();

        if !self.persona.is_empty() {
            prompt.push_str(self.persona.trim());
            prompt.push('\n');
        }
        if !self.participants.is_empty() {
            prompt.push_str(&format!("Участники чата: {}.\n", self.participants.join(", ")));
        }
        if !prompt.is_empty() {
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            "## История чата:\n<DIALOG>{}</DIALOG>\n\n",
            history.join("\n")
        ));
        prompt.push_str(&format!(
            "Теперь ответь на последнее сообщение от {author}: \"{query}\".\n\n"
        ));
        prompt.push_str(&context.render());
        prompt.push('\n');
        prompt
    }
}
