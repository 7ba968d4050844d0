//! `chatrecall ask`: Ask one question and print the answer.

use chatrecall_agent::QueryRequest;
use chatrecall_channels::user_error_text;
use chatrecall_config::AppConfig;
use chatrecall_core::conversation::ConversationId;

use crate::runtime::Runtime;

pub async fn run(
    question: String,
    conversation: String,
    author: String,
    web: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let question = question.trim().to_string();
    if question.is_empty() {
        return Err("Question must not be empty".into());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let runtime = Runtime::from_config(config);

    let id = uuid::Uuid::new_v4();
    let request = QueryRequest {
        conversation_id: ConversationId::new(conversation),
        message_id: format!("ask-{id}"),
        response_message_id: format!("answer-{id}"),
        author,
        text: question,
        query: None,
    };

    let outcome = if web {
        runtime.orchestrator.web_search(&request).await
    } else {
        runtime.orchestrator.answer(&request).await
    };

    match outcome {
        Ok(answer) => {
            println!("🤖 {answer}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", user_error_text(&e));
            Err(e.into())
        }
    }
}
