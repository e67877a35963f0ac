//! Chat-completions request body construction.
//!
//! Pure: the same history, message and config always produce the same body,
//! and nothing here touches the history store.

use serde_json::Value;
use ua_domain::config::AgentConfig;
use ua_domain::message::Message;

/// Render the request body for one turn.
///
/// `history` is the stored conversation *before* this turn; `user_text` is
/// the new message after file inclusion has been resolved. `config` is the
/// already-merged config for this call.
pub fn build_payload(history: &[Message], user_text: &str, config: &AgentConfig) -> Value {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if let Some(ref prompt) = config.system_prompt {
        messages.push(text_turn("developer", prompt));
    }
    messages.extend(history.iter().map(|m| text_turn(m.role.as_str(), &m.content)));
    messages.push(text_turn("user", user_text));

    let mut body = serde_json::json!({
        "model": config.model.as_str(),
        "messages": messages,
        "response_format": { "type": config.text_format.as_str() },
        "reasoning_effort": config.reasoning_effort.as_str(),
    });

    if let Some(max) = config.effective_max_output_tokens() {
        body["max_completion_tokens"] = serde_json::json!(max);
    }
    if config.stream {
        body["stream"] = Value::Bool(true);
    }
    // Only sent when they differ from the provider default.
    if config.temperature != 1.0 {
        body["temperature"] = serde_json::json!(config.temperature);
    }
    if config.top_p != 1.0 {
        body["top_p"] = serde_json::json!(config.top_p);
    }
    body
}

fn text_turn(role: &str, text: &str) -> Value {
    serde_json::json!({
        "role": role,
        "content": [{ "type": "text", "text": text }],
    })
}
