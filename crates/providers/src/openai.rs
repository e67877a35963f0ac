//! OpenAI chat-completions wire format: the reqwest transport and the
//! boundary parsers that turn response JSON into tagged variants.

use futures_util::StreamExt;
use serde_json::Value;
use ua_domain::error::{Error, Result};
use ua_domain::stream::{Completion, StreamEvent};

use crate::traits::{HttpReply, HttpRequest, HttpTransport};
use crate::util::from_reqwest;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("unified-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, req: HttpRequest<'_>) -> Result<HttpReply> {
        tracing::debug!(url = %req.url, timeout_secs = req.timeout.as_secs(), "chat request");

        let timeout = req.timeout;
        let resp = self
            .client
            .post(req.url)
            .bearer_auth(req.api_key)
            .json(req.body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| from_reqwest(e, timeout))?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes_stream()
            .map(move |chunk| chunk.map(|b| b.to_vec()).map_err(|e| from_reqwest(e, timeout)));

        Ok(HttpReply {
            status,
            body: Box::pin(body),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn provider_error(v: &Value) -> Option<(Option<String>, String)> {
    let err = v.get("error")?;
    if err.is_null() {
        return None;
    }
    let message = err
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    let code = err
        .get("code")
        .or_else(|| err.get("type"))
        .and_then(|c| c.as_str())
        .map(str::to_string);
    Some((code, message))
}

/// Message content is either a plain string or an array of typed blocks;
/// for blocks, the first `"text"` block wins.
fn content_text(content: &Value) -> Option<&str> {
    match content {
        Value::String(s) => Some(s),
        Value::Array(blocks) => blocks
            .iter()
            .find(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .and_then(|b| b.get("text"))
            .and_then(|t| t.as_str()),
        _ => None,
    }
}

/// Parse a complete (non-streaming) response body.
pub fn parse_completion(body: &str) -> Completion {
    let v: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return Completion::Malformed {
                reason: e.to_string(),
            }
        }
    };

    if let Some((code, message)) = provider_error(&v) {
        return Completion::ProviderError { code, message };
    }

    let Some(choices) = v.get("choices").and_then(|c| c.as_array()) else {
        return Completion::Malformed {
            reason: "response has no choices array".into(),
        };
    };

    let text = choices
        .first()
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(content_text)
        .unwrap_or_default();

    if text.is_empty() {
        Completion::Empty
    } else {
        Completion::Success {
            content: text.to_string(),
        }
    }
}

/// Parse one SSE `data:` payload from a streaming response.
pub fn parse_sse_data(data: &str) -> StreamEvent {
    if data.trim() == "[DONE]" {
        return StreamEvent::Finished;
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return StreamEvent::Malformed {
                reason: e.to_string(),
            }
        }
    };

    if let Some((code, message)) = provider_error(&v) {
        return StreamEvent::ProviderError { code, message };
    }

    // Usage-only chunks carry an empty choices array.
    let Some(choice) = v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
    else {
        return StreamEvent::Delta {
            text: String::new(),
            finished: false,
        };
    };

    let text = choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(content_text)
        .unwrap_or_default();
    let finished = choice.get("finish_reason").and_then(|f| f.as_str()) == Some("stop");

    if text.is_empty() && finished {
        StreamEvent::Finished
    } else {
        StreamEvent::Delta {
            text: text.to_string(),
            finished,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_plain_string() {
        let c = parse_completion(r#"{"choices":[{"message":{"content":"Hi there"}}]}"#);
        assert_eq!(
            c,
            Completion::Success {
                content: "Hi there".into()
            }
        );
    }

    #[test]
    fn completion_prefers_first_text_block() {
        let body = r#"{"choices":[{"message":{"content":[
            {"type":"reasoning","text":"thinking"},
            {"type":"text","text":"answer"},
            {"type":"text","text":"second"}
        ]}}]}"#;
        assert_eq!(
            parse_completion(body),
            Completion::Success {
                content: "answer".into()
            }
        );
    }

    #[test]
    fn completion_null_content_is_empty() {
        let c = parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#);
        assert_eq!(c, Completion::Empty);
        assert_eq!(parse_completion(r#"{"choices":[]}"#), Completion::Empty);
    }

    #[test]
    fn completion_error_object() {
        let c = parse_completion(r#"{"error":{"message":"quota","code":"insufficient_quota"}}"#);
        assert_eq!(
            c,
            Completion::ProviderError {
                code: Some("insufficient_quota".into()),
                message: "quota".into()
            }
        );
    }

    #[test]
    fn completion_not_json() {
        assert!(matches!(
            parse_completion("<html>"),
            Completion::Malformed { .. }
        ));
        assert!(matches!(
            parse_completion(r#"{"id":"x"}"#),
            Completion::Malformed { .. }
        ));
    }

    #[test]
    fn sse_delta_text() {
        let e = parse_sse_data(r#"{"choices":[{"delta":{"content":"He"},"finish_reason":null}]}"#);
        assert_eq!(
            e,
            StreamEvent::Delta {
                text: "He".into(),
                finished: false
            }
        );
    }

    #[test]
    fn sse_done_sentinel() {
        assert_eq!(parse_sse_data("[DONE]"), StreamEvent::Finished);
    }

    #[test]
    fn sse_stop_without_text_finishes() {
        let e = parse_sse_data(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#);
        assert_eq!(e, StreamEvent::Finished);
    }

    #[test]
    fn sse_stop_with_text_keeps_text() {
        let e = parse_sse_data(r#"{"choices":[{"delta":{"content":"!"},"finish_reason":"stop"}]}"#);
        assert_eq!(
            e,
            StreamEvent::Delta {
                text: "!".into(),
                finished: true
            }
        );
    }

    #[test]
    fn sse_length_finish_is_not_stop() {
        let e = parse_sse_data(r#"{"choices":[{"delta":{},"finish_reason":"length"}]}"#);
        assert_eq!(
            e,
            StreamEvent::Delta {
                text: String::new(),
                finished: false
            }
        );
    }

    #[test]
    fn sse_malformed_json() {
        assert!(matches!(
            parse_sse_data("{not json"),
            StreamEvent::Malformed { .. }
        ));
    }

    #[test]
    fn sse_error_event() {
        let e = parse_sse_data(r#"{"error":{"message":"overloaded","type":"server_error"}}"#);
        assert_eq!(
            e,
            StreamEvent::ProviderError {
                code: Some("server_error".into()),
                message: "overloaded".into()
            }
        );
    }
}
