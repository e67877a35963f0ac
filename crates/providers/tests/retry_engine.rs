//! Integration tests for the chat client's retry behavior.
//!
//! The transport replays a fixed script of outcomes and the sleeper records
//! requested delays instead of sleeping, so every test is deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use ua_domain::error::{Error, Result};
use ua_providers::{ChatClient, HttpReply, HttpRequest, HttpTransport, Sleeper};

struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpReply>>>,
    timeouts: Mutex<Vec<Duration>>,
    auth_headers: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<HttpReply>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            timeouts: Mutex::new(Vec::new()),
            auth_headers: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.timeouts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(&self, req: HttpRequest<'_>) -> Result<HttpReply> {
        self.timeouts.lock().unwrap().push(req.timeout);
        self.auth_headers.lock().unwrap().push(req.api_key.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("script exhausted".into())))
    }
}

#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

fn client(transport: Arc<ScriptedTransport>, sleeper: Arc<RecordingSleeper>) -> ChatClient {
    ChatClient::new(transport, "sk-test").with_sleeper(sleeper)
}

fn payload() -> serde_json::Value {
    json!({ "model": "o3-mini", "reasoning_effort": "low", "messages": [] })
}

fn ok_reply() -> Result<HttpReply> {
    Ok(HttpReply::from_bytes(
        200,
        r#"{"choices":[{"message":{"content":"ok"}}]}"#,
    ))
}

fn status(code: u16, body: &str) -> Result<HttpReply> {
    Ok(HttpReply::from_bytes(code, body.to_string()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retryable statuses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn rate_limited_twice_then_success() {
    let transport = ScriptedTransport::new(vec![
        status(429, "slow down"),
        status(429, "slow down"),
        ok_reply(),
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let reply = client(transport.clone(), sleeper.clone())
        .send(&payload())
        .await
        .unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(transport.calls(), 3);
    assert_eq!(
        *sleeper.delays.lock().unwrap(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn server_errors_exhaust_attempts() {
    let transport = ScriptedTransport::new(vec![
        status(500, "boom"),
        status(502, "bad gateway"),
        status(503, "unavailable"),
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let err = client(transport.clone(), sleeper.clone())
        .send(&payload())
        .await
        .unwrap_err();

    match err {
        Error::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, Error::RateLimitOrServer { status: 503, .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(transport.calls(), 3);
    // No sleep after the final attempt.
    assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn exhausted_error_message_names_attempts() {
    let transport = ScriptedTransport::new(vec![
        status(429, ""),
        status(429, ""),
        status(429, ""),
    ]);
    let err = client(transport, Arc::new(RecordingSleeper::default()))
        .send(&payload())
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with("Failed to complete API request after 3 attempts"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Non-retryable failures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn unauthorized_fails_immediately() {
    let transport = ScriptedTransport::new(vec![status(401, "bad key"), ok_reply()]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let err = client(transport.clone(), sleeper.clone())
        .send(&payload())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Credential(ref m) if m == "Invalid API key"));
    assert_eq!(transport.calls(), 1);
    assert!(sleeper.delays.lock().unwrap().is_empty());
}

#[tokio::test]
async fn forbidden_fails_immediately() {
    let transport = ScriptedTransport::new(vec![status(403, "")]);
    let err = client(transport, Arc::new(RecordingSleeper::default()))
        .send(&payload())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Credential(ref m) if m == "API access forbidden"));
}

#[tokio::test]
async fn bad_request_surfaces_provider_body() {
    let body = r#"{"error":{"message":"Unsupported parameter: 'temperature'"}}"#;
    let transport = ScriptedTransport::new(vec![status(400, body)]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let err = client(transport.clone(), sleeper.clone())
        .send(&payload())
        .await
        .unwrap_err();

    match err {
        Error::Provider { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Unsupported parameter"));
        }
        other => panic!("expected Provider, got {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
    assert!(sleeper.delays.lock().unwrap().is_empty());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport failures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn timeout_then_success() {
    let transport = ScriptedTransport::new(vec![Err(Error::Timeout { secs: 120 }), ok_reply()]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let reply = client(transport.clone(), sleeper.clone())
        .send(&payload())
        .await
        .unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(*sleeper.delays.lock().unwrap(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn timeout_on_final_attempt_suggests_lower_effort() {
    let transport = ScriptedTransport::new(vec![
        Err(Error::Timeout { secs: 120 }),
        Err(Error::Timeout { secs: 120 }),
        Err(Error::Timeout { secs: 120 }),
    ]);
    let err = client(transport, Arc::new(RecordingSleeper::default()))
        .send(&payload())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { secs: 120 }));
    assert_eq!(
        err.to_string(),
        "Request timed out after 120s. Try reducing reasoning effort."
    );
}

#[tokio::test]
async fn connection_error_on_final_attempt_is_surfaced() {
    let transport = ScriptedTransport::new(vec![
        Err(Error::Http("connection refused".into())),
        Err(Error::Http("connection refused".into())),
        Err(Error::Http("connection reset".into())),
    ]);
    let err = client(transport.clone(), Arc::new(RecordingSleeper::default()))
        .send(&payload())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(ref m) if m == "connection reset"));
    assert_eq!(transport.calls(), 3);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn timeout_follows_model_and_effort() {
    let transport = ScriptedTransport::new(vec![ok_reply(), ok_reply()]);
    let c = client(transport.clone(), Arc::new(RecordingSleeper::default()));

    c.send(&payload()).await.unwrap();
    c.send(&json!({ "model": "o1", "reasoning_effort": "bogus" }))
        .await
        .unwrap();

    let timeouts = transport.timeouts.lock().unwrap().clone();
    assert_eq!(timeouts, vec![Duration::from_secs(120), Duration::from_secs(300)]);
    assert!(transport
        .auth_headers
        .lock()
        .unwrap()
        .iter()
        .all(|k| k == "sk-test"));
}
