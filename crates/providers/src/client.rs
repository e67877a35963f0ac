//! The retry engine: one logical chat request, up to three HTTP attempts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use ua_domain::error::{Error, Result};
use ua_domain::models::timeout_for;
use ua_domain::trace::TraceEvent;

use crate::retry::{classify_status, RetryPolicy, StatusClass};
use crate::traits::{HttpReply, HttpRequest, HttpTransport, Sleeper, TokioSleeper};
use crate::util::truncate_body;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct ChatClient {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
            url: OPENAI_CHAT_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `payload`, retrying transient failures.
    ///
    /// Returns the raw reply on HTTP 200; the body has not been read yet.
    /// The timeout comes from the payload's `model` and `reasoning_effort`.
    pub async fn send(&self, payload: &Value) -> Result<HttpReply> {
        let model = payload["model"].as_str().unwrap_or_default();
        let effort = payload["reasoning_effort"].as_str().unwrap_or_default();
        let streaming = payload["stream"].as_bool().unwrap_or(false);
        let timeout_secs = timeout_for(model, effort);
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let last = attempt + 1 == max_attempts;
            TraceEvent::RequestAttempt {
                model: model.to_string(),
                attempt: attempt + 1,
                max_attempts,
                timeout_secs,
            }
            .emit();

            let started = Instant::now();
            let result = self
                .transport
                .post(HttpRequest {
                    url: &self.url,
                    api_key: &self.api_key,
                    body: payload,
                    timeout: Duration::from_secs(timeout_secs),
                })
                .await;

            let failure = match result {
                Ok(reply) => match classify_status(reply.status) {
                    StatusClass::Success => {
                        TraceEvent::LlmRequest {
                            model: model.to_string(),
                            streaming,
                            status: reply.status,
                            duration_ms: started.elapsed().as_millis() as u64,
                        }
                        .emit();
                        return Ok(reply);
                    }
                    StatusClass::Credential => {
                        let message = match reply.status {
                            401 => "Invalid API key",
                            _ => "API access forbidden",
                        };
                        tracing::error!(status = reply.status, "{message}");
                        return Err(Error::Credential(message.into()));
                    }
                    StatusClass::Fatal => {
                        let status = reply.status;
                        let message = reply.text().await.unwrap_or_default();
                        tracing::error!(
                            status,
                            body = %truncate_body(&message, 500),
                            "provider rejected request"
                        );
                        return Err(Error::Provider { status, message });
                    }
                    StatusClass::Retryable => {
                        let status = reply.status;
                        let message = reply.text().await.unwrap_or_default();
                        Error::RateLimitOrServer { status, message }
                    }
                },
                Err(Error::Timeout { .. }) if last => {
                    tracing::error!(timeout_secs, "request timed out on final attempt");
                    return Err(Error::Timeout { secs: timeout_secs });
                }
                Err(e) if !e.is_retryable() || last => return Err(e),
                Err(e) => e,
            };

            if last {
                return Err(Error::RetriesExhausted {
                    attempts: max_attempts,
                    last: Box::new(failure),
                });
            }

            let delay = self.policy.delay_for(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying chat request"
            );
            TraceEvent::RequestRetry {
                model: model.to_string(),
                attempt: attempt + 1,
                delay_ms: delay.as_millis() as u64,
                reason: failure.to_string(),
            }
            .emit();
            self.sleeper.sleep(delay).await;
        }

        Err(Error::RetriesExhausted {
            attempts: max_attempts,
            last: Box::new(Error::Other("no attempt was made".into())),
        })
    }
}
