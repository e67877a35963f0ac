use std::time::Duration;

use ua_domain::error::{Error, Result};
use ua_domain::stream::BoxStream;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Reply types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One outbound JSON POST.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    /// Full endpoint URL.
    pub url: &'a str,
    /// Sent as `Authorization: Bearer <key>`.
    pub api_key: &'a str,
    /// Serialized as the request body with `Content-Type: application/json`.
    pub body: &'a serde_json::Value,
    /// Hard limit for the whole exchange, including reading the body.
    pub timeout: Duration,
}

/// Raw response handle: status plus a lazily-read body.
///
/// The body is not read until the caller pulls from it, so a streaming
/// response can be decoded as it arrives.
pub struct HttpReply {
    pub status: u16,
    pub body: BoxStream<'static, Result<Vec<u8>>>,
}

impl HttpReply {
    /// Build a reply from an in-memory body (tests, replays).
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let bytes = body.into();
        let stream = async_stream::stream! {
            if !bytes.is_empty() {
                yield Ok::<_, Error>(bytes);
            }
        };
        Self {
            status,
            body: Box::pin(stream),
        }
    }

    /// Build a reply whose body arrives as the given sequence of chunks.
    pub fn from_chunks(status: u16, chunks: Vec<Result<Vec<u8>>>) -> Self {
        Self {
            status,
            body: Box::pin(futures_util::stream::iter(chunks)),
        }
    }

    /// Read the remaining body to a string (lossy UTF-8).
    pub async fn text(self) -> Result<String> {
        use futures_util::StreamExt;

        let mut body = self.body;
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl std::fmt::Debug for HttpReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReply")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Seams
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The network side of a chat request.
///
/// The production implementation is [`crate::openai::ReqwestTransport`];
/// tests substitute scripted replies.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `req.body` and return as soon as the status line is available.
    ///
    /// Transport failures map to `Error::Timeout` or `Error::Http`.
    async fn post(&self, req: HttpRequest<'_>) -> Result<HttpReply>;
}

/// Backoff waits go through this so tests can observe them without sleeping.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
