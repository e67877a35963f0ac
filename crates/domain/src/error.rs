/// Shared error type used across all unified-agent crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP: {0}")]
    Http(String),

    /// The request did not complete within the effort-dependent timeout.
    #[error("Request timed out after {secs}s. Try reducing reasoning effort.")]
    Timeout { secs: u64 },

    /// 401/403 from the provider. Never retried.
    #[error("credential: {0}")]
    Credential(String),

    /// Non-retryable HTTP status; `message` carries the provider's body.
    #[error("provider HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// 429 or 5xx that survived every retry.
    #[error("rate limited or server error (HTTP {status}): {message}")]
    RateLimitOrServer { status: u16, message: String },

    /// Every attempt failed with a retryable error; `last` is the final one.
    #[error("Failed to complete API request after {attempts} attempts ({last})")]
    RetriesExhausted { attempts: u32, last: Box<Error> },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the retry engine may try the request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout { .. } | Error::RateLimitOrServer { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
