use serde::Serialize;
use std::pin::Pin;

/// A boxed async stream, used for response bodies and turn output.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// One decoded event from a streaming chat completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// A text chunk. `finished` is set when the same event carried
    /// `finish_reason: "stop"`.
    #[serde(rename = "delta")]
    Delta { text: String, finished: bool },

    /// The `[DONE]` sentinel, or a bare stop marker with no text.
    #[serde(rename = "finished")]
    Finished,

    /// The provider reported an error inside the stream.
    #[serde(rename = "provider_error")]
    ProviderError {
        code: Option<String>,
        message: String,
    },

    /// A data line that could not be understood. Skipped by the decoder.
    #[serde(rename = "malformed")]
    Malformed { reason: String },
}

/// Outcome of parsing a complete (non-streaming) response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Completion {
    #[serde(rename = "success")]
    Success { content: String },

    /// Well-formed response with no text content.
    #[serde(rename = "empty")]
    Empty,

    #[serde(rename = "provider_error")]
    ProviderError {
        code: Option<String>,
        message: String,
    },

    #[serde(rename = "malformed")]
    Malformed { reason: String },
}
