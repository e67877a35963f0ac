//! Incremental server-sent-events decoding.
//!
//! The response body arrives as arbitrary byte chunks. Bytes are buffered
//! until a full line is available, `data:` payloads are extracted, and each
//! payload is handed to a parser that turns it into a [`StreamEvent`].
//!
//! - [`drain_data_lines`] -- pull complete `data:` payloads from a byte buffer
//! - [`sse_event_stream`] -- build a `BoxStream` of events from a body stream

use futures_util::StreamExt;
use ua_domain::error::Result;
use ua_domain::stream::{BoxStream, StreamEvent};

/// Extract complete `data:` payloads from an SSE byte buffer.
///
/// Lines are split on `\n` (a trailing `\r` is dropped). Only `data:` lines
/// are kept; `event:`, `id:`, `retry:`, comments and blank separators are
/// ignored. Bytes after the last newline stay in the buffer, so a multi-byte
/// character split across chunks is decoded only once it is complete.
pub(crate) fn drain_data_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            if !data.is_empty() {
                data_lines.push(data.to_string());
            }
        }
    }

    data_lines
}

/// Build a [`BoxStream`] of events from a raw body stream and a parser.
///
/// The stream:
/// 1. Buffers incoming chunks and drains complete `data:` lines
/// 2. Flushes the remaining buffer when the body closes
/// 3. Yields a body error once and then ends
///
/// It does not stop at [`StreamEvent::Finished`]; the consumer decides.
pub fn sse_event_stream<F>(
    body: BoxStream<'static, Result<Vec<u8>>>,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> StreamEvent + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut body = body;
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            match body.next().await {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(&bytes);
                    for data in drain_data_lines(&mut buffer) {
                        yield Ok(parse_data(&data));
                    }
                }
                Some(Err(e)) => {
                    yield Err(e);
                    break;
                }
                None => {
                    // Body ended without a final newline.
                    if !buffer.is_empty() {
                        buffer.push(b'\n');
                        for data in drain_data_lines(&mut buffer) {
                            yield Ok(parse_data(&data));
                        }
                    }
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use ua_domain::error::Error;

    fn buf(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn drain_multiple_events() {
        let mut b = buf("data: first\n\ndata: second\n\n");
        assert_eq!(drain_data_lines(&mut b), vec!["first", "second"]);
        assert!(b.is_empty());
    }

    #[test]
    fn drain_partial_line_stays_in_buffer() {
        let mut b = buf("data: complete\ndata: parti");
        assert_eq!(drain_data_lines(&mut b), vec!["complete"]);
        assert_eq!(b, buf("data: parti"));
    }

    #[test]
    fn drain_ignores_non_data_lines() {
        let mut b = buf(": keep-alive\nevent: ping\nid: 42\nretry: 5000\ndata: payload\n");
        assert_eq!(drain_data_lines(&mut b), vec!["payload"]);
    }

    #[test]
    fn drain_handles_crlf() {
        let mut b = buf("data: one\r\n\r\ndata: [DONE]\r\n");
        assert_eq!(drain_data_lines(&mut b), vec!["one", "[DONE]"]);
    }

    #[test]
    fn drain_waits_for_split_utf8() {
        let text = "data: é\n".as_bytes();
        // Split inside the two-byte 'é'.
        let mut b = text[..7].to_vec();
        assert!(drain_data_lines(&mut b).is_empty());
        b.extend_from_slice(&text[7..]);
        assert_eq!(drain_data_lines(&mut b), vec!["é"]);
    }

    fn echo(data: &str) -> StreamEvent {
        StreamEvent::Delta {
            text: data.to_string(),
            finished: false,
        }
    }

    async fn collect(chunks: Vec<Result<Vec<u8>>>) -> Vec<Result<StreamEvent>> {
        let body: BoxStream<'static, Result<Vec<u8>>> =
            Box::pin(futures_util::stream::iter(chunks));
        sse_event_stream(body, echo).collect().await
    }

    #[tokio::test]
    async fn events_across_chunk_boundaries() {
        let events = collect(vec![Ok(buf("data: A\nda")), Ok(buf("ta: B\n"))]).await;
        let texts: Vec<String> = events
            .into_iter()
            .map(|e| match e.unwrap() {
                StreamEvent::Delta { text, .. } => text,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(texts, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_flushed() {
        let events = collect(vec![Ok(buf("data: tail"))]).await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn body_error_ends_stream() {
        let events = collect(vec![
            Ok(buf("data: A\n")),
            Err(Error::Http("connection reset".into())),
            Ok(buf("data: never\n")),
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_err());
    }
}
