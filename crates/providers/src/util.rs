//! Shared utility functions for the transport layer.

use std::time::Duration;

use ua_domain::error::Error;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`] carrying the limit that was
/// applied; everything else maps to [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        Error::Http(e.to_string())
    }
}

/// Truncate provider error bodies before they are logged or shown.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let cut: String = body.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_untouched() {
        assert_eq!(truncate_body("bad request", 100), "bad request");
    }

    #[test]
    fn long_body_cut_on_char_boundary() {
        let body = "é".repeat(10);
        assert_eq!(truncate_body(&body, 3), "ééé...");
    }
}
