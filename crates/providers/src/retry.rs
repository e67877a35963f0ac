use std::time::Duration;

/// Total attempts per request, including the first.
pub const MAX_ATTEMPTS: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the failed attempt with zero-based index `attempt`:
    /// `base_delay * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30);
        self.base_delay.saturating_mul(2u32.saturating_pow(exponent))
    }
}

/// How the retry engine treats an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 401/403: stop immediately.
    Credential,
    /// 429 or any 5xx.
    Retryable,
    /// Everything else: surface the provider's body.
    Fatal,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200 => StatusClass::Success,
        401 | 403 => StatusClass::Credential,
        429 | 500..=599 => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn large_attempt_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(u32::MAX) >= policy.delay_for(30));
    }

    #[test]
    fn status_classes() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(401), StatusClass::Credential);
        assert_eq!(classify_status(403), StatusClass::Credential);
        assert_eq!(classify_status(429), StatusClass::Retryable);
        assert_eq!(classify_status(503), StatusClass::Retryable);
        assert_eq!(classify_status(400), StatusClass::Fatal);
        assert_eq!(classify_status(201), StatusClass::Fatal);
    }
}
