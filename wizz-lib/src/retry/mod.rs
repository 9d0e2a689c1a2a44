//! Retry decisions for completed attempts.
//!
//! [`RetryPolicy::decide`] looks at the outcome of a single attempt and
//! decides whether to accept it, retry it after some delay, or give up.
//! It performs no I/O; the sleeping is done by the caller.

mod headers;
mod retryable;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{StatusCode, header::RETRY_AFTER};
use serde::{Deserialize, Serialize};

use crate::{Content, ErrorKind, ResponseHead, Result};
use retryable::RetryExt;

pub use retryable::TransportErrorKind;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Retry behavior shared by all requests of a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Double the delay after every retry
    pub exponential_backoff: bool,

    /// Statuses that warrant a retry.
    /// `None` means 429 and all 5xx statuses.
    pub retry_statuses: Option<HashSet<u16>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            exponential_backoff: true,
            retry_statuses: None,
        }
    }
}

/// Caller-supplied check that forces a retry of an otherwise acceptable
/// response.
///
/// The predicate receives the response head and its decoded body. The body
/// is `None` if it could not be decoded, or for raw requests made through
/// [`crate::RateLimitedSession`], which never decode bodies.
///
/// # Examples
///
/// ```
/// use wizz_lib::ShouldRetry;
///
/// let retry_on_try_again = ShouldRetry::new(|_head, content| {
///     content
///         .and_then(|content| content.as_json())
///         .and_then(|json| json.get("status"))
///         .is_some_and(|status| status == "try_again")
/// });
/// ```
#[derive(Clone)]
pub struct ShouldRetry(Arc<dyn Fn(&ResponseHead, Option<&Content>) -> bool + Send + Sync>);

impl ShouldRetry {
    /// Wrap a predicate
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&ResponseHead, Option<&Content>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    fn check(&self, head: &ResponseHead, content: Option<&Content>) -> bool {
        (self.0)(head, content)
    }
}

impl fmt::Debug for ShouldRetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShouldRetry(..)")
    }
}

/// Result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome<'a> {
    /// A response was received, with any status
    Success {
        /// Status line and headers
        head: &'a ResponseHead,
        /// Decoded body, if any
        content: Option<&'a Content>,
    },
    /// No response was received
    TransportFailure(TransportErrorKind),
}

/// What to do after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Accept the response as final
    Proceed,
    /// Wait, then try again
    RetryAfter(Duration),
    /// Stop trying; the request failed
    GiveUp,
}

/// Decides whether an attempt gets retried and after how long
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    should_retry: Option<ShouldRetry>,
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial delay is zero or a configured
    /// retryable status is not a valid status code.
    pub fn new(config: RetryConfig, should_retry: Option<ShouldRetry>) -> Result<Self> {
        if config.initial_delay.is_zero() {
            return Err(ErrorKind::InvalidRetryDelay);
        }
        if let Some(statuses) = &config.retry_statuses {
            if let Some(&invalid) = statuses
                .iter()
                .find(|&&code| StatusCode::from_u16(code).is_err())
            {
                return Err(ErrorKind::InvalidStatusCode(invalid));
            }
        }

        Ok(Self {
            config,
            should_retry,
        })
    }

    /// Decide what to do after attempt number `attempt` (starting at 1).
    ///
    /// Responses with a retryable status are retried, after the delay from
    /// their `Retry-After` header if present and valid, or the computed
    /// backoff otherwise. Other responses are retried with the computed
    /// backoff only if the caller's predicate asks for it. Transport
    /// failures are always retried. No retry is scheduled once `attempt`
    /// exceeds the configured maximum number of retries.
    #[must_use]
    pub fn decide(&self, outcome: &AttemptOutcome<'_>, attempt: u32) -> Decision {
        let delay = match outcome {
            AttemptOutcome::TransportFailure(_) => self.backoff(attempt),
            AttemptOutcome::Success { head, content } => {
                if self.is_retryable_status(head.status) {
                    self.retry_after(head).unwrap_or_else(|| self.backoff(attempt))
                } else if self
                    .should_retry
                    .as_ref()
                    .is_some_and(|predicate| predicate.check(head, *content))
                {
                    self.backoff(attempt)
                } else {
                    return Decision::Proceed;
                }
            }
        };

        if attempt > self.config.max_retries {
            Decision::GiveUp
        } else {
            Decision::RetryAfter(delay)
        }
    }

    /// Computed delay before the retry following attempt number `attempt`
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let initial = self.config.initial_delay;
        if !self.config.exponential_backoff {
            return initial;
        }
        let exponent = attempt.saturating_sub(1).min(31);
        initial.saturating_mul(1 << exponent)
    }

    /// Total number of attempts, including the first one
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_retries.saturating_add(1)
    }

    /// The configuration this policy was built from
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn is_retryable_status(&self, status: StatusCode) -> bool {
        match &self.config.retry_statuses {
            Some(statuses) => statuses.contains(&status.as_u16()),
            None => status.should_retry(),
        }
    }

    fn retry_after(&self, head: &ResponseHead) -> Option<Duration> {
        let value = head.headers.get(RETRY_AFTER)?;
        match headers::parse_retry_after(value) {
            Ok(delay) => Some(delay),
            Err(e) => {
                log::debug!("Ignoring Retry-After header from {}: {e}", head.url);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use url::Url;

    fn policy(max_retries: u32, exponential_backoff: bool) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig {
                max_retries,
                exponential_backoff,
                ..RetryConfig::default()
            },
            None,
        )
        .unwrap()
    }

    fn head(status: u16) -> ResponseHead {
        ResponseHead {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            url: Url::parse("https://example.com/").unwrap(),
        }
    }

    fn decide(policy: &RetryPolicy, head: &ResponseHead, attempt: u32) -> Decision {
        policy.decide(
            &AttemptOutcome::Success {
                head,
                content: None,
            },
            attempt,
        )
    }

    #[test]
    fn test_exponential_backoff_growth() {
        let policy = policy(4, true);
        let failure = AttemptOutcome::TransportFailure(TransportErrorKind::Connect);

        let decisions: Vec<_> = (1..=5).map(|attempt| policy.decide(&failure, attempt)).collect();
        assert_eq!(
            decisions,
            vec![
                Decision::RetryAfter(Duration::from_secs(1)),
                Decision::RetryAfter(Duration::from_secs(2)),
                Decision::RetryAfter(Duration::from_secs(4)),
                Decision::RetryAfter(Duration::from_secs(8)),
                Decision::GiveUp,
            ]
        );
    }

    #[test]
    fn test_constant_backoff() {
        let policy = policy(3, false);
        for attempt in 1..=3 {
            assert_eq!(policy.backoff(attempt), Duration::from_secs(1));
        }
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = policy(100, true);
        assert_eq!(policy.backoff(100), Duration::from_secs(1 << 31));
    }

    #[rstest]
    #[case("3", Duration::from_secs(3))]
    #[case("0", Duration::ZERO)]
    fn test_retry_after_overrides_backoff(#[case] value: &str, #[case] expected: Duration) {
        let policy = policy(5, true);
        let mut head = head(429);
        head.headers
            .insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());

        // The computed backoff for attempt 3 would be 4 seconds
        assert_eq!(decide(&policy, &head, 3), Decision::RetryAfter(expected));
    }

    #[test]
    fn test_invalid_retry_after_falls_back_to_backoff() {
        let policy = policy(5, true);
        let mut head = head(503);
        head.headers
            .insert(RETRY_AFTER, HeaderValue::from_static("later"));

        assert_eq!(
            decide(&policy, &head, 2),
            Decision::RetryAfter(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_retry_after_on_final_status_is_ignored() {
        let policy = policy(5, true);
        let mut head = head(200);
        head.headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));

        assert_eq!(decide(&policy, &head, 1), Decision::Proceed);
    }

    #[rstest]
    #[case(200, Decision::Proceed)]
    #[case(201, Decision::Proceed)]
    #[case(301, Decision::Proceed)]
    #[case(404, Decision::Proceed)]
    #[case(408, Decision::Proceed)]
    #[case(429, Decision::RetryAfter(Duration::from_secs(1)))]
    #[case(500, Decision::RetryAfter(Duration::from_secs(1)))]
    #[case(503, Decision::RetryAfter(Duration::from_secs(1)))]
    fn test_default_status_handling(#[case] status: u16, #[case] expected: Decision) {
        assert_eq!(decide(&policy(5, true), &head(status), 1), expected);
    }

    #[test]
    fn test_configured_retry_statuses() {
        let policy = RetryPolicy::new(
            RetryConfig {
                retry_statuses: Some(HashSet::from([404])),
                ..RetryConfig::default()
            },
            None,
        )
        .unwrap();

        assert_eq!(
            decide(&policy, &head(404), 1),
            Decision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(decide(&policy, &head(503), 1), Decision::Proceed);
    }

    #[test]
    fn test_custom_predicate() {
        let predicate = ShouldRetry::new(|_, content| {
            content
                .and_then(Content::as_json)
                .and_then(|json| json.get("status"))
                .is_some_and(|status| status == "try_again")
        });
        let policy = RetryPolicy::new(RetryConfig::default(), Some(predicate)).unwrap();
        let head = head(200);

        let try_again = Content::from(json!({"status": "try_again"}));
        let outcome = AttemptOutcome::Success {
            head: &head,
            content: Some(&try_again),
        };
        assert_eq!(
            policy.decide(&outcome, 1),
            Decision::RetryAfter(Duration::from_secs(1))
        );

        let done = Content::from(json!({"status": "done"}));
        let outcome = AttemptOutcome::Success {
            head: &head,
            content: Some(&done),
        };
        assert_eq!(policy.decide(&outcome, 1), Decision::Proceed);

        // Undecodable bodies reach the predicate as `None`
        assert_eq!(decide(&policy, &head, 1), Decision::Proceed);
    }

    #[test]
    fn test_no_retries() {
        let policy = policy(0, true);
        let failure = AttemptOutcome::TransportFailure(TransportErrorKind::Timeout);

        assert_eq!(policy.decide(&failure, 1), Decision::GiveUp);
        assert_eq!(decide(&policy, &head(500), 1), Decision::GiveUp);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_success_on_final_attempt_is_accepted() {
        let policy = policy(2, true);
        assert_eq!(decide(&policy, &head(200), 3), Decision::Proceed);
        assert_eq!(decide(&policy, &head(500), 3), Decision::GiveUp);
    }

    #[test]
    fn test_invalid_configuration() {
        let zero_delay = RetryConfig {
            initial_delay: Duration::ZERO,
            ..RetryConfig::default()
        };
        assert!(matches!(
            RetryPolicy::new(zero_delay, None),
            Err(ErrorKind::InvalidRetryDelay)
        ));

        let bad_status = RetryConfig {
            retry_statuses: Some(HashSet::from([42])),
            ..RetryConfig::default()
        };
        assert!(matches!(
            RetryPolicy::new(bad_status, None),
            Err(ErrorKind::InvalidStatusCode(42))
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let config: RetryConfig = toml::from_str(
            r#"
            max_retries = 2
            initial_delay = "500ms"
            retry_statuses = [429, 503]
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            RetryConfig {
                max_retries: 2,
                initial_delay: Duration::from_millis(500),
                exponential_backoff: true,
                retry_statuses: Some(HashSet::from([429, 503])),
            }
        );
    }
}
