use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use crate::{ErrorKind, Result};

/// Admission primitive for a single host, or for all hosts without an
/// override.
///
/// A bucket holds up to `capacity` tokens and refills at
/// `requests_per_second`. It starts full, so the first `capacity`
/// acquisitions go through immediately; after that, acquisitions are paced
/// at the refill rate.
///
/// The token state lives in a single atomic which is updated with
/// compare-and-swap, so concurrent acquirers can never consume the same
/// token twice.
#[derive(Debug)]
pub struct TokenBucket {
    /// Token bucket (GCRA) rate limiter
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Refill rate
    requests_per_second: f64,

    /// Maximum number of tokens
    capacity: NonZeroU32,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// `scope` names the bucket in error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if `requests_per_second` is not a positive, finite
    /// number whose reciprocal fits a [`Duration`], or if `burst_size` is 0.
    pub fn new(scope: &str, requests_per_second: f64, burst_size: u32) -> Result<Self> {
        let invalid_rate = || ErrorKind::InvalidRate {
            scope: scope.to_string(),
            rate: requests_per_second,
        };

        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(invalid_rate());
        }
        let capacity =
            NonZeroU32::new(burst_size).ok_or_else(|| ErrorKind::InvalidBurstSize(scope.into()))?;

        let period =
            Duration::try_from_secs_f64(requests_per_second.recip()).map_err(|_| invalid_rate())?;
        let quota = Quota::with_period(period)
            .ok_or_else(invalid_rate)?
            .allow_burst(capacity);

        Ok(Self {
            rate_limiter: RateLimiter::direct(quota),
            requests_per_second,
            capacity,
        })
    }

    /// Wait until a token is available, then consume it.
    ///
    /// Returns how long the caller was suspended. Dropping the returned
    /// future before it completes leaves the bucket untouched.
    pub async fn acquire(&self) -> Duration {
        let start = Instant::now();
        self.rate_limiter.until_ready().await;
        start.elapsed()
    }

    /// Consume a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.rate_limiter.check().is_ok()
    }

    /// Refill rate in tokens per second
    #[must_use]
    pub const fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    /// Maximum number of tokens, i.e. the burst size
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity.get()
    }
}
