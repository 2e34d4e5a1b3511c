//! Rate limiting for credential endpoints.
//!
//! Slows down password guessing and recovery-email flooding by limiting how
//! often the same endpoint can be hit for the same account.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Rate limiter using a sliding window algorithm
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent requests
    timestamps: VecDeque<Instant>,
    /// Maximum number of requests allowed in the window
    max_requests: usize,
    /// Time window for rate limiting
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    ///
    /// ```
    /// use admission_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // Allow 5 attempts per minute
    /// let limiter = RateLimiter::new(5, Duration::from_secs(60));
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Check if a request should be allowed
    ///
    /// Returns `true` if the request is allowed, `false` if rate limit exceeded.
    ///
    /// # Example
    ///
    /// ```
    /// # use admission_server::api::rate_limiter::RateLimiter;
    /// # use std::time::Duration;
    /// let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
    ///
    /// for _ in 0..5 {
    ///     assert!(limiter.check());
    /// }
    ///
    /// assert!(!limiter.check());
    /// ```
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        self.evict(now);

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }

    /// Time until the oldest request leaves the window
    pub fn reset_in(&self) -> Option<Duration> {
        self.timestamps.front().map(|oldest| {
            let elapsed = Instant::now().duration_since(*oldest);
            self.window.saturating_sub(elapsed)
        })
    }

    fn evict(&mut self, now: Instant) {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn is_idle(&mut self, now: Instant) -> bool {
        self.evict(now);
        self.timestamps.is_empty()
    }
}

/// Sliding-window limits tracked per key
///
/// Keys are `endpoint:subject` strings, e.g. `login:alice@example.com`.
#[derive(Debug)]
pub struct KeyedRateLimiter {
    limiters: Mutex<HashMap<String, RateLimiter>>,
    max_requests: usize,
    window: Duration,
}

impl KeyedRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            limiters: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Record an attempt for `endpoint` by `subject`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Attempt allowed
    /// * `Err(Duration)` - Limit exceeded; retry after the returned delay
    pub async fn check(&self, endpoint: &str, subject: &str) -> Result<(), Duration> {
        let key = format!("{endpoint}:{}", subject.trim().to_lowercase());
        let mut limiters = self.limiters.lock().await;

        // Drop idle entries so the map stays bounded by active subjects
        if limiters.len() > 1024 {
            let now = Instant::now();
            limiters.retain(|_, limiter| !limiter.is_idle(now));
        }

        let limiter = limiters
            .entry(key)
            .or_insert_with(|| RateLimiter::new(self.max_requests, self.window));

        if limiter.check() {
            Ok(())
        } else {
            Err(limiter.reset_in().unwrap_or(self.window))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(1));

        for _ in 0..3 {
            assert!(limiter.check());
        }

        assert!(!limiter.check(), "Should block request over limit");
    }

    #[test]
    fn test_rate_limiter_window_expiry() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(100));

        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());

        thread::sleep(Duration::from_millis(150));

        assert!(limiter.check(), "Should allow after window expires");
    }

    #[test]
    fn test_reset_in() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        assert!(limiter.reset_in().is_none());

        limiter.check();
        let reset = limiter.reset_in().unwrap();
        assert!(reset <= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_keyed_limiter_isolates_subjects() {
        let limiter = KeyedRateLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.check("login", "alice@example.com").await.is_ok());
        assert!(limiter.check("login", "Alice@Example.com").await.is_ok());
        assert!(limiter.check("login", "alice@example.com").await.is_err());

        // Other subjects and endpoints have their own windows
        assert!(limiter.check("login", "bob@example.com").await.is_ok());
        assert!(limiter.check("password_recovery_s1", "alice@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_keyed_limiter_reports_retry_delay() {
        let limiter = KeyedRateLimiter::new(1, Duration::from_secs(60));
        limiter.check("login", "alice@example.com").await.unwrap();

        let retry = limiter.check("login", "alice@example.com").await.unwrap_err();
        assert!(retry <= Duration::from_secs(60));
        assert!(retry > Duration::from_secs(50));
    }
}
