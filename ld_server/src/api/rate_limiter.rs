//! Sliding-window rate limiter for inbound WebSocket messages.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limiter using a sliding window algorithm
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent messages
    timestamps: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allow at most `max_requests` within any `window`.
    ///
    /// # Example
    ///
    /// ```
    /// use ld_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.check());
    /// assert!(limiter.check());
    /// assert!(!limiter.check());
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Burst protection: 10 messages per second
    pub fn burst() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// Sustained usage: 100 messages per minute
    pub fn sustained() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    /// Record a message if it fits in the window.
    ///
    /// Returns `false` without recording when the limit is reached.
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> bool {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }

    /// Messages left before the limit kicks in
    pub fn remaining(&self) -> usize {
        self.max_requests.saturating_sub(self.timestamps.len())
    }
}
