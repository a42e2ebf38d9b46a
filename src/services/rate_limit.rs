//! In-memory login throttling.
//!
//! A volatile TTL counter keyed by identifier (username or client address).
//! Held in app state rather than a module-level singleton so tests can reset
//! it deterministically; multi-instance deployments would swap this for a
//! shared external store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::AuthThrottleConfig;

#[derive(Debug)]
struct Entry {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &AuthThrottleConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::from_secs(config.window_seconds),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt for `identifier` and report whether it exceeded the
    /// limit for the current window.
    pub fn check(&self, identifier: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("rate limiter lock poisoned");

        let entry = entries.entry(identifier.to_string()).or_insert(Entry {
            count: 0,
            reset_at: now + self.window,
        });

        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        entry.count += 1;
        entry.count > self.max_attempts
    }

    /// Clear the counter for an identifier, e.g. after a successful login.
    pub fn reset(&self, identifier: &str) {
        let mut entries = self.entries.lock().expect("rate limiter lock poisoned");
        entries.remove(identifier);
    }

    /// Drop expired entries. Called opportunistically from request paths.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("rate limiter lock poisoned");
        entries.retain(|_, entry| now <= entry.reset_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32) -> RateLimiter {
        RateLimiter::new(&AuthThrottleConfig {
            max_attempts,
            window_seconds: 60,
        })
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter(3);
        assert!(!limiter.check("alice"));
        assert!(!limiter.check("alice"));
        assert!(!limiter.check("alice"));
        assert!(limiter.check("alice"));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let limiter = limiter(1);
        assert!(!limiter.check("alice"));
        assert!(!limiter.check("bob"));
        assert!(limiter.check("alice"));
    }

    #[test]
    fn test_reset_clears_counter() {
        let limiter = limiter(1);
        assert!(!limiter.check("alice"));
        assert!(limiter.check("alice"));
        limiter.reset("alice");
        assert!(!limiter.check("alice"));
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let limiter = limiter(1);
        assert!(!limiter.check("alice"));
        limiter.sweep();
        assert!(limiter.check("alice"));
    }
}
