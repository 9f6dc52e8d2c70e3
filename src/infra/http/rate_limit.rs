use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;
use std::time::{Duration, Instant};

// bucket count above which `allow` sweeps stale clients first
const PRUNE_THRESHOLD: usize = 1024;

/// Sliding-window limiter for admin login attempts, keyed by client.
#[derive(Debug, Clone)]
pub struct LoginRateLimiter {
    window: Duration,
    max_attempts: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl LoginRateLimiter {
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            window,
            max_attempts,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Record an attempt for `key`. Returns whether it may proceed and the attempts left.
    pub fn allow(&self, key: &str) -> (bool, u32) {
        let now = Instant::now();
        let window = self.window;

        if self.buckets.len() >= PRUNE_THRESHOLD {
            self.prune_at(now);
        }

        let mut entry = self.buckets.entry(key.to_string()).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        let remaining = self.max_attempts.saturating_sub(entry.len() as u32);
        if remaining == 0 {
            counter!("florette_admin_login_throttled_total").increment(1);
            return (false, 0);
        }

        entry.push(now);
        (true, remaining.saturating_sub(1))
    }

    /// Forget a client's attempts after a successful login.
    pub fn reset(&self, key: &str) {
        self.buckets.remove(key);
    }

    /// Drop clients whose attempts have all left the window.
    pub fn prune(&self) {
        self.prune_at(Instant::now());
    }

    fn prune_at(&self, now: Instant) {
        let window = self.window;
        self.buckets.retain(|_, attempts| {
            attempts.retain(|instant| now.duration_since(*instant) < window);
            !attempts.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_max_attempts_within_window() {
        let limiter = LoginRateLimiter::new(Duration::from_secs(60), 2);

        assert_eq!(limiter.allow("10.0.0.1"), (true, 1));
        assert_eq!(limiter.allow("10.0.0.1"), (true, 0));
        assert_eq!(limiter.allow("10.0.0.1"), (false, 0));
        assert_eq!(limiter.allow("10.0.0.2"), (true, 1));
    }

    #[test]
    fn reset_clears_the_bucket() {
        let limiter = LoginRateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.allow("client").0);
        assert!(!limiter.allow("client").0);

        limiter.reset("client");
        assert!(limiter.allow("client").0);
    }

    #[test]
    fn attempts_expire_with_the_window() {
        let limiter = LoginRateLimiter::new(Duration::from_millis(20), 1);
        assert!(limiter.allow("client").0);
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.allow("client").0);
        assert_eq!(limiter.retry_after_secs(), 1);
    }

    #[test]
    fn stale_failed_clients_are_pruned() {
        let limiter = LoginRateLimiter::new(Duration::from_millis(20), 3);
        for client in ["a", "b", "c"] {
            assert!(limiter.allow(client).0);
        }
        assert_eq!(limiter.tracked_clients(), 3);

        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.allow("d").0);
        limiter.prune();
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn allow_sweeps_once_the_map_is_large() {
        let limiter = LoginRateLimiter::new(Duration::from_millis(20), 1);
        for client in 0..PRUNE_THRESHOLD {
            limiter.allow(&format!("10.0.{}.{}", client / 256, client % 256));
        }
        assert_eq!(limiter.tracked_clients(), PRUNE_THRESHOLD);

        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.allow("fresh").0);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
