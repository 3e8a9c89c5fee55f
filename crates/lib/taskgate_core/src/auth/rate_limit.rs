//! Sliding-window request limiting.
//!
//! Process-local and in-memory: counts are lost on restart and are not shared
//! between instances. A multi-instance deployment needs a shared counter
//! behind the same [`RateLimiter`] trait.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::settings::RateLimitSettings;

/// Admission decision for one request attributed to `key`.
pub trait RateLimiter: Send + Sync {
    /// Record and admit the request, or deny it without recording.
    ///
    /// An admission is charged even if the request later fails or the caller
    /// disconnects.
    fn admit(&self, key: &str) -> bool;

    /// Budget reported back to callers that were denied.
    fn policy(&self) -> RateLimitSettings;
}

/// Per-key sliding window of admitted request instants.
///
/// The map is sharded, and each read-modify-write happens while holding the
/// shard's entry lock, so concurrent callers for the same key can never admit
/// more than `requests` within one window. Unrelated keys on other shards do
/// not contend. The lock is never held across an `.await`.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    settings: RateLimitSettings,
}

impl SlidingWindowLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            windows: DashMap::new(),
            settings,
        }
    }

    /// Admission check against an explicit clock reading.
    pub fn admit_at(&self, key: &str, now: Instant) -> bool {
        let window = self.settings.window;
        let limit = self.settings.requests as usize;

        let mut entry = self.windows.entry(key.to_string()).or_default();
        prune(&mut entry, now, window);

        if entry.len() >= limit {
            debug!(key, limit, window_secs = window.as_secs(), "rate limit reached");
            return false;
        }
        entry.push_back(now);
        true
    }

    /// Requests currently counted against `key`.
    pub fn in_window(&self, key: &str) -> usize {
        self.in_window_at(key, Instant::now())
    }

    fn in_window_at(&self, key: &str, now: Instant) -> usize {
        match self.windows.get_mut(key) {
            Some(mut entry) => {
                prune(&mut entry, now, self.settings.window);
                entry.len()
            }
            None => 0,
        }
    }

    /// Drop keys with no request inside the window. Returns how many were removed.
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now())
    }

    fn purge_idle_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.settings.window;
        self.windows.retain(|_, entry| {
            prune(entry, now, window);
            !entry.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn admit(&self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    fn policy(&self) -> RateLimitSettings {
        self.settings
    }
}

/// Remove instants at or before `now - window`. Entries are in admission order.
fn prune(entries: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    // Before the clock has run for a full window nothing can have expired.
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };
    while entries.front().is_some_and(|t| *t <= cutoff) {
        entries.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn limiter(requests: u32, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimitSettings::new(
            requests,
            Duration::from_secs(window_secs),
        ))
    }

    #[test]
    fn admits_up_to_limit_then_denies() {
        let l = limiter(3, 60);
        let now = Instant::now();
        assert!(l.admit_at("alice", now));
        assert!(l.admit_at("alice", now));
        assert!(l.admit_at("alice", now));
        assert!(!l.admit_at("alice", now));
        assert_eq!(l.in_window_at("alice", now), 3, "denials are not recorded");
    }

    #[test]
    fn keys_are_independent() {
        let l = limiter(1, 60);
        let now = Instant::now();
        assert!(l.admit_at("alice", now));
        assert!(!l.admit_at("alice", now));
        assert!(l.admit_at("bob", now));
    }

    #[test]
    fn window_slides_rather_than_resets() {
        let l = limiter(2, 10);
        let t0 = Instant::now();
        assert!(l.admit_at("alice", t0));
        assert!(l.admit_at("alice", t0 + Duration::from_secs(5)));
        assert!(!l.admit_at("alice", t0 + Duration::from_secs(9)));
        // First entry falls out of the window, second is still counted.
        assert!(l.admit_at("alice", t0 + Duration::from_secs(10)));
        assert!(!l.admit_at("alice", t0 + Duration::from_secs(12)));
        assert!(l.admit_at("alice", t0 + Duration::from_secs(15)));
    }

    #[test]
    fn purge_idle_drops_only_empty_windows() {
        let l = limiter(5, 10);
        let t0 = Instant::now();
        l.admit_at("old", t0);
        l.admit_at("recent", t0 + Duration::from_secs(8));
        assert_eq!(l.purge_idle_at(t0 + Duration::from_secs(12)), 1);
        assert_eq!(l.tracked_keys(), 1);
        assert_eq!(l.in_window_at("recent", t0 + Duration::from_secs(12)), 1);
    }

    #[test]
    fn limit_plus_one_calls_yield_exactly_one_denial_across_threads() {
        const LIMIT: u32 = 200;
        let l = limiter(LIMIT, 3600);
        let admitted = AtomicUsize::new(0);
        let denied = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for worker in 0..8 {
                let (l, admitted, denied) = (&l, &admitted, &denied);
                s.spawn(move || {
                    // 8 workers share LIMIT + 1 calls between them.
                    let calls = (LIMIT as usize + 1) / 8 + usize::from(worker < (LIMIT as usize + 1) % 8);
                    for _ in 0..calls {
                        if l.admit("shared") {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        } else {
                            denied.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), LIMIT as usize);
        assert_eq!(denied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tasks_never_exceed_limit() {
        let l = Arc::new(limiter(50, 3600));
        let mut handles = Vec::new();
        for _ in 0..200 {
            let l = Arc::clone(&l);
            handles.push(tokio::spawn(async move { l.admit("burst") }));
        }
        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 50);
    }

    #[test]
    fn policy_reports_configured_budget() {
        let l = limiter(7, 30);
        assert_eq!(l.policy(), RateLimitSettings::new(7, Duration::from_secs(30)));
    }
}
