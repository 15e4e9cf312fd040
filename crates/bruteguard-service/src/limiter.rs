//! Keyed sliding-window rate limiting with a self-cleaning key map.
//!
//! Transport-agnostic core. One `SlidingWindowLimiter` is created per
//! rate-limited dimension (login, password, source address), each with its
//! own limit and interval and its own background sweep.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::window::Window;

/// Shortest period the background sweep will run at.
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Capability shared by every limiter the access service composes.
///
/// None of these operations can fail; denial is a normal `false`.
pub trait RateLimiter: Send + Sync {
    /// Returns `true` and records the event if one more event for `key`
    /// is within policy.
    fn allow(&self, key: &str) -> bool;

    /// Forgets all history for `key`. Unknown keys are a no-op.
    fn reset(&self, key: &str);

    /// Evicts idle windows once.
    fn clean(&self);
}

/// Limit and interval for one limiter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    /// Maximum events per key within `interval`. Zero never admits.
    pub limit: u64,
    /// Length of the trailing window.
    pub interval: Duration,
}

impl LimitConfig {
    pub const fn new(limit: u64, interval: Duration) -> Self {
        Self { limit, interval }
    }
}

/// In-memory sliding-window limiter keyed by arbitrary strings.
///
/// Cloning is cheap and shares the underlying map, which is how the
/// background sweep reaches the same windows as request handlers.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    inner: Arc<LimiterInner>,
}

struct LimiterInner {
    config: LimitConfig,
    windows: DashMap<String, Window>,
}

impl SlidingWindowLimiter {
    /// Creates a limiter with no sweep running.
    pub fn new(config: LimitConfig) -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                config,
                windows: DashMap::new(),
            }),
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.inner.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.windows.is_empty()
    }

    /// Whether `key` currently has a window.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.windows.contains_key(key)
    }

    /// Removes idle windows and returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.windows.len();
        self.inner.windows.retain(|_, window| !window.is_idle(now));
        before.saturating_sub(self.inner.windows.len())
    }

    /// Spawns the periodic sweep on the current tokio runtime.
    ///
    /// The task runs every `interval` (floored at one second) until
    /// `shutdown` is cancelled.
    pub fn start_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.inner.config.interval.max(MIN_SWEEP_PERIOD);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = limiter.sweep();
                        if evicted > 0 {
                            tracing::debug!(
                                evicted,
                                remaining = limiter.len(),
                                "swept idle rate-limit windows"
                            );
                        }
                    }
                }
            }

            tracing::debug!("rate-limit sweeper stopped");
        })
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let now = Instant::now();

        // Fast path: a shard read guard keeps sweep and reset (write guards)
        // out while only this key's window is locked.
        if let Some(window) = self.inner.windows.get(key) {
            return window.try_admit(now);
        }

        let LimitConfig { limit, interval } = self.inner.config;
        let window = self
            .inner
            .windows
            .entry(key.to_owned())
            .or_insert_with(|| Window::new(limit, interval, now));
        window.try_admit(now)
    }

    fn reset(&self, key: &str) {
        self.inner.windows.remove(key);
    }

    fn clean(&self) {
        self.sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn limiter(limit: u64, interval: Duration) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(LimitConfig::new(limit, interval))
    }

    #[tokio::test(start_paused = true)]
    async fn five_per_minute_scenario() {
        let limiter = limiter(5, MINUTE);

        for _ in 0..5 {
            assert!(limiter.allow("alice"));
        }
        assert!(!limiter.allow("alice"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.allow("alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_rather_than_resets() {
        let limiter = limiter(2, MINUTE);

        assert!(limiter.allow("k"));
        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));

        // First event expires at t=60, second is still live until t=100.
        tokio::time::advance(Duration::from_secs(21)).await;
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(2, MINUTE);

        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));

        assert!(limiter.allow("b"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn reset_starts_fresh_window() {
        let limiter = limiter(5, MINUTE);

        for _ in 0..5 {
            limiter.allow("testkey");
        }
        assert!(!limiter.allow("testkey"));

        limiter.reset("testkey");
        assert!(!limiter.contains_key("testkey"));
        assert!(limiter.allow("testkey"));
    }

    #[test]
    fn reset_unknown_key_is_noop() {
        let limiter = limiter(5, MINUTE);
        limiter.allow("known");
        limiter.reset("unknown");
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn zero_limit_never_admits() {
        let limiter = limiter(0, MINUTE);
        assert!(!limiter.allow("x"));
        assert!(!limiter.allow("x"));
    }

    #[test]
    fn zero_interval_always_admits() {
        let limiter = limiter(1, Duration::ZERO);
        for _ in 0..100 {
            assert!(limiter.allow("x"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clean_evicts_stale_keys() {
        let limiter = limiter(5, Duration::from_secs(1));

        for key in ["testkey1", "testkey2"] {
            for _ in 0..5 {
                limiter.allow(key);
            }
            assert!(!limiter.allow(key));
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        limiter.clean();
        assert!(limiter.is_empty());

        for key in ["testkey1", "testkey2"] {
            assert!(limiter.allow(key));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clean_keeps_live_keys() {
        let limiter = limiter(5, MINUTE);
        limiter.allow("old");
        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.allow("fresh");

        assert_eq!(limiter.sweep(), 1);
        assert!(limiter.contains_key("fresh"));
        assert!(!limiter.contains_key("old"));
    }

    #[test]
    fn clean_is_idempotent() {
        let limiter = limiter(5, MINUTE);
        limiter.clean();
        assert!(limiter.is_empty());

        limiter.allow("k");
        limiter.clean();
        limiter.clean();
        assert_eq!(limiter.len(), 1);
        assert!(limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_periodically() {
        let limiter = limiter(5, Duration::from_secs(2));
        let shutdown = CancellationToken::new();
        let handle = limiter.start_sweeper(shutdown.clone());

        limiter.allow("k");
        assert_eq!(limiter.len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(limiter.is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_exits_on_shutdown() {
        let limiter = limiter(5, MINUTE);
        let shutdown = CancellationToken::new();
        let handle = limiter.start_sweeper(shutdown.clone());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn sweepers_stop_independently() {
        let a = limiter(5, MINUTE);
        let b = limiter(5, MINUTE);
        let root = CancellationToken::new();
        let token_a = root.child_token();
        let handle_a = a.start_sweeper(token_a.clone());
        let handle_b = b.start_sweeper(root.child_token());

        token_a.cancel();
        handle_a.await.unwrap();
        assert!(!handle_b.is_finished());

        root.cancel();
        handle_b.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allows_never_exceed_limit() {
        let limiter = limiter(50, MINUTE);
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                (0..20).filter(|_| limiter.allow("shared")).count()
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            admitted += task.await.unwrap();
        }
        assert_eq!(admitted, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sweep_during_allows_keeps_live_windows() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let limiter = limiter(50, MINUTE);
        let stop = Arc::new(AtomicBool::new(false));

        let sweeper = {
            let limiter = limiter.clone();
            let stop = stop.clone();
            tokio::task::spawn_blocking(move || {
                let mut evicted = 0;
                while !stop.load(Ordering::Relaxed) {
                    evicted += limiter.sweep();
                }
                evicted
            })
        };

        let mut tasks = Vec::new();
        for i in 0..8 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                let own = format!("key-{i}");
                let mut shared = 0;
                for _ in 0..20 {
                    if limiter.allow("shared") {
                        shared += 1;
                    }
                    limiter.allow(&own);
                    tokio::task::yield_now().await;
                }
                shared
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            admitted += task.await.unwrap();
        }
        stop.store(true, Ordering::Relaxed);
        let evicted = sweeper.await.unwrap();

        assert_eq!(admitted, 50);
        assert_eq!(evicted, 0);
        assert_eq!(limiter.len(), 9);
        // Still full: the sweep never dropped the saturated window.
        assert!(!limiter.allow("shared"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reset_during_allows_is_all_or_nothing() {
        let limiter = limiter(10, MINUTE);
        for _ in 0..10 {
            limiter.allow("k");
        }

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                (0..25).filter(|_| limiter.allow("k")).count()
            }));
        }
        let resetter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.reset("k") })
        };

        resetter.await.unwrap();
        let mut admitted = 0;
        for task in tasks {
            admitted += task.await.unwrap();
        }
        // One reset frees at most one fresh window's worth of events.
        assert!(admitted <= 10, "admitted {admitted}");
    }
}
