//! Per-key record of recent event timestamps.
//!
//! A window only ever appends at the back and trims from the front, so the
//! timestamps form a monotonic queue and trimming is amortized O(1).

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Recent activity for one key of a sliding-window limiter.
///
/// All mutation goes through an internal lock, so a window is never
/// observed half-appended even when shared between threads.
pub struct Window {
    limit: u64,
    interval: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    timestamps: VecDeque<Instant>,
    last_access: Instant,
}

impl Window {
    /// Creates an empty window. `now` seeds the last-access time.
    pub fn new(limit: u64, interval: Duration, now: Instant) -> Self {
        let capacity = usize::try_from(limit).unwrap_or(usize::MAX).min(1024);
        Self {
            limit,
            interval,
            state: Mutex::new(WindowState {
                timestamps: VecDeque::with_capacity(capacity),
                last_access: now,
            }),
        }
    }

    /// Records one event at `now` if the trimmed window is below the limit.
    ///
    /// A denied event leaves the timestamps untouched.
    pub fn try_admit(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        state.last_access = now;
        trim_front(&mut state.timestamps, self.interval, now);

        if (state.timestamps.len() as u64) < self.limit {
            state.timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drops every timestamp that has fallen out of the interval.
    pub fn trim(&self, now: Instant) {
        let mut state = self.state.lock();
        trim_front(&mut state.timestamps, self.interval, now);
    }

    /// Number of events inside the interval ending at `now`.
    pub fn len(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        trim_front(&mut state.timestamps, self.interval, now);
        state.timestamps.len()
    }

    pub fn is_empty(&self, now: Instant) -> bool {
        self.len(now) == 0
    }

    /// Whether the sweep may evict this window: untouched for longer than
    /// the interval, or holding no live events.
    pub fn is_idle(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        if now.saturating_duration_since(state.last_access) > self.interval {
            return true;
        }
        trim_front(&mut state.timestamps, self.interval, now);
        state.timestamps.is_empty()
    }
}

/// Pops stale timestamps. An entry is stale once a full interval has
/// elapsed since it was recorded, so a zero interval keeps nothing.
fn trim_front(timestamps: &mut VecDeque<Instant>, interval: Duration, now: Instant) {
    while let Some(&front) = timestamps.front() {
        if now.saturating_duration_since(front) >= interval {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn admits_up_to_limit() {
        let now = Instant::now();
        let window = Window::new(3, MINUTE, now);

        assert!(window.try_admit(now));
        assert!(window.try_admit(now));
        assert!(window.try_admit(now));
        assert!(!window.try_admit(now));
        assert_eq!(window.len(now), 3);
    }

    #[test]
    fn denied_event_is_not_recorded() {
        let now = Instant::now();
        let window = Window::new(1, MINUTE, now);

        assert!(window.try_admit(now));
        for _ in 0..10 {
            assert!(!window.try_admit(now));
        }
        assert_eq!(window.len(now), 1);
    }

    #[test]
    fn trims_expired_prefix_only() {
        let start = Instant::now();
        let window = Window::new(10, MINUTE, start);

        window.try_admit(start);
        window.try_admit(start + Duration::from_secs(30));
        window.try_admit(start + Duration::from_secs(50));

        let later = start + Duration::from_secs(61);
        window.trim(later);
        assert_eq!(window.len(later), 2);

        let much_later = start + Duration::from_secs(111);
        assert_eq!(window.len(much_later), 0);
        assert!(window.is_empty(much_later));
    }

    #[test]
    fn full_window_reopens_after_interval() {
        let start = Instant::now();
        let window = Window::new(2, MINUTE, start);

        assert!(window.try_admit(start));
        assert!(window.try_admit(start));
        assert!(!window.try_admit(start + Duration::from_secs(59)));
        assert!(window.try_admit(start + Duration::from_secs(61)));
    }

    #[test]
    fn zero_limit_never_admits() {
        let now = Instant::now();
        let window = Window::new(0, MINUTE, now);
        assert!(!window.try_admit(now));
        assert!(window.is_empty(now));
    }

    #[test]
    fn zero_interval_always_admits() {
        let now = Instant::now();
        let window = Window::new(1, Duration::ZERO, now);
        for _ in 0..5 {
            assert!(window.try_admit(now));
        }
        assert_eq!(window.len(now), 0);
    }

    #[test]
    fn idle_when_untouched_or_empty() {
        let start = Instant::now();
        let window = Window::new(5, MINUTE, start);
        assert!(window.is_idle(start), "fresh window holds no events");

        window.try_admit(start);
        assert!(!window.is_idle(start + Duration::from_secs(10)));
        assert!(window.is_idle(start + Duration::from_secs(61)));
    }
}
