//! Sliding window counter implementation.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// An exact rolling-window limiter backed by a log of request timestamps.
///
/// The log is pruned on every call, so it never holds more than
/// `max_requests` entries recorded within the last `window_size` (plus
/// whatever callers record past the limit).
#[derive(Debug)]
pub struct SlidingWindowCounter {
    /// Length of the rolling window
    window_size: Duration,
    /// Requests admitted per window
    max_requests: u32,
    /// Timestamps of recorded requests, oldest first
    requests: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowCounter {
    /// Create an empty window.
    pub fn new(window_size: Duration, max_requests: u32) -> Self {
        Self {
            window_size,
            max_requests,
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Check whether another request fits in the current window.
    pub fn can_proceed(&self) -> bool {
        let mut requests = self.requests.lock();
        self.prune(&mut requests, Instant::now());
        requests.len() < self.max_requests as usize
    }

    /// Record a request at the current time.
    pub fn record_request(&self) {
        let mut requests = self.requests.lock();
        let now = Instant::now();
        self.prune(&mut requests, now);
        requests.push_back(now);
    }

    /// Time until the oldest request leaves the window.
    ///
    /// Zero while the window is under its limit.
    pub fn get_wait_time(&self) -> Duration {
        let mut requests = self.requests.lock();
        let now = Instant::now();
        self.prune(&mut requests, now);

        if requests.len() < self.max_requests as usize {
            return Duration::ZERO;
        }
        match requests.front() {
            Some(oldest) => (*oldest + self.window_size).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Number of requests currently inside the window.
    pub fn current_count(&self) -> usize {
        let mut requests = self.requests.lock();
        self.prune(&mut requests, Instant::now());
        requests.len()
    }

    /// Get the window length.
    pub fn window_size(&self) -> Duration {
        self.window_size
    }

    /// Get the per-window request limit.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    fn prune(&self, requests: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = requests.front() {
            if now.duration_since(*oldest) >= self.window_size {
                requests.pop_front();
            } else {
                break;
            }
        }
    }
}
