//! Observable runtime state for one rate limit key.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::time::Duration;

fn minute() -> ChronoDuration {
    ChronoDuration::seconds(60)
}

fn hour() -> ChronoDuration {
    ChronoDuration::seconds(3600)
}

fn day() -> ChronoDuration {
    ChronoDuration::seconds(86400)
}

/// Request counters and derived flags for one service operation.
///
/// Counters reset lazily: a counter is zeroed only when a new request
/// arrives and its window has elapsed since the previous request. Nothing
/// runs in the background, so a status snapshot taken long after the last
/// request still shows the counts from that burst until the next request is
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateLimitStatus {
    pub current_minute_count: u64,
    pub current_hour_count: u64,
    pub current_day_count: u64,
    pub last_request_time: Option<DateTime<Utc>>,
    /// When the strategy expects to admit the next request
    pub next_available_time: Option<DateTime<Utc>>,
    /// When the minute counter will reset, given no further requests
    pub reset_time: Option<DateTime<Utc>>,
    /// Whether the last recorded request left the key throttled
    pub is_limited: bool,
    /// Requests left in the current minute
    pub remaining_requests: u32,
}

impl RateLimitStatus {
    /// A fresh status for a key allowing `requests_per_minute`.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            remaining_requests: requests_per_minute,
            ..Self::default()
        }
    }

    /// Zero any counter whose window has passed since the last request.
    pub fn reset_counters_if_needed(&mut self, now: DateTime<Utc>) {
        let Some(last) = self.last_request_time else {
            return;
        };
        let elapsed = now - last;
        if elapsed >= minute() {
            self.current_minute_count = 0;
        }
        if elapsed >= hour() {
            self.current_hour_count = 0;
        }
        if elapsed >= day() {
            self.current_day_count = 0;
        }
    }

    /// Recompute the remaining budget after the per-minute rate changed.
    pub fn set_requests_per_minute(&mut self, requests_per_minute: u32) {
        self.remaining_requests = remaining(requests_per_minute, self.current_minute_count);
    }

    /// Count one request at `now` and refresh the derived fields.
    ///
    /// `wait` is the strategy's wait time after the request was fed to it.
    pub fn record(&mut self, now: DateTime<Utc>, requests_per_minute: u32, wait: Duration) {
        self.reset_counters_if_needed(now);

        self.current_minute_count += 1;
        self.current_hour_count += 1;
        self.current_day_count += 1;
        self.last_request_time = Some(now);

        self.is_limited = !wait.is_zero();
        let next = ChronoDuration::from_std(wait)
            .ok()
            .and_then(|wait| now.checked_add_signed(wait))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.next_available_time = Some(next);
        self.reset_time = Some(now + minute());
        self.remaining_requests = remaining(requests_per_minute, self.current_minute_count);
    }
}

fn remaining(requests_per_minute: u32, minute_count: u64) -> u32 {
    u64::from(requests_per_minute)
        .saturating_sub(minute_count)
        .try_into()
        .unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_status() {
        let status = RateLimitStatus::new(60);
        assert_eq!(status.current_minute_count, 0);
        assert_eq!(status.remaining_requests, 60);
        assert!(status.last_request_time.is_none());
        assert!(!status.is_limited);
    }

    #[test]
    fn test_record_updates_counters() {
        let mut status = RateLimitStatus::new(10);
        let now = Utc::now();

        status.record(now, 10, Duration::ZERO);
        status.record(now, 10, Duration::ZERO);

        assert_eq!(status.current_minute_count, 2);
        assert_eq!(status.current_hour_count, 2);
        assert_eq!(status.current_day_count, 2);
        assert_eq!(status.remaining_requests, 8);
        assert_eq!(status.last_request_time, Some(now));
        assert_eq!(status.reset_time, Some(now + minute()));
        assert_eq!(status.next_available_time, Some(now));
        assert!(!status.is_limited);
    }

    #[test]
    fn test_record_with_wait_marks_limited() {
        let mut status = RateLimitStatus::new(1);
        let now = Utc::now();

        status.record(now, 1, Duration::from_secs(30));

        assert!(status.is_limited);
        assert_eq!(status.remaining_requests, 0);
        assert_eq!(status.next_available_time, Some(now + ChronoDuration::seconds(30)));
    }

    #[test]
    fn test_minute_counter_resets_lazily() {
        let mut status = RateLimitStatus::new(10);
        let start = Utc::now();
        for _ in 0..3 {
            status.record(start, 10, Duration::ZERO);
        }

        let later = start + ChronoDuration::seconds(61);
        status.record(later, 10, Duration::ZERO);

        assert_eq!(status.current_minute_count, 1);
        assert_eq!(status.current_hour_count, 4);
        assert_eq!(status.current_day_count, 4);
        assert_eq!(status.remaining_requests, 9);
    }

    #[test]
    fn test_hour_and_day_counters_reset() {
        let mut status = RateLimitStatus::new(10);
        let start = Utc::now();
        status.record(start, 10, Duration::ZERO);

        status.record(start + ChronoDuration::seconds(3600), 10, Duration::ZERO);
        assert_eq!(status.current_hour_count, 1);
        assert_eq!(status.current_day_count, 2);

        status.record(start + ChronoDuration::days(2), 10, Duration::ZERO);
        assert_eq!(status.current_day_count, 1);
    }

    #[test]
    fn test_counters_stay_stale_without_new_requests() {
        let mut status = RateLimitStatus::new(10);
        let start = Utc::now() - ChronoDuration::hours(2);
        status.record(start, 10, Duration::ZERO);

        // Hours later, with no new request, the counters still show the old burst
        assert_eq!(status.current_minute_count, 1);
        assert_eq!(status.current_hour_count, 1);

        // The reset check alone recomputes them
        status.reset_counters_if_needed(Utc::now());
        assert_eq!(status.current_minute_count, 0);
        assert_eq!(status.current_hour_count, 0);
        assert_eq!(status.current_day_count, 1);
    }

    #[test]
    fn test_rate_change_recomputes_remaining() {
        let mut status = RateLimitStatus::new(10);
        let now = Utc::now();
        for _ in 0..4 {
            status.record(now, 10, Duration::ZERO);
        }
        assert_eq!(status.remaining_requests, 6);

        status.set_requests_per_minute(20);
        assert_eq!(status.remaining_requests, 16);
        assert_eq!(status.current_minute_count, 4);

        status.set_requests_per_minute(3);
        assert_eq!(status.remaining_requests, 0);
    }
}
