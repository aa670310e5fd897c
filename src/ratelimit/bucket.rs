//! Token bucket implementation.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Mutable bucket state, guarded as one unit so refill math stays atomic
/// with respect to concurrent consumers.
#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A fixed-capacity token bucket with continuous refill.
///
/// Allows bursts of up to `capacity` requests, then throttles to
/// `refill_rate` tokens per second. The bucket never blocks; callers decide
/// whether and how long to wait using [`TokenBucket::get_wait_time`].
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum number of tokens held
    capacity: f64,
    /// Tokens added per second
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        let capacity = capacity as f64;
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to take `tokens` out of the bucket.
    ///
    /// Returns `true` and subtracts on success. On failure the token count is
    /// left unchanged and `false` is returned.
    pub fn consume(&self, tokens: u32) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        let requested = tokens as f64;
        if state.tokens >= requested {
            state.tokens -= requested;
            true
        } else {
            false
        }
    }

    /// Check whether `tokens` could be consumed right now without taking them.
    pub fn can_consume(&self, tokens: u32) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens >= tokens as f64
    }

    /// Time until `tokens` will be available.
    ///
    /// Zero if they are available now. A bucket with a zero refill rate that
    /// cannot satisfy the request reports `Duration::MAX`.
    pub fn get_wait_time(&self, tokens: u32) -> Duration {
        let mut state = self.state.lock();
        self.refill(&mut state);

        let requested = tokens as f64;
        if state.tokens >= requested {
            return Duration::ZERO;
        }
        if self.refill_rate <= 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64((requested - state.tokens) / self.refill_rate)
            .unwrap_or(Duration::MAX)
    }

    /// Tokens currently available, after refill.
    pub fn available_tokens(&self) -> f64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Get the capacity of this bucket.
    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    /// Get the refill rate in tokens per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_bucket_is_full() {
        let bucket = TokenBucket::new(5, 1.0);
        assert_eq!(bucket.capacity(), 5);
        assert!((bucket.available_tokens() - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_burst_then_exhausted() {
        // rpm = 60 with burst 10 => refill 1 token/s
        let bucket = TokenBucket::new(10, 60.0 / 60.0);

        for _ in 0..10 {
            assert!(bucket.consume(1));
        }

        // The 11th immediate request should be rejected
        assert!(!bucket.consume(1));
    }

    #[test]
    fn test_failed_consume_leaves_tokens() {
        let bucket = TokenBucket::new(3, 0.0);

        assert!(!bucket.consume(5));
        assert!((bucket.available_tokens() - 3.0).abs() < f64::EPSILON);
        assert!(bucket.consume(3));
    }

    #[test]
    fn test_can_consume_does_not_take_tokens() {
        let bucket = TokenBucket::new(1, 0.0);

        assert!(bucket.can_consume(1));
        assert!(bucket.can_consume(1));
        assert!(bucket.consume(1));
        assert!(!bucket.can_consume(1));
    }

    #[test]
    fn test_wait_time_fresh_bucket_is_zero() {
        let bucket = TokenBucket::new(5, 1.0);
        assert_eq!(bucket.get_wait_time(1), Duration::ZERO);
    }

    #[test]
    fn test_wait_time_when_empty() {
        let bucket = TokenBucket::new(2, 2.0);
        assert!(bucket.consume(2));

        // One token at 2 tokens/s is about half a second away
        let wait = bucket.get_wait_time(1);
        assert!(wait > Duration::from_millis(400), "wait was {:?}", wait);
        assert!(wait <= Duration::from_millis(500), "wait was {:?}", wait);
    }

    #[test]
    fn test_wait_time_without_refill() {
        let bucket = TokenBucket::new(1, 0.0);
        assert!(bucket.consume(1));
        assert_eq!(bucket.get_wait_time(1), Duration::MAX);
    }

    #[test]
    fn test_refill_over_time() {
        let bucket = TokenBucket::new(1, 20.0);
        assert!(bucket.consume(1));
        assert!(!bucket.consume(1));

        thread::sleep(Duration::from_millis(100));
        assert!(bucket.consume(1));
    }

    #[test]
    fn test_refill_clamped_to_capacity() {
        let bucket = TokenBucket::new(2, 1000.0);
        thread::sleep(Duration::from_millis(20));
        assert!(bucket.available_tokens() <= 2.0);
    }

    #[test]
    fn test_concurrent_consumers_exact_capacity() {
        let capacity = 25;
        let threads = 100;
        let bucket = Arc::new(TokenBucket::new(capacity, 1e-9));
        let succeeded = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                let succeeded = Arc::clone(&succeeded);
                thread::spawn(move || {
                    if bucket.consume(1) {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(succeeded.load(Ordering::SeqCst), capacity as usize);
    }
}
