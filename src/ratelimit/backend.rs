//! Governor trait for abstracting the rate limiting service from its callers.

use std::time::Duration;

/// The surface the scraping, LLM, CRM and email glue calls before doing I/O.
///
/// Collaborators hold an `Arc<dyn RequestGovernor>` instead of reaching for a
/// process-wide limiter, so tests and one-off tools can substitute
/// [`Unlimited`].
pub trait RequestGovernor: Send + Sync {
    /// Block the calling thread until the operation is admitted, then record it.
    ///
    /// Returns how long the thread slept.
    fn wait_for_service(&self, service: &str, operation: &str) -> Duration;

    /// Non-blocking admission check.
    fn can_make_request(&self, service: &str, operation: &str) -> bool;

    /// Time until the operation would be admitted, without recording anything.
    fn get_wait_time(&self, service: &str, operation: &str) -> Duration;
}

/// A governor with no configured limits.
///
/// Every key is unconfigured, so every request is admitted immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RequestGovernor for Unlimited {
    fn wait_for_service(&self, _service: &str, _operation: &str) -> Duration {
        Duration::ZERO
    }

    fn can_make_request(&self, _service: &str, _operation: &str) -> bool {
        true
    }

    fn get_wait_time(&self, _service: &str, _operation: &str) -> Duration {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unlimited_never_throttles() {
        let governor: Arc<dyn RequestGovernor> = Arc::new(Unlimited);

        for _ in 0..1000 {
            assert!(governor.can_make_request("openai", "chat_completion"));
            assert_eq!(governor.wait_for_service("openai", "chat_completion"), Duration::ZERO);
        }
        assert_eq!(governor.get_wait_time("openai", "chat_completion"), Duration::ZERO);
    }
}
