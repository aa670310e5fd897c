//! Process-wide rate limiter for the composition root.
//!
//! Library code should take a `&RateLimitingService` or an
//! `Arc<dyn RequestGovernor>`; this accessor exists for binaries that need a
//! single shared instance.

use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::limiter::RateLimitingService;
use crate::config::AppConfig;

static RATE_LIMITER: OnceLock<Arc<RateLimitingService>> = OnceLock::new();

/// Get the shared rate limiter, building it on first use.
///
/// The first caller's configuration wins (defaults if `None`). Concurrent
/// first calls are safe: exactly one instance is constructed and every
/// caller receives it. Later calls ignore `config`.
pub fn get_rate_limiter(config: Option<&AppConfig>) -> Arc<RateLimitingService> {
    Arc::clone(RATE_LIMITER.get_or_init(|| {
        debug!("Constructing process-wide rate limiter");
        let default_config;
        let config = match config {
            Some(config) => config,
            None => {
                default_config = AppConfig::default();
                &default_config
            }
        };
        Arc::new(RateLimitingService::new(config))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_single_instance_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.rate_limiting.config_path = dir.path().join("rate_limits.json");
        config.services.openai_requests_per_minute = 42;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let config = config.clone();
                thread::spawn(move || get_rate_limiter(Some(&config)))
            })
            .collect();
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(&instances[0], instance));
        }

        // Later configuration is ignored
        let mut other = AppConfig::default();
        other.services.openai_requests_per_minute = 1;
        let again = get_rate_limiter(Some(&other));
        assert!(Arc::ptr_eq(&instances[0], &again));
        assert_eq!(
            again
                .get_rate_limit("openai", "chat_completion")
                .unwrap()
                .requests_per_minute,
            42
        );
    }
}
