//! The rate limiting service: registry, admission checks and blocking waits.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::backend::RequestGovernor;
use super::bucket::TokenBucket;
use super::key::ServiceKey;
use super::rules::{self, RateLimitConfig, RateLimitFile, RateLimitStrategy, RateLimitUpdate};
use super::status::RateLimitStatus;
use super::window::SlidingWindowCounter;
use crate::config::{AppConfig, ServiceLimitsConfig};
use crate::error::{GovernorError, Result};

/// Rolling window used by sliding-window limits.
const SLIDING_WINDOW_SIZE: Duration = Duration::from_secs(60);

/// The strategy object bound to one key.
///
/// Held behind `Arc` so it can be used after the registry lock is released.
#[derive(Debug, Clone)]
enum Limiter {
    TokenBucket(Arc<TokenBucket>),
    SlidingWindow(Arc<SlidingWindowCounter>),
}

impl Limiter {
    fn for_config(config: &RateLimitConfig) -> Self {
        match config.strategy {
            RateLimitStrategy::TokenBucket => Limiter::TokenBucket(Arc::new(TokenBucket::new(
                config.burst_limit,
                config.refill_rate(),
            ))),
            RateLimitStrategy::SlidingWindow => Limiter::SlidingWindow(Arc::new(
                SlidingWindowCounter::new(SLIDING_WINDOW_SIZE, config.requests_per_minute),
            )),
        }
    }

    fn can_proceed(&self) -> bool {
        match self {
            Limiter::TokenBucket(bucket) => bucket.can_consume(1),
            Limiter::SlidingWindow(window) => window.can_proceed(),
        }
    }

    fn wait_time(&self) -> Duration {
        match self {
            Limiter::TokenBucket(bucket) => bucket.get_wait_time(1),
            Limiter::SlidingWindow(window) => window.get_wait_time(),
        }
    }

    /// Feed one request to the strategy. Returns `false` if a token bucket
    /// had nothing left to take.
    fn record(&self) -> bool {
        match self {
            Limiter::TokenBucket(bucket) => bucket.consume(1),
            Limiter::SlidingWindow(window) => {
                window.record_request();
                true
            }
        }
    }
}

/// Everything keyed by service/operation, guarded by the service lock.
#[derive(Debug, Default)]
struct Registry {
    rate_limits: HashMap<ServiceKey, RateLimitConfig>,
    rate_limit_status: HashMap<ServiceKey, RateLimitStatus>,
    limiters: HashMap<ServiceKey, Limiter>,
}

/// Aggregated counts for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatistics {
    pub operations: usize,
    pub enabled_operations: usize,
    pub limited_operations: usize,
    pub minute_requests: u64,
    pub hour_requests: u64,
    pub day_requests: u64,
}

/// Snapshot of the whole registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitStatistics {
    pub total_services: usize,
    pub total_rate_limits: usize,
    pub services: BTreeMap<String, ServiceStatistics>,
    pub strategies: BTreeMap<RateLimitStrategy, usize>,
}

/// Centralized request governor shared by every outbound integration.
///
/// Keys with no registered policy, or a disabled one, are never throttled:
/// rate limiting here protects upstream quotas, and an unconfigured
/// operation has no quota to protect.
///
/// Waiting is a plain `std::thread::sleep` on the caller's thread. The
/// registry lock is never held while sleeping or while a strategy object
/// takes its own lock.
#[derive(Debug)]
pub struct RateLimitingService {
    registry: RwLock<Registry>,
    /// Where `save_configuration` writes and startup loads overrides from
    config_path: PathBuf,
}

impl RateLimitingService {
    /// Create a service seeded with the default policies for every known
    /// integration, then merge the override file if enabled.
    pub fn new(config: &AppConfig) -> Self {
        let service = Self::with_config_path(&config.rate_limiting.config_path);

        for limit in default_rate_limits(&config.services) {
            if let Err(e) = service.add_rate_limit(limit) {
                warn!(error = %e, "Skipping default rate limit");
            }
        }
        if config.rate_limiting.load_on_startup {
            service.load_configuration();
        }

        info!(
            rate_limits = service.registry.read().rate_limits.len(),
            config_path = %service.config_path.display(),
            "Rate limiting service initialized"
        );
        service
    }

    /// Create an empty service persisting to `config_path`.
    pub fn with_config_path<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Get the override file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Register a policy with a fresh status and strategy object.
    ///
    /// Replaces any existing policy for the same key, discarding its state.
    /// Policies that fail [`RateLimitConfig::validate`] are rejected.
    pub fn add_rate_limit(&self, config: RateLimitConfig) -> Result<()> {
        config.validate()?;
        let key = config.key();
        let limiter = Limiter::for_config(&config);
        let status = RateLimitStatus::new(config.requests_per_minute);

        debug!(
            key = %key,
            strategy = %config.strategy,
            requests_per_minute = config.requests_per_minute,
            burst_limit = config.burst_limit,
            "Registering rate limit"
        );

        let mut registry = self.registry.write();
        registry.limiters.insert(key.clone(), limiter);
        registry.rate_limit_status.insert(key.clone(), status);
        registry.rate_limits.insert(key, config);
        Ok(())
    }

    /// Non-blocking admission check, dispatched by the key's strategy.
    ///
    /// Token-bucket keys are admitted while a token is available;
    /// sliding-window keys while the window is under its limit.
    pub fn can_make_request(&self, service: &str, operation: &str) -> bool {
        let key = ServiceKey::new(service, operation);
        let allowed = match self.active_limiter(&key) {
            Some(limiter) => limiter.can_proceed(),
            None => true,
        };
        trace!(key = %key, allowed, "Admission check");
        allowed
    }

    /// Block until the operation is admitted, then record it.
    ///
    /// Returns how long the calling thread slept. The request is recorded
    /// after the sleep even if another thread took the freed capacity first.
    pub fn wait_for_service(&self, service: &str, operation: &str) -> Duration {
        let key = ServiceKey::new(service, operation);
        let Some(limiter) = self.active_limiter(&key) else {
            return Duration::ZERO;
        };

        if limiter.can_proceed() {
            self.record_request(&key);
            return Duration::ZERO;
        }

        let wait = limiter.wait_time();
        debug!(
            key = %key,
            wait_ms = wait.as_millis() as u64,
            "Rate limit reached, waiting"
        );
        std::thread::sleep(wait);
        self.record_request(&key);
        wait
    }

    /// Time until the operation would be admitted. Records nothing.
    pub fn get_wait_time(&self, service: &str, operation: &str) -> Duration {
        let key = ServiceKey::new(service, operation);
        self.active_limiter(&key)
            .map(|limiter| limiter.wait_time())
            .unwrap_or(Duration::ZERO)
    }

    /// Wait for admission, then run `f`.
    pub fn run_rate_limited<T, F>(&self, service: &str, operation: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.wait_for_service(service, operation);
        f()
    }

    /// Change an existing policy in place.
    ///
    /// If the strategy, per-minute rate or burst size changes, the strategy
    /// object is rebuilt from scratch and its accumulated tokens or window
    /// history are discarded. Counters in the status are kept and the
    /// remaining budget is recomputed against the new per-minute rate.
    pub fn update_rate_limit(
        &self,
        service: &str,
        operation: &str,
        update: &RateLimitUpdate,
    ) -> Result<RateLimitConfig> {
        let key = ServiceKey::new(service, operation);
        let mut registry = self.registry.write();

        let config = registry
            .rate_limits
            .get_mut(&key)
            .ok_or_else(|| GovernorError::UnknownRateLimit(key.to_string()))?;
        let rebuild = config.apply(update)?;
        let config = config.clone();

        if rebuild {
            registry
                .limiters
                .insert(key.clone(), Limiter::for_config(&config));
            if let Some(status) = registry.rate_limit_status.get_mut(&key) {
                status.set_requests_per_minute(config.requests_per_minute);
            }
        }

        info!(key = %key, rebuild, strategy = %config.strategy, "Updated rate limit");
        Ok(config)
    }

    /// Stop throttling a key. Strategy state is kept.
    pub fn disable_rate_limit(&self, service: &str, operation: &str) -> Result<()> {
        self.set_enabled(service, operation, false)
    }

    /// Resume throttling a key with the state it had when disabled.
    pub fn enable_rate_limit(&self, service: &str, operation: &str) -> Result<()> {
        self.set_enabled(service, operation, true)
    }

    fn set_enabled(&self, service: &str, operation: &str, enabled: bool) -> Result<()> {
        let key = ServiceKey::new(service, operation);
        let mut registry = self.registry.write();
        let config = registry
            .rate_limits
            .get_mut(&key)
            .ok_or_else(|| GovernorError::UnknownRateLimit(key.to_string()))?;
        config.enabled = enabled;
        info!(key = %key, enabled, "Toggled rate limit");
        Ok(())
    }

    /// Get the policy registered for a key.
    pub fn get_rate_limit(&self, service: &str, operation: &str) -> Option<RateLimitConfig> {
        let key = ServiceKey::new(service, operation);
        self.registry.read().rate_limits.get(&key).cloned()
    }

    /// Drop a key's policy and state. The key becomes unthrottled.
    ///
    /// Returns `false` if nothing was registered.
    pub fn remove_rate_limit(&self, service: &str, operation: &str) -> bool {
        let key = ServiceKey::new(service, operation);
        let mut registry = self.registry.write();
        registry.limiters.remove(&key);
        registry.rate_limit_status.remove(&key);
        let removed = registry.rate_limits.remove(&key).is_some();
        if removed {
            info!(key = %key, "Removed rate limit");
        }
        removed
    }

    /// Zero a key's counters and rebuild its strategy, keeping the policy.
    pub fn reset_status(&self, service: &str, operation: &str) -> Result<()> {
        let key = ServiceKey::new(service, operation);
        let mut registry = self.registry.write();
        let config = registry
            .rate_limits
            .get(&key)
            .cloned()
            .ok_or_else(|| GovernorError::UnknownRateLimit(key.to_string()))?;

        registry
            .rate_limit_status
            .insert(key.clone(), RateLimitStatus::new(config.requests_per_minute));
        registry.limiters.insert(key.clone(), Limiter::for_config(&config));
        debug!(key = %key, "Reset rate limit status");
        Ok(())
    }

    /// Snapshot statuses, optionally only those of one service.
    ///
    /// Counters are reported as last recorded; see [`RateLimitStatus`] for
    /// why they may be stale.
    pub fn get_status(&self, service: Option<&str>) -> BTreeMap<String, RateLimitStatus> {
        let registry = self.registry.read();
        registry
            .rate_limit_status
            .iter()
            .filter(|(key, _)| service.map_or(true, |s| key.service == s))
            .map(|(key, status)| (key.to_string(), status.clone()))
            .collect()
    }

    /// Aggregate counts per service and per strategy.
    pub fn get_statistics(&self) -> RateLimitStatistics {
        let registry = self.registry.read();
        let mut stats = RateLimitStatistics {
            total_rate_limits: registry.rate_limits.len(),
            ..RateLimitStatistics::default()
        };

        for (key, config) in &registry.rate_limits {
            *stats.strategies.entry(config.strategy).or_insert(0) += 1;

            let service = stats.services.entry(key.service.clone()).or_default();
            service.operations += 1;
            if config.enabled {
                service.enabled_operations += 1;
            }
            if let Some(status) = registry.rate_limit_status.get(key) {
                service.minute_requests += status.current_minute_count;
                service.hour_requests += status.current_hour_count;
                service.day_requests += status.current_day_count;
                if status.is_limited {
                    service.limited_operations += 1;
                }
            }
        }

        stats.total_services = stats.services.len();
        stats
    }

    /// Persist every registered policy to the override file.
    ///
    /// Failures are logged and returned; callers are free to ignore them.
    pub fn save_configuration(&self) -> Result<()> {
        let file = {
            let registry = self.registry.read();
            RateLimitFile::from_configs(registry.rate_limits.values())
        };
        file.save(&self.config_path).map_err(|e| {
            warn!(
                path = %self.config_path.display(),
                error = %e,
                "Failed to save rate limit configuration"
            );
            e
        })
    }

    /// Merge policies from the override file; loaded entries replace
    /// existing ones.
    ///
    /// A missing or malformed file is logged and ignored. Returns the number
    /// of policies loaded.
    pub fn load_configuration(&self) -> usize {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "No rate limit override file");
            return 0;
        }

        match rules::load_from_file(&self.config_path) {
            Ok(configs) => {
                let mut loaded = 0;
                for config in configs {
                    match self.add_rate_limit(config) {
                        Ok(()) => loaded += 1,
                        Err(e) => warn!(error = %e, "Skipping rate limit override"),
                    }
                }
                info!(path = %self.config_path.display(), loaded, "Loaded rate limit overrides");
                loaded
            }
            Err(e) => {
                warn!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load rate limit configuration"
                );
                0
            }
        }
    }

    /// The strategy for an enabled, registered key.
    fn active_limiter(&self, key: &ServiceKey) -> Option<Limiter> {
        let registry = self.registry.read();
        match registry.rate_limits.get(key) {
            Some(config) if config.enabled => registry.limiters.get(key).cloned(),
            _ => None,
        }
    }

    /// Feed the strategy, then count the request in the key's status.
    fn record_request(&self, key: &ServiceKey) {
        let (limiter, requests_per_minute) = {
            let registry = self.registry.read();
            match (registry.limiters.get(key), registry.rate_limits.get(key)) {
                (Some(limiter), Some(config)) => (limiter.clone(), config.requests_per_minute),
                _ => return,
            }
        };

        if !limiter.record() {
            debug!(key = %key, "Recorded request beyond available tokens");
        }
        let wait = limiter.wait_time();

        let mut registry = self.registry.write();
        if let Some(status) = registry.rate_limit_status.get_mut(key) {
            status.record(Utc::now(), requests_per_minute, wait);
            trace!(
                key = %key,
                minute_count = status.current_minute_count,
                remaining = status.remaining_requests,
                "Recorded request"
            );
        }
    }
}

impl RequestGovernor for RateLimitingService {
    fn wait_for_service(&self, service: &str, operation: &str) -> Duration {
        RateLimitingService::wait_for_service(self, service, operation)
    }

    fn can_make_request(&self, service: &str, operation: &str) -> bool {
        RateLimitingService::can_make_request(self, service, operation)
    }

    fn get_wait_time(&self, service: &str, operation: &str) -> Duration {
        RateLimitingService::get_wait_time(self, service, operation)
    }
}

/// Default policies for the integrations the pipeline talks to.
pub fn default_rate_limits(services: &ServiceLimitsConfig) -> Vec<RateLimitConfig> {
    use RateLimitStrategy::{SlidingWindow, TokenBucket};

    let scraping_rpm = services.scraping_requests_per_minute();
    let defaults = [
        ("openai", "chat_completion", services.openai_requests_per_minute, 10, TokenBucket),
        ("hunter", "domain_search", services.hunter_requests_per_minute, 5, SlidingWindow),
        ("hunter", "email_finder", services.hunter_requests_per_minute, 5, SlidingWindow),
        ("hunter", "email_verifier", services.hunter_requests_per_minute, 5, SlidingWindow),
        ("linkedin", "profile_scrape", scraping_rpm, 1, SlidingWindow),
        ("linkedin", "company_scrape", scraping_rpm, 1, SlidingWindow),
        ("producthunt", "scrape", scraping_rpm, 1, SlidingWindow),
        ("notion", "api", services.notion_requests_per_minute, 3, TokenBucket),
        ("resend", "send_email", services.resend_requests_per_minute, 10, SlidingWindow),
    ];

    defaults
        .into_iter()
        .filter_map(|(service, operation, rpm, burst, strategy)| {
            RateLimitConfig::per_minute(service, operation, rpm, burst, strategy)
                .map_err(|e| warn!(service, operation, error = %e, "Skipping default rate limit"))
                .ok()
        })
        .collect()
}
