//! Rate limit policies and the persisted override file.
//!
//! The override file is a JSON document keyed by `"{service}.{operation}"`:
//!
//! ```json
//! {
//!   "rate_limits": {
//!     "openai.chat_completion": {
//!       "requests_per_minute": 60,
//!       "requests_per_hour": 3600,
//!       "requests_per_day": 86400,
//!       "burst_limit": 10,
//!       "strategy": "token_bucket",
//!       "enabled": true
//!     }
//!   },
//!   "last_updated": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! Entries are parsed one at a time so a single malformed entry does not
//! discard the rest of the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use super::key::ServiceKey;
use crate::error::{GovernorError, Result};

/// Algorithm governing admission for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// Exact rolling window over the last minute
    SlidingWindow,
    /// Burst capacity with continuous refill
    TokenBucket,
}

impl RateLimitStrategy {
    /// Get the persisted name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitStrategy::SlidingWindow => "sliding_window",
            RateLimitStrategy::TokenBucket => "token_bucket",
        }
    }
}

impl std::fmt::Display for RateLimitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitStrategy {
    type Err = GovernorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sliding_window" => Ok(RateLimitStrategy::SlidingWindow),
            "token_bucket" => Ok(RateLimitStrategy::TokenBucket),
            "fixed_window" | "leaky_bucket" => Err(GovernorError::Config(format!(
                "unsupported rate limit strategy '{}'",
                s
            ))),
            other => Err(GovernorError::Config(format!(
                "unknown rate limit strategy '{}'",
                other
            ))),
        }
    }
}

/// A validated rate limit policy for one service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitConfig {
    /// The external service name
    pub service_name: String,
    /// The operation against that service
    pub operation: String,
    /// Requests allowed per minute
    pub requests_per_minute: u32,
    /// Requests allowed per hour
    pub requests_per_hour: u32,
    /// Requests allowed per day
    pub requests_per_day: u32,
    /// Maximum burst size (token bucket capacity)
    pub burst_limit: u32,
    /// Admission algorithm
    pub strategy: RateLimitStrategy,
    /// Disabled limits never throttle
    pub enabled: bool,
}

impl RateLimitConfig {
    /// Create a policy, rejecting non-positive limits.
    pub fn new(
        service_name: &str,
        operation: &str,
        requests_per_minute: u32,
        requests_per_hour: u32,
        requests_per_day: u32,
        burst_limit: u32,
        strategy: RateLimitStrategy,
    ) -> Result<Self> {
        let config = Self {
            service_name: service_name.to_string(),
            operation: operation.to_string(),
            requests_per_minute,
            requests_per_hour,
            requests_per_day,
            burst_limit,
            strategy,
            enabled: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a policy whose hourly and daily limits follow from the
    /// per-minute rate.
    pub fn per_minute(
        service_name: &str,
        operation: &str,
        requests_per_minute: u32,
        burst_limit: u32,
        strategy: RateLimitStrategy,
    ) -> Result<Self> {
        let per_hour = requests_per_minute.saturating_mul(60);
        Self::new(
            service_name,
            operation,
            requests_per_minute,
            per_hour,
            per_hour.saturating_mul(24),
            burst_limit,
            strategy,
        )
    }

    /// Build a policy from a persisted entry.
    pub fn from_entry(key: &ServiceKey, entry: &RateLimitEntry) -> Result<Self> {
        let strategy = entry.strategy.parse()?;
        let mut config = Self::new(
            &key.service,
            &key.operation,
            entry.requests_per_minute,
            entry.requests_per_hour,
            entry.requests_per_day,
            entry.burst_limit,
            strategy,
        )?;
        config.enabled = entry.enabled;
        Ok(config)
    }

    /// Check that the names form a reversible key and every limit is positive.
    ///
    /// The service name may not contain `.`: the key string splits at the
    /// first dot, so `"a.b" / "c"` and `"a" / "b.c"` would collide.
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() || self.operation.trim().is_empty() {
            return Err(GovernorError::Config(format!(
                "service name and operation must be non-empty (got '{}' / '{}')",
                self.service_name, self.operation
            )));
        }
        if self.service_name.contains('.') {
            return Err(GovernorError::Config(format!(
                "service name '{}' must not contain '.'",
                self.service_name
            )));
        }

        let limits = [
            ("requests_per_minute", self.requests_per_minute),
            ("requests_per_hour", self.requests_per_hour),
            ("requests_per_day", self.requests_per_day),
            ("burst_limit", self.burst_limit),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(GovernorError::Config(format!(
                    "{} for {} must be positive",
                    name,
                    self.key()
                )));
            }
        }
        Ok(())
    }

    /// The key this policy is registered under.
    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(&self.service_name, &self.operation)
    }

    /// Token refill rate implied by the per-minute limit.
    pub fn refill_rate(&self) -> f64 {
        self.requests_per_minute as f64 / 60.0
    }

    /// Apply an update, returning whether the strategy object must be rebuilt.
    ///
    /// The policy is left untouched if the result would be invalid.
    pub(crate) fn apply(&mut self, update: &RateLimitUpdate) -> Result<bool> {
        let mut next = self.clone();
        if let Some(rpm) = update.requests_per_minute {
            next.requests_per_minute = rpm;
        }
        if let Some(rph) = update.requests_per_hour {
            next.requests_per_hour = rph;
        }
        if let Some(rpd) = update.requests_per_day {
            next.requests_per_day = rpd;
        }
        if let Some(burst) = update.burst_limit {
            next.burst_limit = burst;
        }
        if let Some(strategy) = update.strategy {
            next.strategy = strategy;
        }
        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        next.validate()?;

        let rebuild = next.strategy != self.strategy
            || next.requests_per_minute != self.requests_per_minute
            || next.burst_limit != self.burst_limit;
        *self = next;
        Ok(rebuild)
    }
}

/// A partial change to an existing policy. Unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitUpdate {
    pub requests_per_minute: Option<u32>,
    pub requests_per_hour: Option<u32>,
    pub requests_per_day: Option<u32>,
    pub burst_limit: Option<u32>,
    pub strategy: Option<RateLimitStrategy>,
    pub enabled: Option<bool>,
}

impl RateLimitUpdate {
    pub fn requests_per_minute(mut self, rpm: u32) -> Self {
        self.requests_per_minute = Some(rpm);
        self
    }

    pub fn requests_per_hour(mut self, rph: u32) -> Self {
        self.requests_per_hour = Some(rph);
        self
    }

    pub fn requests_per_day(mut self, rpd: u32) -> Self {
        self.requests_per_day = Some(rpd);
        self
    }

    pub fn burst_limit(mut self, burst: u32) -> Self {
        self.burst_limit = Some(burst);
        self
    }

    pub fn strategy(mut self, strategy: RateLimitStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }
}

/// One policy as stored in the override file.
///
/// The strategy stays a string here so that unsupported names surface as a
/// configuration error for that entry instead of failing the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitEntry {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
    pub requests_per_day: u32,
    pub burst_limit: u32,
    pub strategy: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl From<&RateLimitConfig> for RateLimitEntry {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            requests_per_minute: config.requests_per_minute,
            requests_per_hour: config.requests_per_hour,
            requests_per_day: config.requests_per_day,
            burst_limit: config.burst_limit,
            strategy: config.strategy.to_string(),
            enabled: config.enabled,
        }
    }
}

/// The persisted override document.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitFile {
    pub rate_limits: BTreeMap<ServiceKey, RateLimitEntry>,
    pub last_updated: DateTime<Utc>,
}

impl RateLimitFile {
    /// Snapshot a set of policies, stamped with the current time.
    pub fn from_configs<'a, I>(configs: I) -> Self
    where
        I: IntoIterator<Item = &'a RateLimitConfig>,
    {
        Self {
            rate_limits: configs
                .into_iter()
                .map(|config| (config.key(), RateLimitEntry::from(config)))
                .collect(),
            last_updated: Utc::now(),
        }
    }

    /// Write the document as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(
            path = %path.display(),
            rate_limits = self.rate_limits.len(),
            "Saved rate limit configuration"
        );
        Ok(())
    }
}

/// Load policies from an override file.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<RateLimitConfig>> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading rate limit configuration");

    let contents = std::fs::read_to_string(path)?;
    load_from_json(&contents)
}

/// Load policies from override JSON.
///
/// Fails only if the document itself is not a JSON object with a
/// `rate_limits` object. Malformed entries are skipped with a warning.
pub fn load_from_json(json: &str) -> Result<Vec<RateLimitConfig>> {
    let document: serde_json::Value = serde_json::from_str(json)?;
    let entries = document
        .get("rate_limits")
        .and_then(|v| v.as_object())
        .ok_or_else(|| GovernorError::Config("missing 'rate_limits' object".to_string()))?;

    let mut configs = Vec::with_capacity(entries.len());
    for (raw_key, raw_entry) in entries {
        match parse_entry(raw_key, raw_entry) {
            Ok(config) => configs.push(config),
            Err(e) => warn!(key = %raw_key, error = %e, "Skipping invalid rate limit entry"),
        }
    }
    Ok(configs)
}

fn parse_entry(raw_key: &str, raw_entry: &serde_json::Value) -> Result<RateLimitConfig> {
    let key = ServiceKey::parse(raw_key)
        .ok_or_else(|| GovernorError::Config(format!("invalid service key '{}'", raw_key)))?;
    let entry: RateLimitEntry = serde_json::from_value(raw_entry.clone())?;
    RateLimitConfig::from_entry(&key, &entry)
}
