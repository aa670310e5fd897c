//! Configuration management for the outreach governor.
//!
//! Settings are read from an optional YAML file and then overridden by
//! environment variables prefixed with `OUTREACH__` (for example
//! `OUTREACH__SERVICES__OPENAI_REQUESTS_PER_MINUTE=120`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GovernorError, Result};

/// Environment variable prefix for setting overrides.
const ENV_PREFIX: &str = "OUTREACH";

/// Main configuration for the governor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-service request knobs
    #[serde(default)]
    pub services: ServiceLimitsConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Request rate knobs for the external services the pipeline talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLimitsConfig {
    /// LLM completion requests per minute
    #[serde(default = "default_openai_rpm")]
    pub openai_requests_per_minute: u32,

    /// Content-finder (email lookup) requests per minute
    #[serde(default = "default_hunter_rpm")]
    pub hunter_requests_per_minute: u32,

    /// CRM API requests per minute
    #[serde(default = "default_notion_rpm")]
    pub notion_requests_per_minute: u32,

    /// Transactional email sends per minute
    #[serde(default = "default_resend_rpm")]
    pub resend_requests_per_minute: u32,

    /// Delay between scraping requests in seconds
    #[serde(default = "default_scraping_delay")]
    pub scraping_delay_secs: f64,
}

impl Default for ServiceLimitsConfig {
    fn default() -> Self {
        Self {
            openai_requests_per_minute: default_openai_rpm(),
            hunter_requests_per_minute: default_hunter_rpm(),
            notion_requests_per_minute: default_notion_rpm(),
            resend_requests_per_minute: default_resend_rpm(),
            scraping_delay_secs: default_scraping_delay(),
        }
    }
}

impl ServiceLimitsConfig {
    /// Requests per minute implied by the scraping delay (`60 / delay`).
    ///
    /// Never returns less than one request per minute.
    pub fn scraping_requests_per_minute(&self) -> u32 {
        let rpm = (60.0 / self.scraping_delay_secs).floor();
        if rpm.is_finite() && rpm >= 1.0 {
            rpm.min(u32::MAX as f64) as u32
        } else {
            1
        }
    }
}

fn default_openai_rpm() -> u32 {
    60
}

fn default_hunter_rpm() -> u32 {
    10
}

fn default_notion_rpm() -> u32 {
    180
}

fn default_resend_rpm() -> u32 {
    100
}

fn default_scraping_delay() -> f64 {
    2.0
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Path to the persisted rate limit override file
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Whether to merge the override file into the defaults at startup
    #[serde(default = "default_load_on_startup")]
    pub load_on_startup: bool,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            load_on_startup: default_load_on_startup(),
        }
    }
}

fn default_config_path() -> PathBuf {
    PathBuf::from("logs/rate_limits.json")
}

fn default_load_on_startup() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from a YAML file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&contents)
            .map_err(|e| GovernorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional YAML file layered with
    /// `OUTREACH__`-prefixed environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }
        let config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce a valid rate limit.
    pub fn validate(&self) -> Result<()> {
        let services = &self.services;
        let knobs = [
            ("openai_requests_per_minute", services.openai_requests_per_minute),
            ("hunter_requests_per_minute", services.hunter_requests_per_minute),
            ("notion_requests_per_minute", services.notion_requests_per_minute),
            ("resend_requests_per_minute", services.resend_requests_per_minute),
        ];
        for (name, value) in knobs {
            if value == 0 {
                return Err(GovernorError::Config(format!("{} must be positive", name)));
            }
        }
        if !(services.scraping_delay_secs.is_finite() && services.scraping_delay_secs > 0.0) {
            return Err(GovernorError::Config(format!(
                "scraping_delay_secs must be positive, got {}",
                services.scraping_delay_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.services.openai_requests_per_minute, 60);
        assert_eq!(config.services.hunter_requests_per_minute, 10);
        assert_eq!(config.rate_limiting.config_path, PathBuf::from("logs/rate_limits.json"));
        assert!(config.rate_limiting.load_on_startup);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scraping_delay_to_rpm() {
        let mut services = ServiceLimitsConfig::default();
        assert_eq!(services.scraping_requests_per_minute(), 30);

        services.scraping_delay_secs = 0.5;
        assert_eq!(services.scraping_requests_per_minute(), 120);

        // Delays longer than a minute still allow one request per minute
        services.scraping_delay_secs = 90.0;
        assert_eq!(services.scraping_requests_per_minute(), 1);
    }

    #[test]
    fn test_from_file_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
services:
  openai_requests_per_minute: 120
  scraping_delay_secs: 5.0
rate_limiting:
  config_path: /tmp/limits.json
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.services.openai_requests_per_minute, 120);
        assert_eq!(config.services.scraping_requests_per_minute(), 12);
        // Unset knobs keep their defaults
        assert_eq!(config.services.notion_requests_per_minute, 180);
        assert_eq!(config.rate_limiting.config_path, PathBuf::from("/tmp/limits.json"));
    }

    #[test]
    fn test_zero_rpm_rejected() {
        let mut config = AppConfig::default();
        config.services.resend_requests_per_minute = 0;
        assert!(matches!(config.validate(), Err(GovernorError::Config(_))));
    }

    #[test]
    fn test_non_positive_delay_rejected() {
        let mut config = AppConfig::default();
        config.services.scraping_delay_secs = 0.0;
        assert!(config.validate().is_err());

        config.services.scraping_delay_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_layers_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "services:\n  hunter_requests_per_minute: 25").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.services.hunter_requests_per_minute, 25);
        assert_eq!(config.services.openai_requests_per_minute, 60);
    }
}
