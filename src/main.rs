use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use outreach_governor::config::AppConfig;
use outreach_governor::ratelimit::get_rate_limiter;
use outreach_governor::validation::{
    validate_domain, validate_email, validate_email_with_mx, validate_linkedin_url, validate_url,
    MxResolver, ValidationResult,
};

/// Inspect and exercise the outreach request governor.
#[derive(Debug, Parser)]
#[command(name = "outreach-governor", version, about)]
struct Cli {
    /// YAML settings file; `OUTREACH__*` environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show per-key rate limit status
    Status {
        /// Only keys belonging to this service
        #[arg(short, long)]
        service: Option<String>,
    },
    /// Show aggregate statistics
    Stats,
    /// Check whether a request may proceed now, without recording it
    Check { service: String, operation: String },
    /// Block until a request is admitted, then record it
    Wait { service: String, operation: String },
    /// Write the current policies to the override file
    Save,
    /// Validate a single value
    Validate {
        #[command(subcommand)]
        target: ValidateTarget,
    },
}

#[derive(Debug, Subcommand)]
enum ValidateTarget {
    Email {
        value: String,
        /// Also check that the domain publishes MX records (needs the `dns` feature)
        #[arg(long)]
        check_mx: bool,
    },
    Url { value: String },
    Linkedin { value: String },
    Domain { value: String },
}

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(cli.config.as_deref())?;
    info!(
        config_path = %config.rate_limiting.config_path.display(),
        "Configuration loaded"
    );

    // Validation needs no rate limiter; build it only for the other commands
    let rate_limiter = || get_rate_limiter(Some(&config));

    match cli.command {
        Command::Status { service } => {
            print_json(&rate_limiter().get_status(service.as_deref()))?
        }
        Command::Stats => print_json(&rate_limiter().get_statistics())?,
        Command::Check { service, operation } => {
            let rate_limiter = rate_limiter();
            let allowed = rate_limiter.can_make_request(&service, &operation);
            let wait = rate_limiter.get_wait_time(&service, &operation);
            print_json(&json!({
                "service": service,
                "operation": operation,
                "allowed": allowed,
                "wait_seconds": wait.as_secs_f64(),
            }))?;
        }
        Command::Wait { service, operation } => {
            let waited = rate_limiter().wait_for_service(&service, &operation);
            print_json(&json!({
                "service": service,
                "operation": operation,
                "waited_seconds": waited.as_secs_f64(),
            }))?;
        }
        Command::Save => {
            let rate_limiter = rate_limiter();
            rate_limiter.save_configuration()?;
            print_json(&json!({
                "saved": rate_limiter.config_path().display().to_string(),
            }))?;
        }
        Command::Validate { target } => {
            let result = match target {
                ValidateTarget::Email {
                    value,
                    check_mx: false,
                } => validate_email(&value),
                ValidateTarget::Email {
                    value,
                    check_mx: true,
                } => {
                    let resolver = mx_resolver();
                    validate_email_with_mx(&value, resolver.as_deref())
                }
                ValidateTarget::Url { value } => validate_url(&value, None),
                ValidateTarget::Linkedin { value } => validate_linkedin_url(&value),
                ValidateTarget::Domain { value } => validate_domain(&value),
            };
            return report_validation(&result);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_validation(result: &ValidationResult) -> anyhow::Result<ExitCode> {
    print_json(result)?;
    Ok(if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(feature = "dns")]
fn mx_resolver() -> Option<Box<dyn MxResolver>> {
    match outreach_governor::validation::DnsMxResolver::from_system_conf() {
        Ok(resolver) => Some(Box::new(resolver)),
        Err(e) => {
            warn!(error = %e, "DNS resolver unavailable, skipping MX check");
            None
        }
    }
}

#[cfg(not(feature = "dns"))]
fn mx_resolver() -> Option<Box<dyn MxResolver>> {
    warn!("Built without the `dns` feature, skipping MX check");
    None
}
