//! URL, LinkedIn URL and domain name validation.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::result::{codes, ValidationResult};

const DEFAULT_SCHEMES: &[&str] = &["http", "https"];

/// Longest textual domain name permitted by DNS.
const MAX_DOMAIN_LENGTH: usize = 253;

/// Paths of LinkedIn member profiles.
static LINKEDIN_PROFILE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^/in/[A-Za-z0-9_%-]+/?$").unwrap(),
        Regex::new(r"^/pub/[A-Za-z0-9_%-]+(/[A-Za-z0-9]+){0,3}/?$").unwrap(),
    ]
});

static DOMAIN_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap()
});

static TOP_LEVEL_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,63}$").unwrap());

/// Validate an absolute URL with a host.
///
/// `allowed_schemes` defaults to `http` and `https`.
pub fn validate_url(url: &str, allowed_schemes: Option<&[&str]>) -> ValidationResult {
    let url = url.trim();
    if url.is_empty() {
        return ValidationResult::error("URL is required")
            .with_field("url")
            .with_code(codes::EMPTY_URL);
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            return ValidationResult::error(format!("Invalid URL format: {} ({})", url, e))
                .with_field("url")
                .with_code(codes::INVALID_URL_FORMAT)
                .with_fix("Use an absolute URL such as https://example.com");
        }
    };

    let allowed = allowed_schemes.unwrap_or(DEFAULT_SCHEMES);
    if !allowed.contains(&parsed.scheme()) {
        return ValidationResult::error(format!(
            "URL scheme '{}' is not allowed (expected one of: {})",
            parsed.scheme(),
            allowed.join(", ")
        ))
        .with_field("url")
        .with_code(codes::INVALID_SCHEME);
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => ValidationResult::valid("URL is valid").with_field("url"),
        _ => ValidationResult::error(format!("URL has no domain: {}", url))
            .with_field("url")
            .with_code(codes::MISSING_DOMAIN),
    }
}

/// Validate a LinkedIn member profile URL.
///
/// Non-LinkedIn hosts are errors. LinkedIn URLs that are not member
/// profiles (company pages, posts, search results) fail with `Warning`
/// severity.
pub fn validate_linkedin_url(url: &str) -> ValidationResult {
    let base = validate_url(url, None);
    if !base.is_valid {
        return base.with_field("linkedin_url");
    }

    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return base.with_field("linkedin_url"),
    };
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if host != "linkedin.com" && !host.ends_with(".linkedin.com") {
        return ValidationResult::error(format!("Not a LinkedIn URL: {}", host))
            .with_field("linkedin_url")
            .with_code(codes::NOT_LINKEDIN_URL);
    }

    if LINKEDIN_PROFILE_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(parsed.path()))
    {
        return ValidationResult::valid("LinkedIn URL is valid").with_field("linkedin_url");
    }

    ValidationResult::warning(false, format!("Non-standard LinkedIn URL path: {}", parsed.path()))
        .with_field("linkedin_url")
        .with_code(codes::NON_STANDARD_LINKEDIN_URL)
        .with_fix("Use a profile URL such as https://www.linkedin.com/in/<name>")
}

/// Validate a bare domain name such as `acme.com`.
///
/// A single trailing dot is accepted.
pub fn validate_domain(domain: &str) -> ValidationResult {
    let domain = domain.trim();
    if domain.is_empty() {
        return ValidationResult::error("Domain is required")
            .with_field("domain")
            .with_code(codes::EMPTY_DOMAIN);
    }

    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.len() > MAX_DOMAIN_LENGTH {
        return ValidationResult::error(format!(
            "Domain exceeds {} characters",
            MAX_DOMAIN_LENGTH
        ))
        .with_field("domain")
        .with_code(codes::DOMAIN_TOO_LONG);
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let well_formed = labels.len() >= 2
        && labels.iter().all(|label| DOMAIN_LABEL.is_match(label))
        && labels
            .last()
            .map_or(false, |tld| TOP_LEVEL_DOMAIN.is_match(tld));

    if well_formed {
        ValidationResult::valid("Domain is valid").with_field("domain")
    } else {
        ValidationResult::error(format!("Invalid domain format: {}", domain))
            .with_field("domain")
            .with_code(codes::INVALID_DOMAIN_FORMAT)
            .with_fix("Use a bare domain such as example.com, without scheme or path")
    }
}
