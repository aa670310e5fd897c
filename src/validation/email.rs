//! Email address validation.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::result::{codes, ValidationResult};

/// Longest address allowed in an SMTP forward path.
const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

/// Throwaway mailbox providers. Outreach to these never reaches a person.
const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "dispostable.com",
    "getnada.com",
    "guerrillamail.com",
    "maildrop.cc",
    "mailinator.com",
    "sharklasers.com",
    "temp-mail.org",
    "tempmail.org",
    "throwaway.email",
    "trashmail.com",
    "yopmail.com",
];

/// DNS capability used for the optional MX check.
///
/// With the `dns` feature enabled, `DnsMxResolver` implements this against
/// real DNS servers.
pub trait MxResolver {
    /// Whether `domain` publishes at least one MX record.
    fn has_mx_records(&self, domain: &str) -> std::io::Result<bool>;
}

/// Validate an address's format and reject disposable providers.
///
/// A disposable domain fails validation with `Warning` severity: the address
/// is well-formed but not worth contacting.
pub fn validate_email(email: &str) -> ValidationResult {
    let email = email.trim();
    if email.is_empty() {
        return ValidationResult::error("Email address is required")
            .with_field("email")
            .with_code(codes::EMPTY_EMAIL);
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return ValidationResult::error(format!(
            "Email address exceeds {} characters",
            MAX_EMAIL_LENGTH
        ))
        .with_field("email")
        .with_code(codes::EMAIL_TOO_LONG);
    }

    let domain = match email.rsplit_once('@') {
        Some((_, domain)) if EMAIL_PATTERN.is_match(email) && !domain.contains("..") => {
            domain.to_ascii_lowercase()
        }
        _ => {
            return ValidationResult::error(format!("Invalid email format: {}", email))
                .with_field("email")
                .with_code(codes::INVALID_EMAIL_FORMAT)
                .with_fix("Use the form name@example.com");
        }
    };

    if DISPOSABLE_DOMAINS.contains(&domain.as_str()) {
        debug!(domain = %domain, "Disposable email domain");
        return ValidationResult::warning(false, format!("Disposable email domain: {}", domain))
            .with_field("email")
            .with_code(codes::DISPOSABLE_EMAIL)
            .with_fix("Find a work address for this contact");
    }

    ValidationResult::valid("Email address is valid").with_field("email")
}

/// Validate an address and check that its domain accepts mail.
///
/// Without a resolver, or when the lookup itself fails, the address passes
/// with a warning instead of failing.
pub fn validate_email_with_mx(email: &str, resolver: Option<&dyn MxResolver>) -> ValidationResult {
    let result = validate_email(email);
    if !result.is_valid {
        return result;
    }

    let domain = match email.trim().rsplit_once('@') {
        Some((_, domain)) => domain.to_ascii_lowercase(),
        None => return result,
    };

    let Some(resolver) = resolver else {
        return ValidationResult::warning(true, "MX check skipped: DNS resolution unavailable")
            .with_field("email")
            .with_code(codes::MX_CHECK_UNAVAILABLE);
    };

    match resolver.has_mx_records(&domain) {
        Ok(true) => result,
        Ok(false) => ValidationResult::error(format!("Domain {} has no MX records", domain))
            .with_field("email")
            .with_code(codes::NO_MX_RECORD),
        Err(e) => {
            debug!(domain = %domain, error = %e, "MX lookup failed");
            ValidationResult::warning(true, format!("MX lookup failed for {}: {}", domain, e))
                .with_field("email")
                .with_code(codes::MX_LOOKUP_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;

    struct StaticResolver(std::io::Result<bool>);

    impl MxResolver for StaticResolver {
        fn has_mx_records(&self, _domain: &str) -> std::io::Result<bool> {
            match &self.0 {
                Ok(found) => Ok(*found),
                Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    #[test]
    fn test_valid_email() {
        let result = validate_email("a@b.com");
        assert!(result.is_valid);
        assert_eq!(result.severity, Severity::Info);

        assert!(validate_email("  jane.doe+sales@acme.io ").is_valid);
    }

    #[test]
    fn test_invalid_format() {
        for email in ["not-an-email", "a@b", "@acme.com", "jane@acme..com", "jane doe@acme.com"] {
            let result = validate_email(email);
            assert!(!result.is_valid, "{} should be invalid", email);
            assert_eq!(result.severity, Severity::Error);
            assert_eq!(result.error_code.as_deref(), Some(codes::INVALID_EMAIL_FORMAT));
        }
    }

    #[test]
    fn test_empty_email() {
        let result = validate_email("   ");
        assert!(!result.is_valid);
        assert_eq!(result.error_code.as_deref(), Some(codes::EMPTY_EMAIL));
    }

    #[test]
    fn test_too_long_email() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            validate_email(&email).error_code.as_deref(),
            Some(codes::EMAIL_TOO_LONG)
        );
    }

    #[test]
    fn test_disposable_domain_is_warning() {
        let result = validate_email("x@10minutemail.com");
        assert!(!result.is_valid);
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.error_code.as_deref(), Some(codes::DISPOSABLE_EMAIL));

        // Domain match is case-insensitive
        assert_eq!(
            validate_email("x@MAILINATOR.com").error_code.as_deref(),
            Some(codes::DISPOSABLE_EMAIL)
        );
    }

    #[test]
    fn test_mx_without_resolver_degrades_to_warning() {
        let result = validate_email_with_mx("a@b.com", None);
        assert!(result.is_valid);
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.error_code.as_deref(), Some(codes::MX_CHECK_UNAVAILABLE));
    }

    #[test]
    fn test_mx_found() {
        let resolver = StaticResolver(Ok(true));
        let result = validate_email_with_mx("a@b.com", Some(&resolver));
        assert!(result.is_valid);
        assert_eq!(result.severity, Severity::Info);
    }

    #[test]
    fn test_mx_missing() {
        let resolver = StaticResolver(Ok(false));
        let result = validate_email_with_mx("a@b.com", Some(&resolver));
        assert!(!result.is_valid);
        assert_eq!(result.error_code.as_deref(), Some(codes::NO_MX_RECORD));
    }

    #[test]
    fn test_mx_lookup_error_degrades_to_warning() {
        let resolver = StaticResolver(Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "dns timeout",
        )));
        let result = validate_email_with_mx("a@b.com", Some(&resolver));
        assert!(result.is_valid);
        assert_eq!(result.error_code.as_deref(), Some(codes::MX_LOOKUP_FAILED));
    }

    #[test]
    fn test_mx_not_checked_for_bad_format() {
        let resolver = StaticResolver(Ok(true));
        let result = validate_email_with_mx("nope", Some(&resolver));
        assert_eq!(result.error_code.as_deref(), Some(codes::INVALID_EMAIL_FORMAT));
    }
}
