//! Structured validation results.

use serde::{Deserialize, Serialize};

/// Machine-readable codes attached to failing or degraded results.
pub mod codes {
    pub const EMPTY_EMAIL: &str = "EMPTY_EMAIL";
    pub const EMAIL_TOO_LONG: &str = "EMAIL_TOO_LONG";
    pub const INVALID_EMAIL_FORMAT: &str = "INVALID_EMAIL_FORMAT";
    pub const DISPOSABLE_EMAIL: &str = "DISPOSABLE_EMAIL";
    pub const MX_CHECK_UNAVAILABLE: &str = "MX_CHECK_UNAVAILABLE";
    pub const MX_LOOKUP_FAILED: &str = "MX_LOOKUP_FAILED";
    pub const NO_MX_RECORD: &str = "NO_MX_RECORD";

    pub const EMPTY_URL: &str = "EMPTY_URL";
    pub const INVALID_URL_FORMAT: &str = "INVALID_URL_FORMAT";
    pub const INVALID_SCHEME: &str = "INVALID_SCHEME";
    pub const MISSING_DOMAIN: &str = "MISSING_DOMAIN";
    pub const NOT_LINKEDIN_URL: &str = "NOT_LINKEDIN_URL";
    pub const NON_STANDARD_LINKEDIN_URL: &str = "NON_STANDARD_LINKEDIN_URL";

    pub const EMPTY_DOMAIN: &str = "EMPTY_DOMAIN";
    pub const DOMAIN_TOO_LONG: &str = "DOMAIN_TOO_LONG";
    pub const INVALID_DOMAIN_FORMAT: &str = "INVALID_DOMAIN_FORMAT";

    pub const REQUIRED_FIELD_MISSING: &str = "REQUIRED_FIELD_MISSING";
    pub const INVALID_FIELD_TYPE: &str = "INVALID_FIELD_TYPE";
    pub const STRING_TOO_SHORT: &str = "STRING_TOO_SHORT";
    pub const STRING_TOO_LONG: &str = "STRING_TOO_LONG";
    pub const VALUE_TOO_SMALL: &str = "VALUE_TOO_SMALL";
    pub const VALUE_TOO_LARGE: &str = "VALUE_TOO_LARGE";
    pub const INVALID_NUMBER: &str = "INVALID_NUMBER";
    pub const INVALID_DATETIME: &str = "INVALID_DATETIME";
    pub const DATETIME_TOO_EARLY: &str = "DATETIME_TOO_EARLY";
    pub const DATETIME_TOO_LATE: &str = "DATETIME_TOO_LATE";
    pub const LIST_TOO_SHORT: &str = "LIST_TOO_SHORT";
    pub const LIST_TOO_LONG: &str = "LIST_TOO_LONG";
    pub const INVALID_LIST_ITEM: &str = "INVALID_LIST_ITEM";

    pub const INVALID_RECORD: &str = "INVALID_RECORD";
    pub const MISSING_REQUIRED_FIELDS: &str = "MISSING_REQUIRED_FIELDS";
    pub const MULTIPLE_ERRORS: &str = "MULTIPLE_ERRORS";
}

/// How serious a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Outcome of one validation check.
///
/// An invalid result always carries `Error` severity unless it was built
/// with `Warning`; an invalid result is never reported as `Info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ValidationResult {
    /// Create a result, escalating `Info` to `Error` for invalid results.
    pub fn new(is_valid: bool, severity: Severity, message: impl Into<String>) -> Self {
        let severity = if !is_valid && severity == Severity::Info {
            Severity::Error
        } else {
            severity
        };
        Self {
            is_valid,
            severity,
            message: message.into(),
            field_name: None,
            suggested_fix: None,
            error_code: None,
        }
    }

    /// Create a passing result.
    pub fn valid(message: impl Into<String>) -> Self {
        Self::new(true, Severity::Info, message)
    }

    /// Create a failing result.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(false, Severity::Error, message)
    }

    /// Create a warning, which may or may not fail validation.
    pub fn warning(is_valid: bool, message: impl Into<String>) -> Self {
        Self::new(is_valid, Severity::Warning, message)
    }

    /// Attach the field this result is about.
    pub fn with_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    /// Attach a machine-readable code.
    pub fn with_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    /// Attach a hint for fixing the input.
    pub fn with_fix(mut self, suggested_fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(suggested_fix.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Reduce many results to one.
///
/// Any error makes the whole invalid with every error message joined.
/// Otherwise any warning yields a valid result carrying the warning
/// messages. An empty input is valid; nothing was checked.
pub fn validate_multiple_results(results: &[ValidationResult]) -> ValidationResult {
    if results.is_empty() {
        return ValidationResult::valid("No validation performed");
    }

    let errors: Vec<&str> = results
        .iter()
        .filter(|r| r.is_error())
        .map(|r| r.message.as_str())
        .collect();
    if !errors.is_empty() {
        return ValidationResult::error(format!("Validation failed: {}", errors.join("; ")))
            .with_code(codes::MULTIPLE_ERRORS);
    }

    let warnings: Vec<&str> = results
        .iter()
        .filter(|r| r.is_warning())
        .map(|r| r.message.as_str())
        .collect();
    if !warnings.is_empty() {
        return ValidationResult::warning(
            true,
            format!("Validation passed with warnings: {}", warnings.join("; ")),
        );
    }

    ValidationResult::valid("All validations passed")
}
