//! Generic field validators.
//!
//! Every validator takes the value as an `Option`: `None` means the field was
//! absent. Absent optional fields pass with an informational result.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::result::{codes, ValidationResult};

fn missing(field_name: &str) -> ValidationResult {
    ValidationResult::error(format!("{} is required", field_name))
        .with_field(field_name)
        .with_code(codes::REQUIRED_FIELD_MISSING)
}

fn not_provided(field_name: &str) -> ValidationResult {
    ValidationResult::valid(format!("{} not provided", field_name)).with_field(field_name)
}

/// Validate a string's presence and trimmed length in characters.
///
/// A blank string counts as missing.
pub fn validate_string_field(
    value: Option<&str>,
    field_name: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
    required: bool,
) -> ValidationResult {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    let Some(value) = value else {
        return if required {
            missing(field_name)
        } else {
            not_provided(field_name)
        };
    };

    let length = value.chars().count();
    if let Some(min) = min_length {
        if length < min {
            return ValidationResult::error(format!(
                "{} must be at least {} characters (got {})",
                field_name, min, length
            ))
            .with_field(field_name)
            .with_code(codes::STRING_TOO_SHORT);
        }
    }
    if let Some(max) = max_length {
        if length > max {
            return ValidationResult::error(format!(
                "{} must be at most {} characters (got {})",
                field_name, max, length
            ))
            .with_field(field_name)
            .with_code(codes::STRING_TOO_LONG)
            .with_fix(format!("Truncate {} to {} characters", field_name, max));
        }
    }

    ValidationResult::valid(format!("{} is valid", field_name)).with_field(field_name)
}

/// Validate an integer against inclusive bounds.
pub fn validate_integer_field(
    value: Option<i64>,
    field_name: &str,
    min_value: Option<i64>,
    max_value: Option<i64>,
    required: bool,
) -> ValidationResult {
    let Some(value) = value else {
        return if required {
            missing(field_name)
        } else {
            not_provided(field_name)
        };
    };
    check_bounds(value, field_name, min_value, max_value)
}

/// Validate a finite float against inclusive bounds.
pub fn validate_float_field(
    value: Option<f64>,
    field_name: &str,
    min_value: Option<f64>,
    max_value: Option<f64>,
    required: bool,
) -> ValidationResult {
    let Some(value) = value else {
        return if required {
            missing(field_name)
        } else {
            not_provided(field_name)
        };
    };
    if !value.is_finite() {
        return ValidationResult::error(format!("{} must be a finite number", field_name))
            .with_field(field_name)
            .with_code(codes::INVALID_NUMBER);
    }
    check_bounds(value, field_name, min_value, max_value)
}

fn check_bounds<T>(value: T, field_name: &str, min: Option<T>, max: Option<T>) -> ValidationResult
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if let Some(min) = min {
        if value < min {
            return ValidationResult::error(format!(
                "{} must be at least {} (got {})",
                field_name, min, value
            ))
            .with_field(field_name)
            .with_code(codes::VALUE_TOO_SMALL);
        }
    }
    if let Some(max) = max {
        if value > max {
            return ValidationResult::error(format!(
                "{} must be at most {} (got {})",
                field_name, max, value
            ))
            .with_field(field_name)
            .with_code(codes::VALUE_TOO_LARGE);
        }
    }
    ValidationResult::valid(format!("{} is valid", field_name)).with_field(field_name)
}

/// Parse RFC 3339, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or `YYYY-MM-DD`.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Validate a timestamp string against optional inclusive bounds.
pub fn validate_datetime_field(
    value: Option<&str>,
    field_name: &str,
    earliest: Option<DateTime<Utc>>,
    latest: Option<DateTime<Utc>>,
    required: bool,
) -> ValidationResult {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    let Some(value) = value else {
        return if required {
            missing(field_name)
        } else {
            not_provided(field_name)
        };
    };

    let Some(parsed) = parse_datetime(value) else {
        return ValidationResult::error(format!(
            "{} is not a valid date/time: {}",
            field_name, value
        ))
        .with_field(field_name)
        .with_code(codes::INVALID_DATETIME)
        .with_fix("Use RFC 3339 (2024-01-31T09:00:00Z) or YYYY-MM-DD");
    };

    if let Some(earliest) = earliest {
        if parsed < earliest {
            return ValidationResult::error(format!(
                "{} must not be before {}",
                field_name,
                earliest.to_rfc3339()
            ))
            .with_field(field_name)
            .with_code(codes::DATETIME_TOO_EARLY);
        }
    }
    if let Some(latest) = latest {
        if parsed > latest {
            return ValidationResult::error(format!(
                "{} must not be after {}",
                field_name,
                latest.to_rfc3339()
            ))
            .with_field(field_name)
            .with_code(codes::DATETIME_TOO_LATE);
        }
    }

    ValidationResult::valid(format!("{} is valid", field_name)).with_field(field_name)
}

/// Validate a list's size and, optionally, each item.
///
/// Item errors make the list invalid; item warnings pass with a warning.
pub fn validate_list_field<T>(
    items: Option<&[T]>,
    field_name: &str,
    min_items: Option<usize>,
    max_items: Option<usize>,
    item_validator: Option<&dyn Fn(&T) -> ValidationResult>,
    required: bool,
) -> ValidationResult {
    let Some(items) = items else {
        return if required {
            missing(field_name)
        } else {
            not_provided(field_name)
        };
    };

    if let Some(min) = min_items {
        if items.len() < min {
            return ValidationResult::error(format!(
                "{} must contain at least {} items (got {})",
                field_name,
                min,
                items.len()
            ))
            .with_field(field_name)
            .with_code(codes::LIST_TOO_SHORT);
        }
    }
    if let Some(max) = max_items {
        if items.len() > max {
            return ValidationResult::error(format!(
                "{} must contain at most {} items (got {})",
                field_name,
                max,
                items.len()
            ))
            .with_field(field_name)
            .with_code(codes::LIST_TOO_LONG);
        }
    }

    if let Some(validator) = item_validator {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let result = validator(item);
            if result.is_error() {
                errors.push(format!("{}[{}]: {}", field_name, index, result.message));
            } else if result.is_warning() {
                warnings.push(format!("{}[{}]: {}", field_name, index, result.message));
            }
        }
        if !errors.is_empty() {
            return ValidationResult::error(errors.join("; "))
                .with_field(field_name)
                .with_code(codes::INVALID_LIST_ITEM);
        }
        if !warnings.is_empty() {
            return ValidationResult::warning(true, warnings.join("; ")).with_field(field_name);
        }
    }

    ValidationResult::valid(format!("{} is valid", field_name)).with_field(field_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{validate_email, Severity};

    #[test]
    fn test_string_required_and_optional() {
        let result = validate_string_field(None, "name", None, None, true);
        assert!(!result.is_valid);
        assert_eq!(result.error_code.as_deref(), Some(codes::REQUIRED_FIELD_MISSING));

        assert!(!validate_string_field(Some("   "), "name", None, None, true).is_valid);

        let result = validate_string_field(None, "title", None, None, false);
        assert!(result.is_valid);
        assert_eq!(result.severity, Severity::Info);
    }

    #[test]
    fn test_string_length_bounds() {
        let short = validate_string_field(Some("J"), "name", Some(2), Some(10), true);
        assert_eq!(short.error_code.as_deref(), Some(codes::STRING_TOO_SHORT));

        let long =
            validate_string_field(Some("Jane Alexandra Doe"), "name", Some(2), Some(10), true);
        assert_eq!(long.error_code.as_deref(), Some(codes::STRING_TOO_LONG));
        assert!(long.suggested_fix.is_some());

        assert!(validate_string_field(Some("  Jane  "), "name", Some(4), Some(4), true).is_valid);
    }

    #[test]
    fn test_string_length_counts_characters() {
        assert!(validate_string_field(Some("Zoë"), "name", None, Some(3), true).is_valid);
    }

    #[test]
    fn test_integer_bounds() {
        assert!(validate_integer_field(Some(50), "employees", Some(1), Some(100), true).is_valid);
        assert_eq!(
            validate_integer_field(Some(0), "employees", Some(1), None, true).error_code.as_deref(),
            Some(codes::VALUE_TOO_SMALL)
        );
        assert_eq!(
            validate_integer_field(Some(101), "employees", None, Some(100), true)
                .error_code
                .as_deref(),
            Some(codes::VALUE_TOO_LARGE)
        );
        assert!(!validate_integer_field(None, "employees", None, None, true).is_valid);
        assert!(validate_integer_field(None, "employees", None, None, false).is_valid);
    }

    #[test]
    fn test_float_rejects_non_finite() {
        assert!(validate_float_field(Some(0.5), "score", Some(0.0), Some(1.0), true).is_valid);
        assert_eq!(
            validate_float_field(Some(f64::NAN), "score", None, None, true).error_code.as_deref(),
            Some(codes::INVALID_NUMBER)
        );
        assert_eq!(
            validate_float_field(Some(1.5), "score", Some(0.0), Some(1.0), true)
                .error_code
                .as_deref(),
            Some(codes::VALUE_TOO_LARGE)
        );
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("2024-01-31T09:00:00Z").is_some());
        assert!(parse_datetime("2024-01-31T09:00:00+02:00").is_some());
        assert!(parse_datetime("2024-01-31T09:00:00").is_some());
        assert_eq!(
            parse_datetime("2024-01-31").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
        );
        assert!(parse_datetime("31/01/2024").is_none());
    }

    #[test]
    fn test_datetime_field() {
        let earliest = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let latest = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        assert!(validate_datetime_field(
            Some("2024-06-01"),
            "sent_at",
            Some(earliest),
            Some(latest),
            true
        )
        .is_valid);
        assert_eq!(
            validate_datetime_field(Some("2019-12-31"), "sent_at", Some(earliest), None, true)
                .error_code
                .as_deref(),
            Some(codes::DATETIME_TOO_EARLY)
        );
        assert_eq!(
            validate_datetime_field(Some("2031-01-01"), "sent_at", None, Some(latest), true)
                .error_code
                .as_deref(),
            Some(codes::DATETIME_TOO_LATE)
        );
        assert_eq!(
            validate_datetime_field(Some("yesterday"), "sent_at", None, None, true)
                .error_code
                .as_deref(),
            Some(codes::INVALID_DATETIME)
        );
        assert!(validate_datetime_field(None, "sent_at", None, None, false).is_valid);
    }

    #[test]
    fn test_list_counts() {
        let items = ["a", "b", "c"];
        assert!(
            validate_list_field(Some(&items[..]), "tags", Some(1), Some(5), None, true).is_valid
        );
        assert_eq!(
            validate_list_field(Some(&items[..]), "tags", Some(4), None, None, true)
                .error_code
                .as_deref(),
            Some(codes::LIST_TOO_SHORT)
        );
        assert_eq!(
            validate_list_field(Some(&items[..]), "tags", None, Some(2), None, true)
                .error_code
                .as_deref(),
            Some(codes::LIST_TOO_LONG)
        );
        assert!(!validate_list_field::<&str>(None, "tags", None, None, None, true).is_valid);
    }

    #[test]
    fn test_list_item_validator() {
        let emails = ["a@b.com", "broken", "x@10minutemail.com"];
        let validator = |email: &&str| validate_email(email);

        let result = validate_list_field(
            Some(&emails[..]),
            "emails",
            None,
            None,
            Some(&validator),
            true,
        );
        assert!(!result.is_valid);
        assert_eq!(result.error_code.as_deref(), Some(codes::INVALID_LIST_ITEM));
        assert!(result.message.contains("emails[1]"));
        assert!(!result.message.contains("emails[2]"));

        let emails = ["a@b.com", "x@10minutemail.com"];
        let result = validate_list_field(
            Some(&emails[..]),
            "emails",
            None,
            None,
            Some(&validator),
            true,
        );
        assert!(result.is_valid);
        assert_eq!(result.severity, Severity::Warning);
        assert!(result.message.contains("emails[1]"));
    }
}
