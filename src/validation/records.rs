//! Composite validators for scraped and LLM-structured records.
//!
//! Records arrive as JSON objects. Each validator returns one result per
//! checked field; reduce them with
//! [`validate_multiple_results`](super::validate_multiple_results).

use chrono::{Datelike, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use super::email::validate_email;
use super::fields::{validate_integer_field, validate_list_field, validate_string_field};
use super::result::{codes, ValidationResult};
use super::web::{validate_domain, validate_linkedin_url, validate_url};

const MAX_SKILLS: usize = 100;
const EARLIEST_FOUNDING_YEAR: i64 = 1800;
const MAX_EMPLOYEE_COUNT: i64 = 10_000_000;

fn wrong_type(field_name: &str, expected: &str) -> ValidationResult {
    ValidationResult::error(format!("{} must be {}", field_name, expected))
        .with_field(field_name)
        .with_code(codes::INVALID_FIELD_TYPE)
}

fn not_an_object(record: &str) -> Vec<ValidationResult> {
    vec![ValidationResult::error(format!("{} must be a JSON object", record))
        .with_code(codes::INVALID_RECORD)]
}

/// Read a string field; `null` and absence are both `None`.
fn string_at<'a>(
    record: &'a Map<String, Value>,
    field_name: &str,
) -> Result<Option<&'a str>, ValidationResult> {
    match record.get(field_name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(wrong_type(field_name, "a string")),
    }
}

fn integer_at(
    record: &Map<String, Value>,
    field_name: &str,
) -> Result<Option<i64>, ValidationResult> {
    match record.get(field_name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| wrong_type(field_name, "an integer")),
    }
}

fn string_list_at<'a>(
    record: &'a Map<String, Value>,
    field_name: &str,
) -> Result<Option<Vec<&'a str>>, ValidationResult> {
    match record.get(field_name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str())
            .collect::<Option<Vec<_>>>()
            .map(Some)
            .ok_or_else(|| wrong_type(field_name, "a list of strings")),
        Some(_) => Err(wrong_type(field_name, "a list of strings")),
    }
}

fn check_string(
    record: &Map<String, Value>,
    field_name: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
    required: bool,
) -> ValidationResult {
    match string_at(record, field_name) {
        Ok(value) => validate_string_field(value, field_name, min_length, max_length, required),
        Err(result) => result,
    }
}

fn check_integer(
    record: &Map<String, Value>,
    field_name: &str,
    min_value: i64,
    max_value: i64,
) -> ValidationResult {
    match integer_at(record, field_name) {
        Ok(value) => {
            validate_integer_field(value, field_name, Some(min_value), Some(max_value), false)
        }
        Err(result) => result,
    }
}

/// Run `validate` on an optional string field, skipping it when absent.
fn check_optional<F>(
    record: &Map<String, Value>,
    field_name: &str,
    validate: F,
) -> Option<ValidationResult>
where
    F: FnOnce(&str) -> ValidationResult,
{
    match string_at(record, field_name) {
        Ok(Some(value)) => Some(validate(value).with_field(field_name)),
        Ok(None) => None,
        Err(result) => Some(result),
    }
}

/// Validate a structured LinkedIn profile.
///
/// `name` and `linkedin_url` are required; `headline`, `company`,
/// `location`, `email` and `skills` are checked when present.
pub fn validate_linkedin_profile(profile: &Value) -> Vec<ValidationResult> {
    let Some(record) = profile.as_object() else {
        return not_an_object("LinkedIn profile");
    };

    let mut results = vec![check_string(record, "name", Some(1), Some(100), true)];

    results.push(match string_at(record, "linkedin_url") {
        Ok(Some(url)) => validate_linkedin_url(url),
        Ok(None) => validate_string_field(None, "linkedin_url", None, None, true),
        Err(result) => result,
    });

    results.push(check_string(record, "headline", None, Some(220), false));
    results.push(check_string(record, "company", None, Some(200), false));
    results.push(check_string(record, "location", None, Some(100), false));
    results.extend(check_optional(record, "email", validate_email));

    results.push(match string_list_at(record, "skills") {
        Ok(skills) => {
            let skill_validator = |skill: &&str| {
                validate_string_field(Some(*skill), "skill", Some(1), Some(100), true)
            };
            validate_list_field(
                skills.as_deref(),
                "skills",
                None,
                Some(MAX_SKILLS),
                Some(&skill_validator),
                false,
            )
        }
        Err(result) => result,
    });

    debug!(
        checks = results.len(),
        failures = results.iter().filter(|r| !r.is_valid).count(),
        "Validated LinkedIn profile"
    );
    results
}

/// Validate a structured company record.
///
/// `name` is required; `website`, `domain`, `linkedin_url`, `industry`,
/// `description`, `employee_count` and `founded_year` are checked when
/// present.
pub fn validate_company_data(company: &Value) -> Vec<ValidationResult> {
    let Some(record) = company.as_object() else {
        return not_an_object("Company data");
    };

    let mut results = vec![check_string(record, "name", Some(1), Some(200), true)];

    results.extend(check_optional(record, "website", |url| validate_url(url, None)));
    results.extend(check_optional(record, "domain", validate_domain));
    results.extend(check_optional(record, "linkedin_url", validate_linkedin_url));
    results.push(check_string(record, "industry", None, Some(100), false));
    results.push(check_string(record, "description", None, Some(5000), false));
    results.push(check_integer(record, "employee_count", 1, MAX_EMPLOYEE_COUNT));
    results.push(check_integer(
        record,
        "founded_year",
        EARLIEST_FOUNDING_YEAR,
        i64::from(Utc::now().year()),
    ));

    debug!(
        checks = results.len(),
        failures = results.iter().filter(|r| !r.is_valid).count(),
        "Validated company data"
    );
    results
}

/// Check that an API response object carries every named, non-null field.
pub fn validate_required_fields(response: &Value, required: &[&str]) -> ValidationResult {
    let Some(record) = response.as_object() else {
        return ValidationResult::error("Response must be a JSON object")
            .with_code(codes::INVALID_RECORD);
    };

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|field| matches!(record.get(*field), None | Some(Value::Null)))
        .collect();

    if missing.is_empty() {
        ValidationResult::valid("All required fields present")
    } else {
        ValidationResult::error(format!("Missing required fields: {}", missing.join(", ")))
            .with_code(codes::MISSING_REQUIRED_FIELDS)
    }
}
