//! Data-contract validation for outreach records.
//!
//! Validators are stateless and never fail: every check produces a
//! [`ValidationResult`], and invalid input is reported as data.

#[cfg(feature = "dns")]
mod dns;
mod email;
mod fields;
mod records;
mod result;
mod web;

#[cfg(feature = "dns")]
pub use dns::DnsMxResolver;
pub use email::{validate_email, validate_email_with_mx, MxResolver};
pub use fields::{
    parse_datetime, validate_datetime_field, validate_float_field, validate_integer_field,
    validate_list_field, validate_string_field,
};
pub use records::{validate_company_data, validate_linkedin_profile, validate_required_fields};
pub use result::{codes, validate_multiple_results, Severity, ValidationResult};
pub use web::{validate_domain, validate_linkedin_url, validate_url};
