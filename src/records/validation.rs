use serde::Serialize;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use super::dto::UserInput;
use super::repo_types::UserFields;

pub const FIRST_NAME_REQUIRED: &str = "First name is mandatory";
pub const LAST_NAME_REQUIRED: &str = "Last name is mandatory";
pub const DATE_REQUIRED: &str = "Either DOB or Anniversary Date must be provided";
pub const INVALID_DOB: &str = "Invalid DOB format";
pub const INVALID_ANNIVERSARY: &str = "Invalid Anniversary Date format";

/// One rejected input field. `message` keeps the wording older clients match on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Checks a submitted record. The result is empty iff the record is acceptable.
pub fn validate_user(input: &UserInput) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if present(&input.first_name).is_none() {
        errors.push(FieldError::new("firstName", FIRST_NAME_REQUIRED));
    }
    if present(&input.last_name).is_none() {
        errors.push(FieldError::new("lastName", LAST_NAME_REQUIRED));
    }

    let dob = present(&input.dob);
    let anniversary = present(&input.anniversary_date);
    if dob.is_none() && anniversary.is_none() {
        errors.push(FieldError::new("dates", DATE_REQUIRED));
    }
    if dob.is_some_and(|d| parse_date(d).is_none()) {
        errors.push(FieldError::new("dob", INVALID_DOB));
    }
    if anniversary.is_some_and(|d| parse_date(d).is_none()) {
        errors.push(FieldError::new("anniversaryDate", INVALID_ANNIVERSARY));
    }

    errors
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|t| t.date()))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl TryFrom<UserInput> for UserFields {
    type Error = Vec<FieldError>;

    fn try_from(input: UserInput) -> Result<Self, Self::Error> {
        let errors = validate_user(&input);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(UserFields {
            first_name: present(&input.first_name).unwrap_or_default().to_string(),
            last_name: present(&input.last_name).unwrap_or_default().to_string(),
            dob: present(&input.dob).and_then(parse_date),
            anniversary_date: present(&input.anniversary_date).and_then(parse_date),
            mobile_number: present(&input.mobile_number).map(str::to_string),
        })
    }
}
