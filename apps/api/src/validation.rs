//! Request validation.
//!
//! Field rules are declared with `validator` derives on the request types.
//! `FieldErrors` folds those failures together with any cross-field checks
//! so a body is rejected once, listing every failing field.

use std::borrow::Cow;

use axum::extract::{FromRequest, FromRequestParts};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::errors::AppError;

/// JSON body extractor whose rejection is an `AppError::Validation`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor whose rejection is an `AppError::BadRequest`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Request bodies validated through their `validator` derive.
pub trait ValidateBody: Validate {
    /// Name a failing field is reported under. Defaults to the Rust name.
    fn wire_name(field: &str) -> String {
        field.to_string()
    }

    fn check(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        errors.absorb(self.validate(), Self::wire_name);
        errors.finish()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Accumulates field failures for one request body.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    /// Adds derived-rule failures, sorted by field; nested structs are
    /// reported as `parent.child`.
    pub fn absorb(&mut self, result: Result<(), ValidationErrors>, rename: fn(&str) -> String) {
        if let Err(errors) = result {
            flatten("", &errors, rename, &mut self.0);
        }
    }

    /// Appends failures collected separately, keeping their order.
    pub fn append(&mut self, mut other: FieldErrors) {
        self.0.append(&mut other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}

fn flatten(
    prefix: &str,
    errors: &ValidationErrors,
    rename: fn(&str) -> String,
    out: &mut Vec<FieldError>,
) {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by_key(|(field, _)| field.to_string());
    for (field, kind) in entries {
        let name = rename(field);
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    out.push(FieldError::new(path.clone(), message_of(failure)));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, rename, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{path}[{index}]"), inner, rename, out);
                }
            }
        }
    }
}

fn message_of(failure: &ValidationError) -> String {
    match &failure.message {
        Some(message) => message.to_string(),
        None => format!("Invalid value ({})", failure.code),
    }
}

/// `start_date` becomes `startDate`, for bodies sent in camelCase.
pub fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

/// Shared by the `custom` rules restricting a field to a fixed set.
pub fn one_of(value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            "one_of",
            format!("Must be one of: {}", allowed.join(", ")),
        ))
    }
}

/// Fails on empty or whitespace-only text with the given message.
pub fn present(value: &str, message: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("required", message.to_string()))
    } else {
        Ok(())
    }
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    present(value, "This field is required")
}

pub fn timestamp_format(value: &str) -> Result<(), ValidationError> {
    match parse_timestamp(value) {
        Some(_) => Ok(()),
        None => Err(invalid("timestamp", "Invalid date format".to_string())),
    }
}

pub fn date_format(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(invalid("date", "Use the YYYY-MM-DD format".to_string())),
    }
}

pub fn uuid_format(value: &str) -> Result<(), ValidationError> {
    match Uuid::parse_str(value.trim()) {
        Ok(_) => Ok(()),
        Err(_) => Err(invalid("uuid", "Invalid id".to_string())),
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parses a field the derived rules already accepted.
pub fn validated_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    parse_timestamp(value).ok_or_else(|| AppError::BadRequest(format!("Invalid {field}")))
}

pub fn validated_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    parse_date(value).ok_or_else(|| AppError::BadRequest(format!("Invalid {field}")))
}
