use serde::Deserialize;
use validator::Validate;

use crate::validation::{not_blank, ValidateBody};

/// Trimmed and lowercased; the users table compares emails exactly.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 3, message = "Must be at least 3 characters"))]
    pub fullname: Option<String>,
}

impl RegisterRequest {
    /// Display name sent to the provider; defaults to the email's local part.
    pub fn full_name(&self) -> String {
        match self.fullname.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl ValidateBody for RegisterRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl ValidateBody for LoginRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RefreshRequest {
    #[validate(custom(function = "not_blank"))]
    pub refresh_token: String,
}

impl ValidateBody for RefreshRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

impl ValidateBody for ForgotPasswordRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordRequest {
    #[validate(custom(function = "not_blank"))]
    pub access_token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl ValidateBody for ResetPasswordRequest {}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateMeRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, message = "Must be at least 3 characters"))]
    pub fullname: Option<String>,
}

impl ValidateBody for UpdateMeRequest {}
