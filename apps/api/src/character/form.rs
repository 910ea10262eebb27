//! Multipart form for character create/replace.

use std::borrow::Cow;
use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::profile::{Stats, GENDERS};
use crate::validation::{camel_case, one_of, FieldErrors};

/// Artwork slots, by multipart field name.
pub const IMAGE_FIELDS: [&str; 4] = ["image", "fullImage", "bgImage", "animatedImage"];

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Raw multipart contents: text fields (repeatable) and file parts.
#[derive(Debug, Default)]
pub struct CharacterForm {
    pub fields: HashMap<String, Vec<String>>,
    pub files: HashMap<String, Upload>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct CharacterInput {
    #[validate(length(min = 2, max = 100, message = "Must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 2, max = 100, message = "Must be between 2 and 100 characters"))]
    pub title: String,
    #[validate(custom(function = "gender_choice"))]
    pub gender: String,
    #[validate(length(min = 2, max = 100, message = "Must be between 2 and 100 characters"))]
    pub element: Option<String>,
    #[validate(length(min = 10, max = 1000, message = "Must be between 10 and 1000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 10, max = 1000, message = "Must be between 10 and 1000 characters"))]
    pub personality: Option<String>,
    #[validate(length(min = 10, max = 1000, message = "Must be between 10 and 1000 characters"))]
    pub backstory: Option<String>,
    #[validate(custom(function = "power_names"))]
    pub powers: Vec<String>,
    pub stats_boost: Stats,
}

fn gender_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, GENDERS)
}

fn power_names(powers: &[String]) -> Result<(), ValidationError> {
    let fits = |p: &String| (2..=100).contains(&p.chars().count());
    if powers.iter().all(fits) {
        Ok(())
    } else {
        Err(ValidationError::new("length").with_message(Cow::Borrowed(
            "Each power must be between 2 and 100 characters",
        )))
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("Upload exceeds the maximum allowed size".to_string())
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl CharacterForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = CharacterForm::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if IMAGE_FIELDS.contains(&name.as_str()) {
                let file_name = field.file_name().unwrap_or(&name).to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.is_empty() {
                    continue;
                }
                form.files.insert(
                    name,
                    Upload {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.entry(name).or_default().push(value);
            }
        }
        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.last())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// `powers` may be repeated, or sent once as a JSON array.
    fn powers(&self, errors: &mut FieldErrors) -> Vec<String> {
        let raw = self
            .fields
            .get("powers")
            .or_else(|| self.fields.get("powers[]"))
            .cloned()
            .unwrap_or_default();
        match raw.as_slice() {
            [single] if single.trim_start().starts_with('[') => {
                serde_json::from_str::<Vec<String>>(single).unwrap_or_else(|_| {
                    errors.push("powers", "Must be a JSON array of strings");
                    Vec::new()
                })
            }
            _ => raw.into_iter().map(|p| p.trim().to_string()).collect(),
        }
    }

    /// `statsBoost` as a JSON object, or as `statsBoost.<stat>` fields.
    fn stats_boost(&self, errors: &mut FieldErrors) -> Stats {
        if let Some(raw) = self.text("statsBoost") {
            return match serde_json::from_str::<HashMap<String, serde_json::Value>>(raw) {
                Ok(map) => Stats {
                    strength: stat(errors, "strength", map.get("strength").map(|v| v.to_string())),
                    intelligence: stat(
                        errors,
                        "intelligence",
                        map.get("intelligence").map(|v| v.to_string()),
                    ),
                    karma: stat(errors, "karma", map.get("karma").map(|v| v.to_string())),
                    stamina: stat(errors, "stamina", map.get("stamina").map(|v| v.to_string())),
                },
                Err(_) => {
                    errors.push("statsBoost", "Must be a JSON object");
                    Stats::default()
                }
            };
        }
        let field = |name: &str| self.text(&format!("statsBoost.{name}")).map(str::to_string);
        Stats {
            strength: stat(errors, "strength", field("strength")),
            intelligence: stat(errors, "intelligence", field("intelligence")),
            karma: stat(errors, "karma", field("karma")),
            stamina: stat(errors, "stamina", field("stamina")),
        }
    }

    /// Validates the text fields and, when `require_all_images` is set,
    /// the four artwork slots. Every failure is reported in one error.
    pub fn input(&self, require_all_images: bool) -> Result<CharacterInput, AppError> {
        let mut parsed = FieldErrors::new();
        let powers = self.powers(&mut parsed);
        let stats_boost = self.stats_boost(&mut parsed);
        let input = CharacterInput {
            name: self.text("name").unwrap_or_default().to_string(),
            title: self.text("title").unwrap_or_default().to_string(),
            gender: self.text("gender").unwrap_or_default().to_string(),
            element: self.text("element").map(str::to_string),
            description: self.text("description").map(str::to_string),
            personality: self.text("personality").map(str::to_string),
            backstory: self.text("backstory").map(str::to_string),
            powers,
            stats_boost,
        };

        let mut errors = FieldErrors::new();
        errors.absorb(input.validate(), camel_case);
        errors.append(parsed);
        if require_all_images {
            for slot in IMAGE_FIELDS {
                errors.check(self.files.contains_key(slot), slot, "Image is required");
            }
        }
        errors.finish()?;
        Ok(input)
    }
}

/// Whole-number stat, coerced from text, defaulting to zero.
fn stat(errors: &mut FieldErrors, name: &str, raw: Option<String>) -> i32 {
    let Some(raw) = raw else { return 0 };
    let field = format!("statsBoost.{name}");
    match raw.trim().trim_matches('"').parse::<i32>() {
        Ok(v) if v >= 0 => v,
        Ok(_) => {
            errors.push(&field, "Must be at least 0");
            0
        }
        Err(_) => {
            errors.push(&field, "Must be a whole number");
            0
        }
    }
}
