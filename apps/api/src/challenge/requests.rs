use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::challenge::{Rewards, CATEGORIES, CHALLENGE_STATUSES, DIFFICULTIES};
use crate::validation::{
    one_of, parse_timestamp, present, timestamp_format, validated_timestamp, FieldErrors,
    ValidateBody,
};

fn name_present(value: &str) -> Result<(), ValidationError> {
    present(value, "Challenge name is required")
}

fn description_present(value: &str) -> Result<(), ValidationError> {
    present(value, "Challenge description is required")
}

fn category_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, CATEGORIES)
}

fn difficulty_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, DIFFICULTIES)
}

fn status_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, CHALLENGE_STATUSES)
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateChallengeRequest {
    #[validate(custom(function = "name_present"))]
    pub name: String,
    #[validate(custom(function = "description_present"))]
    pub description: String,
    #[validate(custom(function = "category_choice"))]
    pub category: String,
    #[validate(custom(function = "difficulty_choice"))]
    pub difficulty: String,
    #[validate(
        required(message = "Required"),
        range(min = 1, message = "Must be at least 1")
    )]
    pub duration: Option<i32>,
    #[validate(custom(function = "timestamp_format"))]
    pub start: String,
    #[validate(custom(function = "timestamp_format"))]
    pub end: String,
    #[validate(custom(function = "status_choice"))]
    pub status: Option<String>,
    #[validate(url(message = "Must be a valid URL"))]
    pub image: Option<String>,
    #[validate(nested)]
    pub rewards: Rewards,
}

impl ValidateBody for CreateChallengeRequest {}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChallenge {
    pub name: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub duration: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub image: Option<String>,
    pub rewards: Rewards,
}

fn check_order(errors: &mut FieldErrors, start: Option<&str>, end: Option<&str>) {
    let start = start.and_then(parse_timestamp);
    let end = end.and_then(parse_timestamp);
    if let (Some(start), Some(end)) = (start, end) {
        errors.check(start <= end, "end", "End date must not be before start date");
    }
}

/// Start must not fall after end.
pub fn check_date_order(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    errors.check(start <= end, "end", "End date must not be before start date");
    errors.finish()
}

impl CreateChallengeRequest {
    pub fn parse(&self) -> Result<NewChallenge, AppError> {
        let mut errors = FieldErrors::new();
        errors.absorb(self.validate(), Self::wire_name);
        check_order(&mut errors, Some(&self.start), Some(&self.end));
        errors.finish()?;

        Ok(NewChallenge {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            duration: self.duration.unwrap_or(1),
            start_date: validated_timestamp("start", &self.start)?,
            end_date: validated_timestamp("end", &self.end)?,
            status: self.status.clone().unwrap_or_else(|| "active".to_string()),
            image: self.image.clone(),
            rewards: self.rewards,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateChallengeRequest {
    #[validate(custom(function = "name_present"))]
    pub name: Option<String>,
    #[validate(custom(function = "description_present"))]
    pub description: Option<String>,
    #[validate(custom(function = "category_choice"))]
    pub category: Option<String>,
    #[validate(custom(function = "difficulty_choice"))]
    pub difficulty: Option<String>,
    #[validate(range(min = 1, message = "Must be at least 1"))]
    pub duration: Option<i32>,
    #[validate(custom(function = "timestamp_format"))]
    pub start: Option<String>,
    #[validate(custom(function = "timestamp_format"))]
    pub end: Option<String>,
    #[validate(custom(function = "status_choice"))]
    pub status: Option<String>,
    #[validate(url(message = "Must be a valid URL"))]
    pub image: Option<String>,
    #[validate(nested)]
    pub rewards: Option<Rewards>,
}

impl ValidateBody for UpdateChallengeRequest {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallengeChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub duration: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub image: Option<String>,
    pub rewards: Option<Rewards>,
}

impl UpdateChallengeRequest {
    /// Field rules only; the handler checks the order against the stored
    /// dates once it knows which side is being changed.
    pub fn parse(&self) -> Result<ChallengeChanges, AppError> {
        let mut errors = FieldErrors::new();
        errors.absorb(self.validate(), Self::wire_name);
        check_order(&mut errors, self.start.as_deref(), self.end.as_deref());
        errors.finish()?;

        let start_date = match self.start.as_deref() {
            Some(raw) => Some(validated_timestamp("start", raw)?),
            None => None,
        };
        let end_date = match self.end.as_deref() {
            Some(raw) => Some(validated_timestamp("end", raw)?),
            None => None,
        };
        Ok(ChallengeChanges {
            name: self.name.as_deref().map(|s| s.trim().to_string()),
            description: self.description.as_deref().map(|s| s.trim().to_string()),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            duration: self.duration,
            start_date,
            end_date,
            status: self.status.clone(),
            image: self.image.clone(),
            rewards: self.rewards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::challenge::StatReward;

    fn valid() -> CreateChallengeRequest {
        CreateChallengeRequest {
            name: "Couch to 5k".into(),
            description: "Run three times a week".into(),
            category: "fitness".into(),
            difficulty: "medium".into(),
            duration: Some(30),
            start: "2025-03-01".into(),
            end: "2025-03-31".into(),
            status: None,
            image: None,
            rewards: Rewards {
                xp: Some(100),
                coins: Some(10),
                stat: Some(StatReward {
                    stamina: Some(2),
                    ..Default::default()
                }),
            },
        }
    }

    #[test]
    fn test_create_defaults_status_to_active() {
        let challenge = valid().parse().unwrap();
        assert_eq!(challenge.status, "active");
        assert_eq!(challenge.duration, 30);
    }

    #[test]
    fn test_create_rejects_reversed_dates() {
        let req = CreateChallengeRequest {
            start: "2025-04-01".into(),
            end: "2025-03-01".into(),
            ..valid()
        };
        match req.parse() {
            Err(AppError::Validation(fields)) => assert_eq!(fields[0].field, "end"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_same_day_is_allowed() {
        let req = CreateChallengeRequest {
            start: "2025-03-01".into(),
            end: "2025-03-01".into(),
            ..valid()
        };
        assert!(req.parse().is_ok());
    }

    #[test]
    fn test_create_collects_every_error() {
        let req = CreateChallengeRequest {
            category: "sleep".into(),
            duration: Some(0),
            image: Some("not a url".into()),
            ..valid()
        };
        match req.parse() {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, ["category", "duration", "image"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_rewards_are_reported_by_path() {
        let req = CreateChallengeRequest {
            rewards: Rewards {
                xp: Some(-1),
                coins: None,
                stat: Some(StatReward {
                    strength: Some(-3),
                    ..Default::default()
                }),
            },
            ..valid()
        };
        match req.parse() {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, ["rewards.stat.strength", "rewards.xp"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_update_is_partial() {
        let changes = UpdateChallengeRequest {
            status: Some("completed".into()),
            ..Default::default()
        }
        .parse()
        .unwrap();
        assert_eq!(changes.status.as_deref(), Some("completed"));
        assert!(changes.start_date.is_none());
    }

    #[test]
    fn test_date_order_check() {
        let start = "2025-03-10T00:00:00Z".parse().unwrap();
        let end = "2025-03-01T00:00:00Z".parse().unwrap();
        assert!(check_date_order(start, end).is_err());
        assert!(check_date_order(end, start).is_ok());
    }
}
