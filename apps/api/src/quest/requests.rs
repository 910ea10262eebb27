use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::quest::{QuestStatReward, QUEST_STATUSES, REPEATS};
use crate::validation::{
    camel_case, one_of, parse_timestamp, timestamp_format, validated_timestamp, FieldErrors,
    ValidateBody,
};

fn repeat_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, REPEATS)
}

fn status_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, QUEST_STATUSES)
}

/// `quest_type` travels as `type`; everything else is camelCase.
fn quest_field(field: &str) -> String {
    match field {
        "quest_type" => "type".to_string(),
        other => camel_case(other),
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateQuestRequest {
    #[validate(length(min = 2, max = 100, message = "Must be between 2 and 100 characters"))]
    pub title: String,
    #[validate(length(min = 10, max = 1000, message = "Must be between 10 and 1000 characters"))]
    pub description: String,
    #[validate(range(min = 1, message = "Must be at least 1"))]
    pub current_day: Option<i32>,
    #[validate(
        required(message = "Required"),
        range(min = 1, message = "Must be at least 1")
    )]
    pub total_days: Option<i32>,
    #[validate(custom(function = "timestamp_format"))]
    pub start: String,
    #[validate(custom(function = "timestamp_format"))]
    pub end: String,
    #[validate(custom(function = "repeat_choice"))]
    pub repeat: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "Must be between 1 and 50 characters"))]
    pub quest_type: String,
    #[validate(custom(function = "status_choice"))]
    pub status: String,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub xp_reward: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub coin_reward: Option<i32>,
    #[validate(nested)]
    pub stat_reward: Option<QuestStatReward>,
}

impl ValidateBody for CreateQuestRequest {
    fn wire_name(field: &str) -> String {
        quest_field(field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuest {
    pub title: String,
    pub description: String,
    pub current_day: i32,
    pub total_days: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub repeat: String,
    pub quest_type: String,
    pub status: String,
    pub xp_reward: i32,
    pub coin_reward: i32,
    pub stat_reward: Option<QuestStatReward>,
}

fn check_order(errors: &mut FieldErrors, start: Option<&str>, end: Option<&str>) {
    let start = start.and_then(parse_timestamp);
    let end = end.and_then(parse_timestamp);
    if let (Some(start), Some(end)) = (start, end) {
        errors.check(start <= end, "end", "End date must not be before start date");
    }
}

impl CreateQuestRequest {
    pub fn parse(&self) -> Result<NewQuest, AppError> {
        let mut errors = FieldErrors::new();
        errors.absorb(self.validate(), Self::wire_name);
        check_order(&mut errors, Some(&self.start), Some(&self.end));
        errors.finish()?;

        Ok(NewQuest {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            current_day: self.current_day.unwrap_or(1),
            total_days: self.total_days.unwrap_or(1),
            start_date: validated_timestamp("start", &self.start)?,
            end_date: validated_timestamp("end", &self.end)?,
            repeat: self.repeat.clone(),
            quest_type: self.quest_type.trim().to_string(),
            status: self.status.clone(),
            xp_reward: self.xp_reward.unwrap_or(0),
            coin_reward: self.coin_reward.unwrap_or(0),
            stat_reward: self.stat_reward,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateQuestRequest {
    #[validate(length(min = 2, max = 100, message = "Must be between 2 and 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 1000, message = "Must be between 10 and 1000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Must be at least 1"))]
    pub current_day: Option<i32>,
    #[validate(range(min = 1, message = "Must be at least 1"))]
    pub total_days: Option<i32>,
    #[validate(custom(function = "timestamp_format"))]
    pub start: Option<String>,
    #[validate(custom(function = "timestamp_format"))]
    pub end: Option<String>,
    #[validate(custom(function = "repeat_choice"))]
    pub repeat: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "Must be between 1 and 50 characters"))]
    pub quest_type: Option<String>,
    #[validate(custom(function = "status_choice"))]
    pub status: Option<String>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub xp_reward: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub coin_reward: Option<i32>,
    #[validate(nested)]
    pub stat_reward: Option<QuestStatReward>,
}

impl ValidateBody for UpdateQuestRequest {
    fn wire_name(field: &str) -> String {
        quest_field(field)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub current_day: Option<i32>,
    pub total_days: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub repeat: Option<String>,
    pub quest_type: Option<String>,
    pub status: Option<String>,
    pub xp_reward: Option<i32>,
    pub coin_reward: Option<i32>,
    pub stat_reward: Option<QuestStatReward>,
}

impl UpdateQuestRequest {
    pub fn parse(&self) -> Result<QuestChanges, AppError> {
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
        Ok(QuestChanges {
            title: self.title.as_deref().map(|s| s.trim().to_string()),
            description: self.description.as_deref().map(|s| s.trim().to_string()),
            current_day: self.current_day,
            total_days: self.total_days,
            start_date,
            end_date,
            repeat: self.repeat.clone(),
            quest_type: self.quest_type.as_deref().map(|s| s.trim().to_string()),
            status: self.status.clone(),
            xp_reward: self.xp_reward,
            coin_reward: self.coin_reward,
            stat_reward: self.stat_reward,
        })
    }
}
