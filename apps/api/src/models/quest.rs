use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const REPEATS: &[&str] = &["DAILY", "ALTERNATE_DAYS", "WEEKDAYS", "WEEKENDS", "WEEKLY"];
pub const QUEST_STATUSES: &[&str] = &["cancelled", "in-progress", "completed"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuestStatReward {
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub strength: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub agility: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub intelligence: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub title: String,
    pub description: String,
    pub current_day: i32,
    pub total_days: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub repeat: String,
    #[serde(rename = "type")]
    pub quest_type: String,
    pub status: String,
    pub xp_reward: i32,
    pub coin_reward: i32,
    pub stat_reward: Option<Json<QuestStatReward>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
