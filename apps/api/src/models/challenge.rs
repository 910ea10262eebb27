use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const CATEGORIES: &[&str] = &["fitness", "nutrition", "mental"];
pub const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];
pub const CHALLENGE_STATUSES: &[&str] = &["active", "completed", "expired"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StatReward {
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub stamina: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub intelligence: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub strength: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Rewards {
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub xp: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub coins: Option<i32>,
    #[validate(nested)]
    pub stat: Option<StatReward>,
}

/// A challenge owned by the profile that created it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub duration: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub image: Option<String>,
    pub rewards: Json<Rewards>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
