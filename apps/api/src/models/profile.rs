use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const GENDERS: &[&str] = &["MALE", "FEMALE", "OTHER"];
pub const RANKS: &[&str] = &["E", "D", "C", "B", "A", "S"];

/// Attribute block shared by profiles and character stat boosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: i32,
    pub intelligence: i32,
    pub karma: i32,
    pub stamina: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: String,
    pub fullname: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub avatar: Option<String>,
    pub character_id: Option<Uuid>,
    pub level: i32,
    pub xp: i32,
    pub stats: Json<Stats>,
    pub rank: String,
    pub streak: i32,
    pub max_streak: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
