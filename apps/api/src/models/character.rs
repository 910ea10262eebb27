use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::profile::Stats;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub gender: String,
    pub element: Option<String>,
    pub description: Option<String>,
    pub personality: Option<String>,
    pub backstory: Option<String>,
    pub powers: Vec<String>,
    pub stats_boost: Json<Stats>,
    pub image: String,
    pub full_image: String,
    pub bg_image: String,
    pub animated_image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog listing row; omits the heavy descriptive fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSummary {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub gender: String,
    pub element: Option<String>,
    pub personality: Option<String>,
    pub powers: Vec<String>,
    pub image: String,
    pub full_image: String,
    pub bg_image: String,
}
