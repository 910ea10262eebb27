use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::profile::Profile;

pub const ROLE_USER: &str = "USER";

/// Local user record. `id` is the identity provider's subject id, never
/// generated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub is_verified: bool,
    pub last_active_date: DateTime<Utc>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create or upsert a user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub is_verified: bool,
}

/// The user as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub is_verified: bool,
    pub role: String,
    pub last_active_date: DateTime<Utc>,
    pub profile: Option<Profile>,
}

impl UserView {
    pub fn new(user: User, profile: Option<Profile>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_verified: user.is_verified,
            role: user.role,
            last_active_date: user.last_active_date,
            profile,
        }
    }
}
