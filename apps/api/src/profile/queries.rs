use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{Profile, Stats};
use crate::profile::requests::{NewProfile, ProfileChanges};

/// Maps constraint failures on `profiles` to API errors.
fn classify(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict("Profile already exists for this user".to_string());
        }
        if db.is_foreign_key_violation() {
            return AppError::NotFound("Character not found".to_string());
        }
    }
    AppError::Database(err)
}

pub async fn insert_profile(
    pool: &PgPool,
    user_id: &str,
    profile: &NewProfile,
) -> Result<Profile, AppError> {
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles
            (id, user_id, fullname, date_of_birth, gender, height, weight, avatar, stats)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&profile.fullname)
    .bind(profile.date_of_birth)
    .bind(&profile.gender)
    .bind(profile.height)
    .bind(profile.weight)
    .bind(&profile.avatar)
    .bind(Json(Stats::default()))
    .fetch_one(pool)
    .await
    .map_err(classify)
}

/// Applies the non-`None` fields of `changes`. Returns `None` when the user
/// has no profile.
pub async fn update_profile(
    pool: &PgPool,
    user_id: &str,
    changes: &ProfileChanges,
) -> Result<Option<Profile>, AppError> {
    sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles SET
            fullname      = COALESCE($2, fullname),
            character_id  = COALESCE($3, character_id),
            date_of_birth = COALESCE($4, date_of_birth),
            gender        = COALESCE($5, gender),
            height        = COALESCE($6, height),
            weight        = COALESCE($7, weight),
            avatar        = COALESCE($8, avatar),
            level         = COALESCE($9, level),
            xp            = COALESCE($10, xp),
            stats         = COALESCE($11, stats),
            rank          = COALESCE($12, rank),
            streak        = COALESCE($13, streak),
            max_streak    = COALESCE($14, max_streak),
            updated_at    = now()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&changes.fullname)
    .bind(changes.character_id)
    .bind(changes.date_of_birth)
    .bind(&changes.gender)
    .bind(changes.height)
    .bind(changes.weight)
    .bind(&changes.avatar)
    .bind(changes.level)
    .bind(changes.xp)
    .bind(changes.stats.map(Json))
    .bind(&changes.rank)
    .bind(changes.streak)
    .bind(changes.max_streak)
    .fetch_optional(pool)
    .await
    .map_err(classify)
}
