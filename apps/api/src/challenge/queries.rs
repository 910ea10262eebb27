use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::challenge::requests::{ChallengeChanges, NewChallenge};
use crate::models::challenge::Challenge;

pub async fn insert_challenge(
    pool: &PgPool,
    profile_id: Uuid,
    challenge: &NewChallenge,
) -> Result<Challenge, sqlx::Error> {
    sqlx::query_as::<_, Challenge>(
        r#"
        INSERT INTO challenges
            (id, profile_id, name, description, category, difficulty, duration,
             start_date, end_date, status, image, rewards)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(profile_id)
    .bind(&challenge.name)
    .bind(&challenge.description)
    .bind(&challenge.category)
    .bind(&challenge.difficulty)
    .bind(challenge.duration)
    .bind(challenge.start_date)
    .bind(challenge.end_date)
    .bind(&challenge.status)
    .bind(&challenge.image)
    .bind(Json(challenge.rewards))
    .fetch_one(pool)
    .await
}

pub async fn list_challenges(pool: &PgPool, profile_id: Uuid) -> Result<Vec<Challenge>, sqlx::Error> {
    sqlx::query_as::<_, Challenge>(
        "SELECT * FROM challenges WHERE profile_id = $1 ORDER BY created_at DESC",
    )
    .bind(profile_id)
    .fetch_all(pool)
    .await
}

pub async fn find_challenge(pool: &PgPool, id: Uuid) -> Result<Option<Challenge>, sqlx::Error> {
    sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_challenge(
    pool: &PgPool,
    id: Uuid,
    changes: &ChallengeChanges,
) -> Result<Challenge, sqlx::Error> {
    sqlx::query_as::<_, Challenge>(
        r#"
        UPDATE challenges SET
            name        = COALESCE($2, name),
            description = COALESCE($3, description),
            category    = COALESCE($4, category),
            difficulty  = COALESCE($5, difficulty),
            duration    = COALESCE($6, duration),
            start_date  = COALESCE($7, start_date),
            end_date    = COALESCE($8, end_date),
            status      = COALESCE($9, status),
            image       = COALESCE($10, image),
            rewards     = COALESCE($11, rewards),
            updated_at  = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(&changes.category)
    .bind(&changes.difficulty)
    .bind(changes.duration)
    .bind(changes.start_date)
    .bind(changes.end_date)
    .bind(&changes.status)
    .bind(&changes.image)
    .bind(changes.rewards.map(Json))
    .fetch_one(pool)
    .await
}

/// Quests go with it through `ON DELETE CASCADE`.
pub async fn delete_challenge(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM challenges WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
