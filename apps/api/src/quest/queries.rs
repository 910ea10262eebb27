use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::quest::Quest;
use crate::quest::requests::{NewQuest, QuestChanges};

pub async fn insert_quest(
    pool: &PgPool,
    challenge_id: Uuid,
    quest: &NewQuest,
) -> Result<Quest, sqlx::Error> {
    sqlx::query_as::<_, Quest>(
        r#"
        INSERT INTO challenge_quests
            (id, challenge_id, title, description, current_day, total_days, start_date,
             end_date, repeat, quest_type, status, xp_reward, coin_reward, stat_reward)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(challenge_id)
    .bind(&quest.title)
    .bind(&quest.description)
    .bind(quest.current_day)
    .bind(quest.total_days)
    .bind(quest.start_date)
    .bind(quest.end_date)
    .bind(&quest.repeat)
    .bind(&quest.quest_type)
    .bind(&quest.status)
    .bind(quest.xp_reward)
    .bind(quest.coin_reward)
    .bind(quest.stat_reward.map(Json))
    .fetch_one(pool)
    .await
}

pub async fn list_quests(pool: &PgPool, challenge_id: Uuid) -> Result<Vec<Quest>, sqlx::Error> {
    sqlx::query_as::<_, Quest>(
        "SELECT * FROM challenge_quests WHERE challenge_id = $1 ORDER BY start_date, created_at",
    )
    .bind(challenge_id)
    .fetch_all(pool)
    .await
}

pub async fn find_quest(
    pool: &PgPool,
    challenge_id: Uuid,
    id: Uuid,
) -> Result<Option<Quest>, sqlx::Error> {
    sqlx::query_as::<_, Quest>("SELECT * FROM challenge_quests WHERE id = $1 AND challenge_id = $2")
        .bind(id)
        .bind(challenge_id)
        .fetch_optional(pool)
        .await
}

pub async fn update_quest(
    pool: &PgPool,
    challenge_id: Uuid,
    id: Uuid,
    changes: &QuestChanges,
) -> Result<Option<Quest>, sqlx::Error> {
    sqlx::query_as::<_, Quest>(
        r#"
        UPDATE challenge_quests SET
            title       = COALESCE($3, title),
            description = COALESCE($4, description),
            current_day = COALESCE($5, current_day),
            total_days  = COALESCE($6, total_days),
            start_date  = COALESCE($7, start_date),
            end_date    = COALESCE($8, end_date),
            repeat      = COALESCE($9, repeat),
            quest_type  = COALESCE($10, quest_type),
            status      = COALESCE($11, status),
            xp_reward   = COALESCE($12, xp_reward),
            coin_reward = COALESCE($13, coin_reward),
            stat_reward = COALESCE($14, stat_reward),
            updated_at  = now()
        WHERE id = $1 AND challenge_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(challenge_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.current_day)
    .bind(changes.total_days)
    .bind(changes.start_date)
    .bind(changes.end_date)
    .bind(&changes.repeat)
    .bind(&changes.quest_type)
    .bind(&changes.status)
    .bind(changes.xp_reward)
    .bind(changes.coin_reward)
    .bind(changes.stat_reward.map(Json))
    .fetch_optional(pool)
    .await
}

/// Returns whether a row was removed.
pub async fn delete_quest(pool: &PgPool, challenge_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM challenge_quests WHERE id = $1 AND challenge_id = $2")
        .bind(id)
        .bind(challenge_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
