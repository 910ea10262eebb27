use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthContext, CurrentUser};
use crate::challenge::handlers::owned_challenge;
use crate::challenge::requests::check_date_order;
use crate::challenge::caller_profile;
use crate::errors::AppError;
use crate::models::challenge::Challenge;
use crate::models::quest::Quest;
use crate::quest::queries::{delete_quest, find_quest, insert_quest, list_quests, update_quest};
use crate::quest::requests::{CreateQuestRequest, UpdateQuestRequest};
use crate::state::AppState;
use crate::validation::{AppJson, AppPath};

#[derive(Serialize)]
pub struct QuestResponse {
    pub message: String,
    pub quest: Quest,
}

#[derive(Serialize)]
pub struct QuestListResponse {
    pub message: String,
    pub quests: Vec<Quest>,
}

fn quest_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Quest {id} not found"))
}

/// Every quest route is scoped to a challenge the caller owns.
async fn challenge_for(
    state: &AppState,
    ctx: &AuthContext,
    challenge_id: Uuid,
) -> Result<Challenge, AppError> {
    let profile = caller_profile(state, ctx).await?;
    owned_challenge(state, &profile, challenge_id).await
}

/// POST /quest/:challenge_id
pub async fn handle_create_quest(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath(challenge_id): AppPath<Uuid>,
    AppJson(req): AppJson<CreateQuestRequest>,
) -> Result<(StatusCode, Json<QuestResponse>), AppError> {
    let new_quest = req.parse()?;
    let challenge = challenge_for(&state, &ctx, challenge_id).await?;

    let quest = insert_quest(&state.db, challenge.id, &new_quest).await?;
    info!(challenge_id = %challenge.id, quest_id = %quest.id, "Quest created");
    Ok((
        StatusCode::CREATED,
        Json(QuestResponse {
            message: "Quest created successfully".to_string(),
            quest,
        }),
    ))
}

/// GET /quest/:challenge_id
pub async fn handle_list_quests(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath(challenge_id): AppPath<Uuid>,
) -> Result<Json<QuestListResponse>, AppError> {
    let challenge = challenge_for(&state, &ctx, challenge_id).await?;
    let quests = list_quests(&state.db, challenge.id).await?;
    Ok(Json(QuestListResponse {
        message: "Quests fetched successfully".to_string(),
        quests,
    }))
}

/// GET /quest/:challenge_id/:id
pub async fn handle_get_quest(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath((challenge_id, id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<QuestResponse>, AppError> {
    let challenge = challenge_for(&state, &ctx, challenge_id).await?;
    let quest = find_quest(&state.db, challenge.id, id)
        .await?
        .ok_or_else(|| quest_not_found(id))?;
    Ok(Json(QuestResponse {
        message: "Quest fetched successfully".to_string(),
        quest,
    }))
}

/// PATCH /quest/:challenge_id/:id
pub async fn handle_update_quest(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath((challenge_id, id)): AppPath<(Uuid, Uuid)>,
    AppJson(req): AppJson<UpdateQuestRequest>,
) -> Result<Json<QuestResponse>, AppError> {
    let changes = req.parse()?;
    let challenge = challenge_for(&state, &ctx, challenge_id).await?;
    let existing = find_quest(&state.db, challenge.id, id)
        .await?
        .ok_or_else(|| quest_not_found(id))?;

    check_date_order(
        changes.start_date.unwrap_or(existing.start_date),
        changes.end_date.unwrap_or(existing.end_date),
    )?;

    let quest = update_quest(&state.db, challenge.id, id, &changes)
        .await?
        .ok_or_else(|| quest_not_found(id))?;
    info!(quest_id = %id, "Quest updated");
    Ok(Json(QuestResponse {
        message: "Quest updated successfully".to_string(),
        quest,
    }))
}

/// DELETE /quest/:challenge_id/:id
pub async fn handle_delete_quest(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath((challenge_id, id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let challenge = challenge_for(&state, &ctx, challenge_id).await?;
    if !delete_quest(&state.db, challenge.id, id).await? {
        return Err(quest_not_found(id));
    }
    info!(quest_id = %id, "Quest deleted");
    Ok(StatusCode::NO_CONTENT)
}
