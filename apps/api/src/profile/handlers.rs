use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::profile::queries::{insert_profile, update_profile};
use crate::profile::requests::{CreateProfileRequest, UpdateProfileRequest};
use crate::state::AppState;
use crate::validation::AppJson;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub profile: Profile,
}

fn not_found() -> AppError {
    AppError::NotFound("Profile not found".to_string())
}

/// GET /profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state
        .users
        .find_profile(&ctx.user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(ProfileResponse {
        message: "Profile fetched successfully".to_string(),
        profile,
    }))
}

/// POST /profile
pub async fn handle_create_profile(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppJson(req): AppJson<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), AppError> {
    let new_profile = req.parse()?;

    if state.users.find_profile(&ctx.user.id).await?.is_some() {
        return Err(AppError::Conflict(
            "Profile already exists for this user".to_string(),
        ));
    }

    let profile = insert_profile(&state.db, &ctx.user.id, &new_profile).await?;
    info!(user_id = %ctx.user.id, profile_id = %profile.id, "Profile created");
    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            message: "Profile created successfully".to_string(),
            profile,
        }),
    ))
}

/// PATCH /profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let changes = req.parse()?;

    if state.users.find_profile(&ctx.user.id).await?.is_none() {
        return Err(not_found());
    }

    let profile = update_profile(&state.db, &ctx.user.id, &changes)
        .await?
        .ok_or_else(not_found)?;
    info!(user_id = %ctx.user.id, "Profile updated");
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        profile,
    }))
}
