use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthContext, CurrentUser};
use crate::challenge::queries::{
    delete_challenge, find_challenge, insert_challenge, list_challenges, update_challenge,
};
use crate::challenge::requests::{check_date_order, CreateChallengeRequest, UpdateChallengeRequest};
use crate::errors::AppError;
use crate::models::challenge::Challenge;
use crate::models::profile::Profile;
use crate::state::AppState;
use crate::validation::{AppJson, AppPath};

#[derive(Serialize)]
pub struct ChallengeResponse {
    pub message: String,
    pub challenge: Challenge,
}

#[derive(Serialize)]
pub struct ChallengeListResponse {
    pub message: String,
    pub challenges: Vec<Challenge>,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub message: String,
}

/// Challenges hang off the profile, so callers without one get 404.
pub async fn caller_profile(state: &AppState, ctx: &AuthContext) -> Result<Profile, AppError> {
    state
        .users
        .find_profile(&ctx.user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found. Create a profile first".to_string()))
}

fn challenge_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Challenge {id} not found"))
}

/// 403 unless `profile` created `challenge`.
pub fn ensure_owner(challenge: &Challenge, profile: &Profile) -> Result<(), AppError> {
    if challenge.profile_id == profile.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not own this challenge".to_string(),
        ))
    }
}

/// Loads a challenge the caller may modify: 404 if absent, 403 if foreign.
pub async fn owned_challenge(
    state: &AppState,
    profile: &Profile,
    id: Uuid,
) -> Result<Challenge, AppError> {
    let challenge = find_challenge(&state.db, id)
        .await?
        .ok_or_else(|| challenge_not_found(id))?;
    ensure_owner(&challenge, profile)?;
    Ok(challenge)
}

/// POST /challenge
pub async fn handle_create_challenge(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppJson(req): AppJson<CreateChallengeRequest>,
) -> Result<(StatusCode, Json<ChallengeResponse>), AppError> {
    let new_challenge = req.parse()?;
    let profile = caller_profile(&state, &ctx).await?;

    let challenge = insert_challenge(&state.db, profile.id, &new_challenge).await?;
    info!(profile_id = %profile.id, challenge_id = %challenge.id, "Challenge created");
    Ok((
        StatusCode::CREATED,
        Json(ChallengeResponse {
            message: "Challenge created successfully".to_string(),
            challenge,
        }),
    ))
}

/// GET /challenge
pub async fn handle_list_challenges(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<ChallengeListResponse>, AppError> {
    let profile = caller_profile(&state, &ctx).await?;
    let challenges = list_challenges(&state.db, profile.id).await?;
    Ok(Json(ChallengeListResponse {
        message: "Challenges fetched successfully".to_string(),
        challenges,
    }))
}

/// GET /challenge/:id
pub async fn handle_get_challenge(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let profile = caller_profile(&state, &ctx).await?;
    let challenge = find_challenge(&state.db, id)
        .await?
        .filter(|c| ensure_owner(c, &profile).is_ok())
        .ok_or_else(|| challenge_not_found(id))?;
    Ok(Json(ChallengeResponse {
        message: "Challenge fetched successfully".to_string(),
        challenge,
    }))
}

/// PATCH /challenge/:id
pub async fn handle_update_challenge(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateChallengeRequest>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let changes = req.parse()?;
    let profile = caller_profile(&state, &ctx).await?;
    let existing = owned_challenge(&state, &profile, id).await?;

    check_date_order(
        changes.start_date.unwrap_or(existing.start_date),
        changes.end_date.unwrap_or(existing.end_date),
    )?;

    let challenge = update_challenge(&state.db, id, &changes).await?;
    info!(challenge_id = %id, "Challenge updated");
    Ok(Json(ChallengeResponse {
        message: "Challenge updated successfully".to_string(),
        challenge,
    }))
}

/// DELETE /challenge/:id
pub async fn handle_delete_challenge(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let profile = caller_profile(&state, &ctx).await?;
    owned_challenge(&state, &profile, id).await?;

    delete_challenge(&state.db, id).await?;
    info!(challenge_id = %id, "Challenge deleted");
    Ok(Json(DeletedResponse {
        message: "Challenge deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::types::Json as Jsonb;

    use super::*;
    use crate::models::challenge::Rewards;
    use crate::testing::{sample_profile, TestApp};

    fn challenge_of(profile: &Profile) -> Challenge {
        let now = Utc::now();
        Challenge {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            name: "Couch to 5k".into(),
            description: "Run three times a week".into(),
            category: "fitness".into(),
            difficulty: "easy".into(),
            duration: 30,
            start_date: now,
            end_date: now,
            status: "active".into(),
            image: None,
            rewards: Jsonb(Rewards::default()),
            created_at: now,
            updated_at: now,
        }
    }

    fn body() -> serde_json::Value {
        json!({
            "name": "Couch to 5k",
            "description": "Run three times a week",
            "category": "fitness",
            "difficulty": "easy",
            "duration": 30,
            "start": "2025-03-01",
            "end": "2025-03-31",
            "rewards": { "xp": 100 }
        })
    }

    #[test]
    fn test_owner_passes_ownership_check() {
        let profile = sample_profile("user-1");
        let challenge = challenge_of(&profile);
        assert!(ensure_owner(&challenge, &profile).is_ok());
    }

    #[test]
    fn test_foreign_challenge_is_forbidden() {
        let owner = sample_profile("user-1");
        let other = sample_profile("user-2");
        let challenge = challenge_of(&owner);

        let err = ensure_owner(&challenge, &other).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let response = axum::response::IntoResponse::into_response(err);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_modifying_without_profile_is_404() {
        let app = TestApp::new();
        let (_, token) = app.signed_in_user("a@x.com");
        let uri = format!("/challenge/{}", Uuid::new_v4());

        let (status, _) = app
            .call(Method::PATCH, &uri, Some(&token), Some(json!({ "status": "completed" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.call(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_without_profile_is_404() {
        let app = TestApp::new();
        let (_, token) = app.signed_in_user("a@x.com");

        let (status, body) = app
            .call(Method::POST, "/challenge", Some(&token), Some(body()))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_without_profile_is_404() {
        let app = TestApp::new();
        let (_, token) = app.signed_in_user("a@x.com");

        let (status, _) = app.call(Method::GET, "/challenge", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_rejects_reversed_dates() {
        let app = TestApp::new();
        let (_, token) = app.signed_in_user("a@x.com");
        let mut payload = body();
        payload["start"] = json!("2025-04-01");

        let (status, body) = app
            .call(Method::POST, "/challenge", Some(&token), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"][0]["field"], "end");
    }

    #[tokio::test]
    async fn test_bad_id_is_rejected() {
        let app = TestApp::new();
        let (_, token) = app.signed_in_user("a@x.com");

        let (status, body) = app
            .call(Method::GET, "/challenge/not-a-uuid", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_challenge_requires_auth() {
        let app = TestApp::new();
        let (status, _) = app
            .call(Method::POST, "/challenge", None, Some(body()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
