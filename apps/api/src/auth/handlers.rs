use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::middleware::{bearer_token, verify_failure, CurrentUser};
use crate::auth::requests::{
    normalize_email, ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, UpdateMeRequest,
};
use crate::errors::AppError;
use crate::identity::{AccountMetadata, ProviderError, Session};
use crate::models::user::{User, UserView};
use crate::state::AppState;
use crate::users::reconcile::{register_account, resolve_login, resolve_registration};
use crate::users::{StoreError, UniqueKey};
use crate::validation::{AppJson, ValidateBody};

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: UserView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub session: Session,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

async fn user_view(state: &AppState, user: User) -> Result<UserView, AppError> {
    let profile = state.users.find_profile(&user.id).await?;
    Ok(UserView::new(user, profile))
}

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    AppJson(mut req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    req.email = normalize_email(&req.email);
    req.check()?;
    info!(email = %req.email, "Register requested");

    let metadata = AccountMetadata {
        full_name: Some(req.full_name()),
    };
    let user = register_account(
        state.identity.as_ref(),
        state.users.as_ref(),
        &req.email,
        &req.password,
        &metadata,
    )
    .await?;
    info!(user_id = %user.id, "User registered");

    let (session, text) = match state.identity.sign_in(&req.email, &req.password).await {
        Ok(signed_in) => (
            Some(signed_in.session),
            "User registered successfully",
        ),
        Err(e) => {
            warn!(user_id = %user.id, "Auto-login after registration failed: {e}");
            (
                None,
                "User registered successfully. Please login to continue.",
            )
        }
    };

    let user = user_view(&state, user).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: text.to_string(),
            user,
            session,
        }),
    ))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    AppJson(mut req): AppJson<LoginRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.email = normalize_email(&req.email);
    req.check()?;
    info!(email = %req.email, "Login requested");

    let signed_in = state.identity.sign_in(&req.email, &req.password).await?;
    let user = resolve_login(state.users.as_ref(), &signed_in.identity)
        .await?
        .into_user();

    let user = user_view(&state, user).await?;
    Ok(Json(UserResponse {
        message: "Login successful".to_string(),
        user,
        session: Some(signed_in.session),
    }))
}

/// POST /auth/token/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    req.check()?;
    let session = state.identity.refresh(req.refresh_token.trim()).await?;
    Ok(Json(SessionResponse {
        message: "Token refreshed successfully".to_string(),
        session,
    }))
}

/// POST /auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    if let Some(token) = bearer_token(&headers) {
        match state.identity.sign_out(token).await {
            Ok(()) => {}
            Err(ProviderError::Unavailable(msg)) => {
                return Err(AppError::ProviderUnavailable(msg))
            }
            Err(e) => warn!("Sign-out rejected by provider: {e}"),
        }
    }
    Ok(message("Logged out successfully"))
}

/// POST /auth/forgot-password
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    AppJson(mut req): AppJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.email = normalize_email(&req.email);
    req.check()?;

    // Outcome is not reported to the caller; account existence stays private.
    if let Err(e) = state.identity.send_password_reset(&req.email).await {
        warn!("Password reset email failed: {e}");
    }
    Ok(message(
        "If an account exists for this email, a password reset link has been sent",
    ))
}

/// POST /auth/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.check()?;
    let token = req.access_token.trim();

    state.identity.verify(token).await.map_err(|e| match e {
        ProviderError::Unavailable(msg) => AppError::ProviderUnavailable(msg),
        _ => AppError::BadRequest("Invalid or expired token".to_string()),
    })?;

    state
        .identity
        .update_password(token, &req.password)
        .await
        .map_err(|e| match e {
            ProviderError::InvalidToken => {
                AppError::BadRequest("Invalid or expired token".to_string())
            }
            other => other.into(),
        })?;

    Ok(message("Password reset successfully"))
}

/// POST /auth/sync
pub async fn handle_sync(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let email = ctx.identity.email.as_deref().map(normalize_email);
    let user = state
        .users
        .sync(&ctx.user.id, email.as_deref(), ctx.identity.email_verified)
        .await?;

    let user = user_view(&state, user).await?;
    Ok(Json(UserResponse {
        message: "User synced successfully".to_string(),
        user,
        session: None,
    }))
}

/// POST /auth/onboard
///
/// For accounts created directly with the provider: persists the local row
/// for the bearer's identity.
pub async fn handle_onboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, AppError> {
    let token = bearer_token(&headers).ok_or_else(AppError::unauthorized)?;
    let mut identity = state
        .identity
        .verify(token)
        .await
        .map_err(verify_failure)?;
    identity.email = identity.email.as_deref().map(normalize_email);

    let user = resolve_registration(state.users.as_ref(), &identity).await?;
    info!(user_id = %user.id, "User onboarded");

    let user = user_view(&state, user).await?;
    Ok(Json(UserResponse {
        message: "User onboarded successfully".to_string(),
        user,
        session: None,
    }))
}

/// GET /auth/me
pub async fn handle_get_me(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_view(&state, ctx.user).await?;
    Ok(Json(UserResponse {
        message: "User retrieved successfully".to_string(),
        user,
        session: None,
    }))
}

/// PUT /auth/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppJson(mut req): AppJson<UpdateMeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.email = req.email.as_deref().map(normalize_email);
    req.check()?;

    let mut user = ctx.user;
    if let Some(email) = req.email.as_deref().filter(|e| *e != user.email) {
        if state
            .users
            .find_by_email(email)
            .await?
            .is_some_and(|other| other.id != user.id)
        {
            return Err(StoreError::UniqueViolation(UniqueKey::Email).into());
        }
        // The provider owns the sign-in email; sync copies it back locally.
        state
            .identity
            .update_email(&ctx.access_token, email)
            .await?;
        user = match state.users.update_email(&user.id, email).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(
                    user_id = %user.id,
                    error = %e,
                    "Provider email changed but local row was not updated"
                );
                return Err(e.into());
            }
        };
        info!(user_id = %user.id, "User email updated");
    }

    if let Some(fullname) = req.fullname.as_deref() {
        let metadata = AccountMetadata {
            full_name: Some(fullname.trim().to_string()),
        };
        state
            .identity
            .update_metadata(&ctx.access_token, &metadata)
            .await?;
    }

    let user = user_view(&state, user).await?;
    Ok(Json(UserResponse {
        message: "User updated successfully".to_string(),
        user,
        session: None,
    }))
}
