//! Request Gate: bearer verification in front of every protected route.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::identity::{ProviderError, VerifiedIdentity};
use crate::models::user::User;
use crate::state::AppState;

/// Authenticated caller, attached to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    /// Identity as reported by the provider on this request.
    pub identity: VerifiedIdentity,
    pub access_token: String,
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verification failures are 401 unless the provider itself is down.
pub(crate) fn verify_failure(err: ProviderError) -> AppError {
    match err {
        ProviderError::Unavailable(msg) => AppError::ProviderUnavailable(msg),
        ProviderError::InvalidToken => AppError::Unauthorized("Invalid or expired token".into()),
        other => {
            warn!("Token verification failed: {other}");
            AppError::Unauthorized("Invalid or expired token".into())
        }
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(AppError::unauthorized)?
        .to_string();

    let identity = state
        .identity
        .verify(&token)
        .await
        .map_err(verify_failure)?;

    let user = state
        .users
        .find_by_id(&identity.subject_id)
        .await?
        .ok_or_else(|| {
            debug!(subject_id = %identity.subject_id, "Verified identity has no local user");
            AppError::Unauthorized("User is not registered".into())
        })?;

    let user = state.users.touch(&user.id, None).await?;

    req.extensions_mut().insert(AuthContext {
        user,
        identity,
        access_token: token,
    });
    Ok(next.run(req).await)
}

/// Handler-side access to the `AuthContext`.
pub struct CurrentUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(AppError::unauthorized)
    }
}
