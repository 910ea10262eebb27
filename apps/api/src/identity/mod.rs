//! Identity provider client: the boundary to the hosted auth service.
//!
//! Every authentication call goes through the `IdentityProvider` trait. The
//! concrete adapter (Supabase or Firebase) is picked once at startup from
//! `AUTH_PROVIDER` and carried in `AppState` as `Arc<dyn IdentityProvider>`.
//! Adapters own no state beyond their HTTP client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{AuthProviderKind, Config};
use crate::errors::AppError;

pub mod firebase;
pub mod supabase;

pub use firebase::FirebaseProvider;
pub use supabase::SupabaseProvider;

// ────────────────────────────────────────────────────────────────────────────
// Shared types
// ────────────────────────────────────────────────────────────────────────────

/// An identity the provider has vouched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    pub email: Option<String>,
    /// True when the provider reports the email as confirmed.
    pub email_verified: bool,
}

/// Provider-issued session, returned to callers unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub identity: VerifiedIdentity,
    pub session: Session,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountMetadata {
    pub full_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid or expired access token")]
    InvalidToken,

    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email address is already registered")]
    EmailTaken,

    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("refresh token is invalid or expired")]
    ExpiredOrInvalid,

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider rejected the request (status {status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("unexpected provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Replaces a generic 4xx rejection with the operation-specific kind.
    pub(crate) fn rejected_as(self, kind: ProviderError) -> ProviderError {
        match self {
            ProviderError::Rejected { .. } => kind,
            other => other,
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidToken => {
                AppError::Unauthorized("Invalid or expired token".to_string())
            }
            ProviderError::InvalidCredentials => {
                AppError::Unauthorized("Invalid credentials".to_string())
            }
            ProviderError::ExpiredOrInvalid => {
                AppError::Unauthorized("Invalid or expired refresh token".to_string())
            }
            ProviderError::EmailTaken => {
                AppError::DuplicateEmail("Email address is already registered".to_string())
            }
            ProviderError::WeakPassword(msg) => AppError::WeakCredential(msg),
            ProviderError::Unavailable(msg) => AppError::ProviderUnavailable(msg),
            ProviderError::Rejected {
                status, message, ..
            } if (400..500).contains(&status) => AppError::BadRequest(message),
            other => AppError::Provider(other.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Capability interface over the hosted auth service. Implement this to add
/// a provider without touching handlers or the reconciliation policy.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn verify(&self, access_token: &str) -> Result<VerifiedIdentity, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ProviderError>;

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<VerifiedIdentity, ProviderError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), ProviderError>;

    async fn update_metadata(
        &self,
        access_token: &str,
        metadata: &AccountMetadata,
    ) -> Result<(), ProviderError>;

    /// Changes the sign-in email of the token's account. `EmailTaken` when
    /// another account already uses it.
    async fn update_email(&self, access_token: &str, email: &str) -> Result<(), ProviderError>;
}

/// Constructs the adapter selected by configuration.
pub fn build_provider(config: &Config) -> Result<Arc<dyn IdentityProvider>> {
    let client = http_client(config.provider_timeout)?;
    let provider: Arc<dyn IdentityProvider> = match config.auth_provider {
        AuthProviderKind::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .context("Supabase settings missing for AUTH_PROVIDER=supabase")?;
            Arc::new(SupabaseProvider::new(
                client,
                supabase,
                config.password_reset_redirect_url.clone(),
            ))
        }
        AuthProviderKind::Firebase => {
            let firebase = config
                .firebase
                .as_ref()
                .context("Firebase settings missing for AUTH_PROVIDER=firebase")?;
            Arc::new(FirebaseProvider::new(
                client,
                firebase,
                config.password_reset_redirect_url.clone(),
            ))
        }
    };
    info!(
        "Identity provider initialized ({}, timeout {}s)",
        provider.name(),
        config.provider_timeout.as_secs()
    );
    Ok(provider)
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP plumbing shared by the adapters
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .context("Failed to build identity provider HTTP client")
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Unavailable(format!("request timed out: {e}"))
    } else if e.is_decode() {
        ProviderError::Malformed(e.to_string())
    } else {
        ProviderError::Unavailable(e.to_string())
    }
}

/// Sends a request and sorts failures: transport problems, 429 and 5xx are
/// `Unavailable`; any other non-success is `Rejected` with the code and
/// message extracted by `parse_error`.
pub(crate) async fn execute(
    request: RequestBuilder,
    parse_error: fn(&str) -> (Option<String>, String),
) -> Result<Response, ProviderError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 || status.is_server_error() {
        return Err(ProviderError::Unavailable(format!("status {status}: {body}")));
    }

    let (code, message) = parse_error(&body);
    Err(ProviderError::Rejected {
        status: status.as_u16(),
        code,
        message,
    })
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ProviderError> {
    response.json::<T>().await.map_err(transport_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_as_only_rewrites_rejections() {
        let rejected = ProviderError::Rejected {
            status: 400,
            code: None,
            message: "nope".into(),
        };
        assert!(matches!(
            rejected.rejected_as(ProviderError::InvalidCredentials),
            ProviderError::InvalidCredentials
        ));

        let unavailable = ProviderError::Unavailable("down".into());
        assert!(matches!(
            unavailable.rejected_as(ProviderError::InvalidCredentials),
            ProviderError::Unavailable(_)
        ));
    }

    #[test]
    fn test_app_error_mapping() {
        assert!(matches!(
            AppError::from(ProviderError::InvalidToken),
            AppError::Unauthorized(_)
        ));
        assert!(matches!(
            AppError::from(ProviderError::EmailTaken),
            AppError::DuplicateEmail(_)
        ));
        assert!(matches!(
            AppError::from(ProviderError::Unavailable("timeout".into())),
            AppError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(ProviderError::Rejected {
                status: 422,
                code: None,
                message: "Signups not allowed".into()
            }),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(ProviderError::Malformed("eof".into())),
            AppError::Provider(_)
        ));
    }
}
