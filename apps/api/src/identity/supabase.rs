//! Supabase Auth (GoTrue) adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    execute, read_json, AccountMetadata, IdentityProvider, ProviderError, Session, SignedIn,
    VerifiedIdentity,
};
use crate::config::SupabaseConfig;

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
    email_confirmed_at: Option<DateTime<Utc>>,
}

impl From<SupabaseUser> for VerifiedIdentity {
    fn from(user: SupabaseUser) -> Self {
        VerifiedIdentity {
            subject_id: user.id,
            email: user.email.filter(|e| !e.is_empty()),
            email_verified: user.email_confirmed_at.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: String,
    expires_in: i64,
    expires_at: Option<i64>,
    user: Option<SupabaseUser>,
}

impl TokenResponse {
    fn into_parts(self) -> (Session, Option<SupabaseUser>) {
        let expires_at = self
            .expires_at
            .or_else(|| Some(Utc::now().timestamp() + self.expires_in));
        (
            Session {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                token_type: self.token_type,
                expires_in: self.expires_in,
                expires_at,
            },
            self.user,
        )
    }
}

/// `/signup` answers with a session when auto-confirm is on, else the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignupResponse {
    WithSession { user: SupabaseUser },
    User(SupabaseUser),
}

#[derive(Debug, Deserialize, Default)]
struct SupabaseErrorBody {
    error_code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

fn parse_error(body: &str) -> (Option<String>, String) {
    let parsed: SupabaseErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error_code.or(parsed.error.clone());
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| body.to_string());
    (code, message)
}

fn classify_signup_error(err: ProviderError) -> ProviderError {
    match err {
        ProviderError::Rejected {
            status,
            code,
            message,
        } => {
            let lowered = message.to_lowercase();
            match code.as_deref() {
                Some("email_exists") | Some("user_already_exists") => ProviderError::EmailTaken,
                Some("weak_password") => ProviderError::WeakPassword(message),
                _ if lowered.contains("already registered")
                    || lowered.contains("already been registered") =>
                {
                    ProviderError::EmailTaken
                }
                _ if lowered.contains("password should") => ProviderError::WeakPassword(message),
                _ => ProviderError::Rejected {
                    status,
                    code,
                    message,
                },
            }
        }
        other => other,
    }
}

pub struct SupabaseProvider {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
    reset_redirect: Option<String>,
}

impl SupabaseProvider {
    pub fn new(client: Client, config: &SupabaseConfig, reset_redirect: Option<String>) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
            reset_redirect,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    async fn user_update(
        &self,
        access_token: &str,
        body: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let request = self
            .client
            .put(self.endpoint("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&body);
        execute(request, parse_error)
            .await
            .map_err(|e| match e {
                ProviderError::Rejected { status: 401, .. }
                | ProviderError::Rejected { status: 403, .. } => ProviderError::InvalidToken,
                other => classify_signup_error(other),
            })?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn verify(&self, access_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        let request = self
            .client
            .get(self.endpoint("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        let response = execute(request, parse_error)
            .await
            .map_err(|e| e.rejected_as(ProviderError::InvalidToken))?;
        let user: SupabaseUser = read_json(response).await?;
        Ok(user.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ProviderError> {
        let request = self
            .client
            .post(self.endpoint("/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));
        let response = execute(request, parse_error)
            .await
            .map_err(|e| e.rejected_as(ProviderError::InvalidCredentials))?;
        let (session, user) = read_json::<TokenResponse>(response).await?.into_parts();
        let user = user.ok_or_else(|| {
            ProviderError::Malformed("password grant returned no user".to_string())
        })?;
        Ok(SignedIn {
            identity: user.into(),
            session,
        })
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<VerifiedIdentity, ProviderError> {
        let full_name = metadata.full_name.as_deref();
        let request = match &self.service_role_key {
            Some(service_key) => self
                .client
                .post(self.endpoint("/admin/users"))
                .header("apikey", service_key)
                .bearer_auth(service_key)
                .json(&json!({
                    "email": email,
                    "password": password,
                    "email_confirm": false,
                    "user_metadata": { "full_name": full_name },
                })),
            None => self
                .client
                .post(self.endpoint("/signup"))
                .header("apikey", &self.anon_key)
                .json(&json!({
                    "email": email,
                    "password": password,
                    "data": { "full_name": full_name },
                })),
        };

        let response = execute(request, parse_error)
            .await
            .map_err(classify_signup_error)?;
        let user = match read_json::<SignupResponse>(response).await? {
            SignupResponse::WithSession { user } | SignupResponse::User(user) => user,
        };
        Ok(user.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let request = self
            .client
            .post(self.endpoint("/token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }));
        let response = execute(request, parse_error)
            .await
            .map_err(|e| e.rejected_as(ProviderError::ExpiredOrInvalid))?;
        let (session, _) = read_json::<TokenResponse>(response).await?.into_parts();
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let request = self
            .client
            .post(self.endpoint("/logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        execute(request, parse_error)
            .await
            .map_err(|e| e.rejected_as(ProviderError::InvalidToken))?;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let mut request = self
            .client
            .post(self.endpoint("/recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }));
        if let Some(redirect) = &self.reset_redirect {
            request = request.query(&[("redirect_to", redirect.as_str())]);
        }
        execute(request, parse_error).await?;
        debug!("Supabase accepted password reset request");
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), ProviderError> {
        self.user_update(access_token, json!({ "password": new_password }))
            .await
    }

    async fn update_metadata(
        &self,
        access_token: &str,
        metadata: &AccountMetadata,
    ) -> Result<(), ProviderError> {
        self.user_update(
            access_token,
            json!({ "data": { "full_name": metadata.full_name } }),
        )
        .await
    }

    async fn update_email(&self, access_token: &str, email: &str) -> Result<(), ProviderError> {
        self.user_update(access_token, json!({ "email": email }))
            .await
    }
}
