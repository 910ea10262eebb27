//! Firebase Auth adapter (Identity Toolkit + Secure Token REST APIs).
//!
//! The API-key surface has no per-session revoke, so `sign_out` only logs.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    execute, read_json, AccountMetadata, IdentityProvider, ProviderError, Session, SignedIn,
    VerifiedIdentity,
};
use crate::config::FirebaseConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<FirebaseUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirebaseUser {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    email: Option<String>,
}

/// Secure Token endpoint answers in snake_case.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    token_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct FirebaseErrorBody {
    error: Option<FirebaseErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetail {
    message: String,
}

/// Firebase reports `CODE` or `CODE : human readable detail`.
fn parse_error(body: &str) -> (Option<String>, String) {
    let parsed: FirebaseErrorBody = serde_json::from_str(body).unwrap_or_default();
    match parsed.error {
        Some(detail) => {
            let code = detail
                .message
                .split(" : ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            (Some(code), detail.message)
        }
        None => (None, body.to_string()),
    }
}

fn error_code(err: &ProviderError) -> Option<String> {
    match err {
        ProviderError::Rejected { code, .. } => code.clone(),
        _ => None,
    }
}

fn is_token_error(code: &str) -> bool {
    matches!(
        code,
        "INVALID_ID_TOKEN"
            | "TOKEN_EXPIRED"
            | "USER_NOT_FOUND"
            | "USER_DISABLED"
            | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN"
    )
}

fn session_from(
    id_token: String,
    refresh_token: String,
    expires_in: &str,
    token_type: Option<String>,
) -> Result<Session, ProviderError> {
    let expires_in: i64 = expires_in
        .parse()
        .map_err(|_| ProviderError::Malformed(format!("invalid expiresIn '{expires_in}'")))?;
    Ok(Session {
        access_token: id_token,
        refresh_token,
        token_type: token_type.unwrap_or_else(|| "Bearer".to_string()),
        expires_in,
        expires_at: Some(Utc::now().timestamp() + expires_in),
    })
}

pub struct FirebaseProvider {
    client: Client,
    api_key: String,
    auth_url: String,
    token_url: String,
    continue_url: Option<String>,
}

impl FirebaseProvider {
    pub fn new(client: Client, config: &FirebaseConfig, continue_url: Option<String>) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            continue_url,
        }
    }

    async fn accounts(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let request = self
            .client
            .post(format!("{}/accounts:{method}", self.auth_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        execute(request, parse_error).await
    }

    async fn lookup(&self, id_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        let response = self
            .accounts("lookup", json!({ "idToken": id_token }))
            .await
            .map_err(|e| e.rejected_as(ProviderError::InvalidToken))?;
        let lookup: LookupResponse = read_json(response).await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(ProviderError::InvalidToken)?;
        Ok(VerifiedIdentity {
            subject_id: user.local_id,
            email: user.email.filter(|e| !e.is_empty()),
            email_verified: user.email_verified,
        })
    }

    async fn update(&self, body: serde_json::Value) -> Result<(), ProviderError> {
        self.accounts("update", body).await.map_err(|e| {
            match error_code(&e).as_deref() {
                Some(code) if is_token_error(code) => ProviderError::InvalidToken,
                Some(code) if code.starts_with("WEAK_PASSWORD") => {
                    ProviderError::WeakPassword(e.to_string())
                }
                Some("EMAIL_EXISTS") => ProviderError::EmailTaken,
                _ => e,
            }
        })?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseProvider {
    fn name(&self) -> &'static str {
        "firebase"
    }

    async fn verify(&self, access_token: &str) -> Result<VerifiedIdentity, ProviderError> {
        self.lookup(access_token).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ProviderError> {
        let response = self
            .accounts(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await
            .map_err(|e| e.rejected_as(ProviderError::InvalidCredentials))?;
        let auth: PasswordAuthResponse = read_json(response).await?;

        // signInWithPassword does not report verification state.
        let identity = match self.lookup(&auth.id_token).await {
            Ok(identity) => identity,
            Err(ProviderError::InvalidToken) => VerifiedIdentity {
                subject_id: auth.local_id.clone(),
                email: auth.email.clone(),
                email_verified: false,
            },
            Err(other) => return Err(other),
        };
        let session = session_from(auth.id_token, auth.refresh_token, &auth.expires_in, None)?;
        Ok(SignedIn { identity, session })
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<VerifiedIdentity, ProviderError> {
        let mut body = json!({ "email": email, "password": password, "returnSecureToken": true });
        if let Some(full_name) = &metadata.full_name {
            body["displayName"] = json!(full_name);
        }
        let response = self.accounts("signUp", body).await.map_err(|e| {
            match error_code(&e).as_deref() {
                Some("EMAIL_EXISTS") => ProviderError::EmailTaken,
                Some(code) if code.starts_with("WEAK_PASSWORD") => match e {
                    ProviderError::Rejected { message, .. } => ProviderError::WeakPassword(message),
                    other => other,
                },
                _ => e,
            }
        })?;
        let auth: PasswordAuthResponse = read_json(response).await?;
        Ok(VerifiedIdentity {
            subject_id: auth.local_id,
            email: auth.email.or_else(|| Some(email.to_string())),
            email_verified: false,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let request = self
            .client
            .post(format!("{}/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ]);
        let response = execute(request, parse_error)
            .await
            .map_err(|e| e.rejected_as(ProviderError::ExpiredOrInvalid))?;
        let refreshed: RefreshResponse = read_json(response).await?;
        session_from(
            refreshed.id_token,
            refreshed.refresh_token,
            &refreshed.expires_in,
            refreshed.token_type,
        )
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), ProviderError> {
        debug!("Firebase sign-out is client-side only; nothing to revoke");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let mut body = json!({ "requestType": "PASSWORD_RESET", "email": email });
        if let Some(continue_url) = &self.continue_url {
            body["continueUrl"] = json!(continue_url);
        }
        self.accounts("sendOobCode", body).await?;
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), ProviderError> {
        self.update(json!({
            "idToken": access_token,
            "password": new_password,
            "returnSecureToken": false,
        }))
        .await
    }

    async fn update_metadata(
        &self,
        access_token: &str,
        metadata: &AccountMetadata,
    ) -> Result<(), ProviderError> {
        self.update(json!({
            "idToken": access_token,
            "displayName": metadata.full_name,
            "returnSecureToken": false,
        }))
        .await
    }

    async fn update_email(&self, access_token: &str, email: &str) -> Result<(), ProviderError> {
        self.update(json!({
            "idToken": access_token,
            "email": email,
            "returnSecureToken": false,
        }))
        .await
    }
}
