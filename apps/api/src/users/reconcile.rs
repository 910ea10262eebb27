//! Identity reconciliation: maps a verified provider identity to exactly one
//! local user row.
//!
//! Login order:
//! 1. match by subject id (and refuse if the identity's email belongs to a
//!    different row)
//! 2. match by email: the row is reattached and keeps its original id
//! 3. insert; a lost unique-constraint race is retried as a lookup
//!
//! Registration upserts by subject id and never consults the email branch.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::identity::{AccountMetadata, IdentityProvider, ProviderError, VerifiedIdentity};
use crate::models::user::{NewUser, User};
use crate::users::store::{StoreError, UniqueKey, UserStore};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("duplicate email: {0}")]
    DuplicateEmail(String),

    #[error("weak credential: {0}")]
    WeakCredential(String),

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("subject {subject_id} and email {email} resolve to different users")]
    LocalStoreConflict { subject_id: String, email: String },

    #[error("provider account {subject_id} created but not persisted: {reason}")]
    RegistrationIncomplete { subject_id: String, reason: String },

    #[error("identity {0} carries no email address")]
    MissingEmail(String),

    #[error(transparent)]
    Provider(ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::DuplicateEmail(msg) => AppError::DuplicateEmail(msg),
            ReconcileError::WeakCredential(msg) => AppError::WeakCredential(msg),
            ReconcileError::ProviderUnavailable(msg) => AppError::ProviderUnavailable(msg),
            ReconcileError::LocalStoreConflict { subject_id, email } => {
                AppError::LocalStoreConflict(format!(
                    "Identity {subject_id} and email {email} belong to different accounts"
                ))
            }
            ReconcileError::RegistrationIncomplete { subject_id, reason } => {
                warn!(subject_id = %subject_id, reason = %reason, "Registration left unlinked provider account");
                AppError::RegistrationIncomplete(format!(
                    "The account was created with the identity provider (id {subject_id}) but could not be saved. Log in to finish registration."
                ))
            }
            ReconcileError::MissingEmail(_) => {
                AppError::BadRequest("The identity has no email address".to_string())
            }
            ReconcileError::Provider(e) => e.into(),
            ReconcileError::Store(e) => e.into(),
        }
    }
}

fn from_provider(err: ProviderError, email: &str) -> ReconcileError {
    match err {
        ProviderError::EmailTaken => {
            ReconcileError::DuplicateEmail(format!("Email {email} is already registered"))
        }
        ProviderError::WeakPassword(msg) => ReconcileError::WeakCredential(msg),
        ProviderError::Unavailable(msg) => ReconcileError::ProviderUnavailable(msg),
        other => ReconcileError::Provider(other),
    }
}

/// How a login identity was matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Existing(User),
    /// Matched by email under a different id; the row keeps its old id.
    Reattached(User),
    Created(User),
}

impl Resolution {
    pub fn into_user(self) -> User {
        match self {
            Resolution::Existing(u) | Resolution::Reattached(u) | Resolution::Created(u) => u,
        }
    }
}

fn new_user(identity: &VerifiedIdentity) -> Result<NewUser, ReconcileError> {
    let email = identity
        .email
        .clone()
        .ok_or_else(|| ReconcileError::MissingEmail(identity.subject_id.clone()))?;
    Ok(NewUser {
        id: identity.subject_id.clone(),
        email,
        is_verified: identity.email_verified,
    })
}

/// Fails when the subject id and the identity's email point at two rows.
async fn ensure_single_owner(
    store: &dyn UserStore,
    identity: &VerifiedIdentity,
    by_id: &User,
) -> Result<(), ReconcileError> {
    let Some(email) = identity.email.as_deref() else {
        return Ok(());
    };
    if by_id.email.eq_ignore_ascii_case(email) {
        return Ok(());
    }
    match store.find_by_email(email).await? {
        Some(other) if other.id != by_id.id => Err(ReconcileError::LocalStoreConflict {
            subject_id: identity.subject_id.clone(),
            email: email.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Steps 1 and 2; refreshes `last_active_date` and verification on a match.
async fn find_existing(
    store: &dyn UserStore,
    identity: &VerifiedIdentity,
) -> Result<Option<Resolution>, ReconcileError> {
    if let Some(user) = store.find_by_id(&identity.subject_id).await? {
        ensure_single_owner(store, identity, &user).await?;
        let user = store
            .touch(&user.id, Some(identity.email_verified))
            .await?;
        return Ok(Some(Resolution::Existing(user)));
    }

    if let Some(email) = identity.email.as_deref() {
        if let Some(user) = store.find_by_email(email).await? {
            warn!(
                subject_id = %identity.subject_id,
                user_id = %user.id,
                "Reattaching user row by email; stored id differs from provider subject id"
            );
            let user = store
                .touch(&user.id, Some(identity.email_verified))
                .await?;
            return Ok(Some(Resolution::Reattached(user)));
        }
    }

    Ok(None)
}

/// Login path: find-or-create the local user for a signed-in identity.
pub async fn resolve_login(
    store: &dyn UserStore,
    identity: &VerifiedIdentity,
) -> Result<Resolution, ReconcileError> {
    if let Some(found) = find_existing(store, identity).await? {
        return Ok(found);
    }

    let new_user = new_user(identity)?;
    match store.insert(&new_user).await {
        Ok(user) => {
            info!(user_id = %user.id, "Created user on first login");
            Ok(Resolution::Created(user))
        }
        Err(StoreError::UniqueViolation(key)) => {
            // A concurrent request created the row first; its write is visible now.
            debug!(subject_id = %identity.subject_id, ?key, "Lost user insert race, retrying as lookup");
            find_existing(store, identity)
                .await?
                .ok_or(ReconcileError::Store(StoreError::UniqueViolation(key)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Registration path: idempotent upsert keyed by the subject id.
pub async fn resolve_registration(
    store: &dyn UserStore,
    identity: &VerifiedIdentity,
) -> Result<User, ReconcileError> {
    let new_user = new_user(identity)?;
    match store.upsert_by_id(&new_user).await {
        Ok(user) => Ok(user),
        Err(StoreError::UniqueViolation(UniqueKey::Email)) => Err(ReconcileError::DuplicateEmail(
            format!(
                "Email {} is already linked to another account; log in to link it",
                new_user.email
            ),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Creates the provider account, then persists the local row. A local
/// failure after the provider accepted the account is reported as
/// `RegistrationIncomplete` rather than swallowed.
pub async fn register_account(
    provider: &dyn IdentityProvider,
    store: &dyn UserStore,
    email: &str,
    password: &str,
    metadata: &AccountMetadata,
) -> Result<User, ReconcileError> {
    let identity = provider
        .create_account(email, password, metadata)
        .await
        .map_err(|e| from_provider(e, email))?;
    info!(subject_id = %identity.subject_id, provider = provider.name(), "Provider account created");

    let identity = VerifiedIdentity {
        email: identity.email.or_else(|| Some(email.to_string())),
        ..identity
    };

    match resolve_registration(store, &identity).await {
        Ok(user) => Ok(user),
        Err(err @ ReconcileError::DuplicateEmail(_)) => {
            warn!(subject_id = %identity.subject_id, "Provider account created for an email already stored locally");
            Err(err)
        }
        Err(other) => Err(ReconcileError::RegistrationIncomplete {
            subject_id: identity.subject_id,
            reason: other.to_string(),
        }),
    }
}
