//! Admin authentication service.
//!
//! Sign-in goes through an [`IdentityProvider`]; authorization is a
//! separate role lookup in [`RoleDirectory`]. A signed-in account without
//! an admin role is signed straight back out.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use modern_shop_core::docstore::{SharedDocumentStore, to_fields};
use modern_shop_core::identity::{
    AuthUser, LEGACY_ROLES_COLLECTION, ROLES_COLLECTION, RoleRecord, USERS_COLLECTION, UserRecord,
};
use modern_shop_core::{Email, Role, UserId};
use tracing::instrument;

use crate::models::CurrentAdmin;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: AuthUser,
}

/// Something that can verify credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify credentials and open a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// End a session opened by [`sign_in`](Self::sign_in).
    async fn sign_out(&self, session: &AuthSession);
}

/// Identity provider backed by argon2 hashes in the `users` collection.
#[derive(Clone)]
pub struct PasswordIdentityProvider {
    documents: SharedDocumentStore,
}

impl PasswordIdentityProvider {
    #[must_use]
    pub const fn new(documents: SharedDocumentStore) -> Self {
        Self { documents }
    }

    /// Find a user by email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Documents` if the store fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, AuthError> {
        let documents = self.documents.list(USERS_COLLECTION).await?;
        Ok(documents
            .iter()
            .filter_map(|doc| match doc.decode::<UserRecord>(USERS_COLLECTION) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!(id = %doc.id, error = %e, "Skipping unreadable user record");
                    None
                }
            })
            .find(|user| user.email.as_str().eq_ignore_ascii_case(email.as_str())))
    }

    /// Create a password user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short,
    /// `AuthError::UserAlreadyExists` if the email is taken.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn create_user(
        &self,
        email: &Email,
        password: &str,
        role: Role,
    ) -> Result<UserRecord, AuthError> {
        validate_password(password)?;
        if self.find_by_email(email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let user = UserRecord {
            id: UserId::generate(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            role,
            is_admin: role == Role::Admin,
            created_at: Utc::now(),
        };
        self.documents
            .set(USERS_COLLECTION, user.id.as_str(), to_fields(&user)?)
            .await?;
        tracing::info!(uid = %user.id, "User created");
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for PasswordIdentityProvider {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &user.password_hash)?;

        Ok(AuthSession {
            user: AuthUser {
                uid: user.id,
                email: user.email,
                role: user.role,
                is_admin: user.is_admin,
            },
        })
    }

    async fn sign_out(&self, session: &AuthSession) {
        tracing::debug!(uid = %session.user.uid, "Signed out");
    }
}

/// Role documents keyed by user id.
#[derive(Clone)]
pub struct RoleDirectory {
    documents: SharedDocumentStore,
}

impl RoleDirectory {
    #[must_use]
    pub const fn new(documents: SharedDocumentStore) -> Self {
        Self { documents }
    }

    /// Whether `uid` holds the admin role.
    ///
    /// Either collection may grant it; the legacy one is only read when
    /// the canonical record is missing or grants some other role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Documents` if the store fails.
    #[instrument(skip(self))]
    pub async fn is_admin(&self, uid: &UserId) -> Result<bool, AuthError> {
        if self
            .role_record(ROLES_COLLECTION, uid)
            .await?
            .is_some_and(|record| record.grants_admin())
        {
            return Ok(true);
        }
        let legacy = self
            .role_record(LEGACY_ROLES_COLLECTION, uid)
            .await?
            .is_some_and(|record| record.grants_admin());
        if legacy {
            tracing::warn!(
                uid = %uid,
                collection = LEGACY_ROLES_COLLECTION,
                "Admin role granted by legacy collection"
            );
        }
        Ok(legacy)
    }

    /// Write the canonical admin role document for `uid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Documents` if the store fails.
    pub async fn grant_admin(&self, uid: &UserId, email: &Email) -> Result<(), AuthError> {
        let record = RoleRecord::admin(email.clone());
        self.documents
            .set(ROLES_COLLECTION, uid.as_str(), to_fields(&record)?)
            .await?;
        Ok(())
    }

    async fn role_record(
        &self,
        collection: &str,
        uid: &UserId,
    ) -> Result<Option<RoleRecord>, AuthError> {
        let Some(doc) = self.documents.get(collection, uid.as_str()).await? else {
            return Ok(None);
        };
        match doc.decode::<RoleRecord>(collection) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(uid = %uid, collection, error = %e, "Unreadable role record");
                Ok(None)
            }
        }
    }
}

/// Sign in and require the admin role.
///
/// A valid account without the role is signed out again before returning
/// `AuthError::NotAdministrator`.
///
/// # Errors
///
/// Returns the identity provider's error, or `AuthError::NotAdministrator`.
pub async fn admin_sign_in(
    identity: &dyn IdentityProvider,
    roles: &RoleDirectory,
    email: &str,
    password: &str,
) -> Result<CurrentAdmin, AuthError> {
    let session = identity.sign_in(email, password).await?;
    if !roles.is_admin(&session.user.uid).await? {
        identity.sign_out(&session).await;
        tracing::warn!(uid = %session.user.uid, "Sign-in refused, not an administrator");
        return Err(AuthError::NotAdministrator);
    }

    tracing::info!(uid = %session.user.uid, "Admin signed in");
    Ok(CurrentAdmin {
        uid: session.user.uid,
        email: session.user.email,
    })
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
