//! Domain service owning the user table.
//!
//! Authenticates name/password pairs and exposes create, read, update and
//! delete over the single user store. Raw passwords never leave this layer:
//! they are hashed before persistence and only compared through the
//! configured [`PasswordScheme`](crate::services::PasswordScheme).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to credential operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No user with the given name (authentication only).
    #[error("User not found")]
    NotFound,

    /// No user with the given id.
    #[error("User with id {0} not found")]
    IdNotFound(i32),

    #[error("Invalid password")]
    InvalidPassword,

    /// The name breaks the shape rules of [`check_user_name`].
    #[error("{0}")]
    InvalidName(String),

    #[error("User with name '{0}' already exists")]
    NameTaken(String),

    /// The pre-check passed but the storage UNIQUE constraint rejected the
    /// write, i.e. another request claimed the name in between.
    #[error("User name '{0}' was claimed concurrently")]
    ConcurrentNameConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CredentialError {
    /// True for the two authentication failures that must be reported to
    /// clients as a single generic message.
    #[must_use]
    pub const fn is_bad_credentials(&self) -> bool {
        matches!(self, Self::NotFound | Self::InvalidPassword)
    }

    /// True for both the pre-checked and the constraint-detected name clash.
    #[must_use]
    pub const fn is_name_conflict(&self) -> bool {
        matches!(self, Self::NameTaken(_) | Self::ConcurrentNameConflict(_))
    }
}

impl From<sea_orm::DbErr> for CredentialError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CredentialError {
    fn from(err: anyhow::Error) -> Self {
        let from_storage = err
            .chain()
            .any(|cause| cause.downcast_ref::<sea_orm::DbErr>().is_some());

        if from_storage {
            Self::Database(format!("{err:#}"))
        } else {
            Self::Internal(err.to_string())
        }
    }
}

/// Longest accepted user name, in characters.
pub const MAX_USER_NAME_LEN: usize = 64;

/// Shape rules for every stored user name, whichever front end writes it.
///
/// # Errors
///
/// Returns [`CredentialError::InvalidName`] for an empty name, one longer than
/// [`MAX_USER_NAME_LEN`], or one containing control characters.
pub fn check_user_name(name: &str) -> Result<(), CredentialError> {
    if name.is_empty() {
        return Err(CredentialError::InvalidName(
            "Please enter username".to_string(),
        ));
    }

    if name.chars().count() > MAX_USER_NAME_LEN {
        return Err(CredentialError::InvalidName(format!(
            "Username must be {MAX_USER_NAME_LEN} characters or less"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(CredentialError::InvalidName(
            "Username cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Snapshot of an authenticated user, held by a session.
///
/// It may go stale (the user can be renamed or deleted after login), so it
/// has to be revalidated with [`CredentialService::is_identity_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i32,
    pub name: String,
}

/// Full user row as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    pub password_hash: String,
}

impl From<crate::db::UserRow> for UserRecord {
    fn from(row: crate::db::UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            password_hash: row.password_hash,
        }
    }
}

/// Domain service trait for the credential store.
#[async_trait::async_trait]
pub trait CredentialService: Send + Sync {
    /// Looks up `name` and checks `password` against the stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::NotFound`] for an unknown name and
    /// [`CredentialError::InvalidPassword`] for a hash mismatch.
    async fn authenticate(&self, name: &str, password: &str) -> Result<Identity, CredentialError>;

    /// Total number of users.
    async fn count(&self) -> Result<u64, CredentialError>;

    /// True while no user exists; gates the first-run bootstrap.
    async fn is_empty(&self) -> Result<bool, CredentialError> {
        Ok(self.count().await? == 0)
    }

    /// Every user, in insertion order.
    async fn list_users(&self) -> Result<Vec<UserRecord>, CredentialError>;

    /// # Errors
    ///
    /// Returns [`CredentialError::IdNotFound`] if no such user exists.
    async fn get_user_name(&self, id: i32) -> Result<String, CredentialError>;

    async fn user_exists(&self, name: &str) -> Result<bool, CredentialError>;

    /// Creates a user and returns the new id.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidName`] if `name` fails
    /// [`check_user_name`], [`CredentialError::NameTaken`] if it is in use, or
    /// [`CredentialError::ConcurrentNameConflict`] if it was taken between the
    /// check and the insert.
    async fn user_create(&self, name: &str, password: &str) -> Result<i32, CredentialError>;

    /// Partial update. An empty `new_name` or `new_password` leaves that field
    /// unchanged, as does a name equal to the current one. Nothing is written
    /// when neither field changes.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::IdNotFound`] for an unknown id,
    /// [`CredentialError::InvalidName`] for a malformed new name, and a name
    /// conflict error when `new_name` belongs to another user.
    async fn change_credentials(
        &self,
        id: i32,
        new_name: &str,
        new_password: &str,
    ) -> Result<(), CredentialError>;

    /// # Errors
    ///
    /// Returns [`CredentialError::IdNotFound`] if no such user exists.
    async fn delete_user(&self, id: i32) -> Result<(), CredentialError>;

    /// An identity is valid while its row exists and still carries the same name.
    async fn is_identity_valid(&self, identity: &Identity) -> Result<bool, CredentialError>;
}
