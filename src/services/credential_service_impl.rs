//! `SeaORM` implementation of the `CredentialService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::db::{Store, is_unique_violation};
use crate::services::credential_service::{
    CredentialError, CredentialService, Identity, UserRecord, check_user_name,
};
use crate::services::password::{PasswordScheme, hash_blocking, verify_blocking};

pub struct SeaOrmCredentialService {
    store: Store,
    passwords: Arc<dyn PasswordScheme>,
}

impl SeaOrmCredentialService {
    #[must_use]
    pub fn new(store: Store, passwords: Arc<dyn PasswordScheme>) -> Self {
        Self { store, passwords }
    }

    /// Maps a storage UNIQUE failure on `name` to the concurrent-conflict kind.
    fn classify_write_error(err: anyhow::Error, name: &str) -> CredentialError {
        if is_unique_violation(&err) {
            warn!(name, "Name claimed concurrently; storage constraint rejected write");
            CredentialError::ConcurrentNameConflict(name.to_string())
        } else {
            CredentialError::from(err)
        }
    }
}

#[async_trait]
impl CredentialService for SeaOrmCredentialService {
    async fn authenticate(&self, name: &str, password: &str) -> Result<Identity, CredentialError> {
        let user = self
            .store
            .get_user_by_name(name)
            .await?
            .ok_or(CredentialError::NotFound)?;

        let is_valid =
            verify_blocking(self.passwords.clone(), password, &user.password_hash).await?;

        if !is_valid {
            debug!(user_id = user.id, "Password verification failed");
            return Err(CredentialError::InvalidPassword);
        }

        Ok(Identity {
            id: user.id,
            name: user.name,
        })
    }

    async fn count(&self) -> Result<u64, CredentialError> {
        Ok(self.store.user_count().await?)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, CredentialError> {
        let rows = self.store.list_users().await?;
        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn get_user_name(&self, id: i32) -> Result<String, CredentialError> {
        self.store
            .get_user_by_id(id)
            .await?
            .map(|user| user.name)
            .ok_or(CredentialError::IdNotFound(id))
    }

    async fn user_exists(&self, name: &str) -> Result<bool, CredentialError> {
        Ok(self.store.get_user_by_name(name).await?.is_some())
    }

    async fn user_create(&self, name: &str, password: &str) -> Result<i32, CredentialError> {
        check_user_name(name)?;

        if self.user_exists(name).await? {
            return Err(CredentialError::NameTaken(name.to_string()));
        }

        let hash = hash_blocking(self.passwords.clone(), password).await?;

        let user = self
            .store
            .insert_user(name, &hash)
            .await
            .map_err(|e| Self::classify_write_error(e, name))?;

        info!(user_id = user.id, name = %user.name, "User created");
        Ok(user.id)
    }

    async fn change_credentials(
        &self,
        id: i32,
        new_name: &str,
        new_password: &str,
    ) -> Result<(), CredentialError> {
        let current = self
            .store
            .get_user_by_id(id)
            .await?
            .ok_or(CredentialError::IdNotFound(id))?;

        let name = (!new_name.is_empty() && new_name != current.name).then_some(new_name);
        let password_changed = !new_password.is_empty();

        if name.is_none() && !password_changed {
            debug!(user_id = id, "No credential change requested; skipping write");
            return Ok(());
        }

        if let Some(name) = name {
            check_user_name(name)?;

            if self.user_exists(name).await? {
                return Err(CredentialError::NameTaken(name.to_string()));
            }
        }

        let hash = if password_changed {
            Some(hash_blocking(self.passwords.clone(), new_password).await?)
        } else {
            None
        };

        let updated = self
            .store
            .update_user(id, name, hash.as_deref())
            .await
            .map_err(|e| Self::classify_write_error(e, name.unwrap_or(current.name.as_str())))?;

        // Deleted between the lookup and the write.
        if !updated {
            return Err(CredentialError::IdNotFound(id));
        }

        info!(
            user_id = id,
            renamed = name.is_some(),
            password_changed,
            "User credentials changed"
        );
        Ok(())
    }

    async fn delete_user(&self, id: i32) -> Result<(), CredentialError> {
        if !self.store.delete_user(id).await? {
            return Err(CredentialError::IdNotFound(id));
        }

        info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn is_identity_valid(&self, identity: &Identity) -> Result<bool, CredentialError> {
        let user = self.store.get_user_by_id(identity.id).await?;
        Ok(user.is_some_and(|u| u.name == identity.name))
    }
}
