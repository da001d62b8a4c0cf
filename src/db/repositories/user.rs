use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};

use crate::entities::users;

/// A stored user row, including the password hash.
///
/// Only the credential service sees this type; the HTTP layer maps it to a
/// hash-free DTO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub password_hash: String,
}

impl From<users::Model> for UserRow {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            password_hash: model.pass,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<UserRow>> {
        let user = users::Entity::find()
            .filter(users::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query user by name")?;

        Ok(user.map(UserRow::from))
    }

    /// Get user by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<UserRow>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(UserRow::from))
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    /// All users in insertion order
    pub async fn list(&self) -> Result<Vec<UserRow>> {
        let rows = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(UserRow::from).collect())
    }

    /// Insert a new user; the caller supplies an already hashed password.
    pub async fn insert(&self, name: &str, password_hash: &str) -> Result<UserRow> {
        let active = users::ActiveModel {
            name: Set(name.to_string()),
            pass: Set(password_hash.to_string()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .with_context(|| format!("Failed to insert user '{name}'"))?;

        Ok(model.into())
    }

    /// Write the given fields of an existing row. `None` leaves a column untouched.
    ///
    /// Returns `false` when no row with `id` exists.
    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<bool> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = name {
            active.name = Set(name.to_string());
        }
        if let Some(hash) = password_hash {
            active.pass = Set(hash.to_string());
        }

        active
            .update(&self.conn)
            .await
            .with_context(|| format!("Failed to update user {id}"))?;

        Ok(true)
    }

    /// Delete by ID. Returns `false` when nothing was deleted.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to delete user {id}"))?;

        Ok(result.rows_affected > 0)
    }
}

/// Whether a repository error was caused by the storage-level UNIQUE constraint.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<DbErr>())
        .any(|db_err| matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))))
}
