use serde::{Deserialize, Serialize};

use crate::services::{Identity, UserRecord};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

/// Sign-in and create-user form. Both fields are required.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pass: String,
}

/// Edit form. An empty field leaves that credential unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct EditUserForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pass: String,
}

// ============================================================================
// Page payloads
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HomepageDto {
    pub is_empty: bool,
}

#[derive(Debug, Serialize)]
pub struct SignInPageDto {
    pub fields: [&'static str; 2],
}

impl Default for SignInPageDto {
    fn default() -> Self {
        Self {
            fields: ["name", "pass"],
        }
    }
}

/// The signed-in user as shown on protected pages.
#[derive(Debug, Serialize)]
pub struct CurrentUserDto {
    pub user_id: i32,
    pub username: String,
}

impl From<Identity> for CurrentUserDto {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.id,
            username: identity.name,
        }
    }
}

/// A listed user. The password hash is deliberately absent.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
}

impl From<UserRecord> for UserDto {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListDto {
    pub current: CurrentUserDto,
    pub users: Vec<UserDto>,
}

#[derive(Debug, Serialize)]
pub struct CreateUserPageDto {
    pub is_empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentUserDto>,
}

#[derive(Debug, Serialize)]
pub struct EditUserPageDto {
    pub edit_id: i32,
    pub name: String,
    pub is_empty: bool,
    pub current: CurrentUserDto,
}
