pub mod password;
pub use password::{Argon2Scheme, PasswordScheme};

pub mod credential_service;
pub mod credential_service_impl;
pub use credential_service::{
    CredentialError, CredentialService, Identity, MAX_USER_NAME_LEN, UserRecord, check_user_name,
};
pub use credential_service_impl::SeaOrmCredentialService;
