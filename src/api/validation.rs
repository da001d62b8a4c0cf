use super::ApiError;
use crate::services::check_user_name;

/// Sign-in only needs the field filled in. A malformed name simply fails to
/// authenticate like any other unknown one.
pub fn validate_user_name_present(name: &str) -> Result<&str, ApiError> {
    if name.is_empty() {
        return Err(ApiError::validation("Please enter username"));
    }
    Ok(name)
}

/// Required user name for a new account: non-empty, bounded, printable.
pub fn validate_user_name(name: &str) -> Result<&str, ApiError> {
    check_user_name(name)?;
    Ok(name)
}

/// Optional user name for the edit form; empty means "keep the current one".
pub fn validate_new_user_name(name: &str) -> Result<&str, ApiError> {
    if name.is_empty() {
        return Ok(name);
    }

    validate_user_name(name)
}

/// Required password (sign-in and create).
pub fn validate_password_present(pass: &str) -> Result<&str, ApiError> {
    if pass.is_empty() {
        return Err(ApiError::validation("Please enter password"));
    }
    Ok(pass)
}

/// Length policy for passwords being stored. Empty passes: the edit form uses
/// it to mean "unchanged", and the create form checks presence separately.
pub fn validate_new_password(pass: &str, min_len: usize) -> Result<&str, ApiError> {
    if !pass.is_empty() && pass.chars().count() < min_len {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            min_len
        )));
    }
    Ok(pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MAX_USER_NAME_LEN;

    #[test]
    fn user_name_is_required() {
        assert!(validate_user_name("").is_err());
        assert!(validate_user_name("alice").is_ok());
    }

    #[test]
    fn sign_in_name_only_needs_presence() {
        assert!(validate_user_name_present("").is_err());
        assert!(validate_user_name_present(&"x".repeat(MAX_USER_NAME_LEN + 1)).is_ok());
        assert!(validate_user_name_present("ali\nce").is_ok());
    }

    #[test]
    fn user_name_length_is_bounded() {
        let long = "x".repeat(MAX_USER_NAME_LEN + 1);
        assert!(validate_user_name(&long).is_err());
        assert!(validate_user_name(&"x".repeat(MAX_USER_NAME_LEN)).is_ok());
    }

    #[test]
    fn user_name_rejects_control_characters() {
        assert!(validate_user_name("ali\nce").is_err());
        assert!(validate_new_user_name("bo\tb").is_err());
    }

    #[test]
    fn empty_new_user_name_means_unchanged() {
        assert_eq!(validate_new_user_name("").unwrap(), "");
    }

    #[test]
    fn password_policy() {
        assert!(validate_password_present("").is_err());
        assert!(validate_new_password("", 8).is_ok());
        assert!(validate_new_password("short", 8).is_err());
        assert!(validate_new_password("long enough", 8).is_ok());
        assert!(validate_new_password("x", 0).is_ok());
    }
}
