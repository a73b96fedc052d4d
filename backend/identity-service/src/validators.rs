//! Input validation utilities for identity service
//!
//! Every check runs in a fixed order and reports only the first failing
//! rule, so the same bad input always yields the same message.

use crate::error::{IdentityError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 12;

// Compile regex patterns once at startup
// These patterns are hardcoded and always valid, so we use expect() with explicit reasoning
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is hardcoded and validated - it is a compile-time constant in practice
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("hardcoded email regex is invalid - fix source code")
});

fn invalid(msg: &str) -> IdentityError {
    IdentityError::Validation(msg.to_string())
}

/// Validate email format (HTML5 living standard shape)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Login request shape
///
/// Order: username-empty, password-empty, too-short, too-long.
pub fn validate_login(username: &str, password: &str) -> Result<()> {
    if username.is_empty() {
        return Err(invalid("username is required"));
    }
    if password.is_empty() {
        return Err(invalid("password is required"));
    }
    validate_password_length(password, "password")
}

/// Length bounds for a password field, counted in UTF-8 bytes
fn validate_password_length(password: &str, field: &str) -> Result<()> {
    let len = password.len();
    if len < MIN_PASSWORD_LEN {
        return Err(IdentityError::Validation(format!(
            "{field} must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(IdentityError::Validation(format!(
            "{field} must be at most {MAX_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

/// Fields of a user being created
#[derive(Debug, Clone, Copy)]
pub struct UserFields<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
}

/// Name fields a user may change on their own record
pub fn validate_profile(first_name: &str, last_name: &str) -> Result<()> {
    if first_name.is_empty() {
        return Err(invalid("first name is required"));
    }
    if last_name.is_empty() {
        return Err(invalid("last name is required"));
    }
    Ok(())
}

/// All identity fields of a user record
pub fn validate_user_fields(user: &UserFields<'_>) -> Result<()> {
    validate_profile(user.first_name, user.last_name)?;
    if user.username.is_empty() {
        return Err(invalid("username is required"));
    }
    if user.email.is_empty() {
        return Err(invalid("email is required"));
    }
    if !validate_email(user.email) {
        return Err(invalid("invalid email address"));
    }
    Ok(())
}

/// New account: profile fields, then the initial password
pub fn validate_new_user(user: &UserFields<'_>, password: &str) -> Result<()> {
    validate_user_fields(user)?;
    if password.is_empty() {
        return Err(invalid("password is required"));
    }
    validate_password_length(password, "password")
}

pub fn validate_password_change(new_password: &str, retype_new_password: &str) -> Result<()> {
    validate_password_length(new_password, "new password")?;
    if new_password != retype_new_password {
        return Err(invalid("new password does not match with retype new password"));
    }
    Ok(())
}

pub fn validate_user_id(id: i32) -> Result<()> {
    if id <= 0 {
        return Err(invalid("invalid user id given"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<()>) -> String {
        match result {
            Err(IdentityError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_email() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("test.user+tag@sub.example.co.uk"));
    }

    #[test]
    fn test_invalid_email() {
        assert!(!validate_email("invalid"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email("user@-example.com"));
    }

    #[test]
    fn test_login_rule_order() {
        // Both fields empty: the username rule wins
        assert_eq!(message(validate_login("", "")), "username is required");
        assert_eq!(message(validate_login("alice", "")), "password is required");
        assert_eq!(
            message(validate_login("alice", "abcde")),
            "password must be at least 6 characters long"
        );
        assert_eq!(
            message(validate_login("alice", "abcdefghijklm")),
            "password must be at most 12 characters long"
        );
    }

    #[test]
    fn test_login_bounds_inclusive() {
        assert!(validate_login("alice", "abcdef").is_ok());
        assert!(validate_login("alice", "abcdefghijkl").is_ok());
    }

    #[test]
    fn test_password_length_counts_bytes() {
        // Five characters, ten bytes
        assert!(validate_login("alice", "ééééé").is_ok());
        // Seven characters, fourteen bytes
        assert_eq!(
            message(validate_login("alice", "ééééééé")),
            "password must be at most 12 characters long"
        );
        // Three characters, nine bytes
        assert!(validate_login("alice", "€€€").is_ok());
        assert_eq!(
            message(validate_login("alice", "éé")),
            "password must be at least 6 characters long"
        );
    }

    #[test]
    fn test_new_user_rule_order() {
        let mut fields = UserFields {
            first_name: "",
            last_name: "",
            username: "",
            email: "",
        };
        assert_eq!(message(validate_new_user(&fields, "")), "first name is required");

        fields.first_name = "Alice";
        assert_eq!(message(validate_new_user(&fields, "")), "last name is required");

        fields.last_name = "Liddell";
        assert_eq!(message(validate_new_user(&fields, "")), "username is required");

        fields.username = "alice";
        assert_eq!(message(validate_new_user(&fields, "")), "email is required");

        fields.email = "not-an-email";
        assert_eq!(message(validate_new_user(&fields, "")), "invalid email address");

        fields.email = "alice@example.com";
        assert_eq!(message(validate_new_user(&fields, "")), "password is required");
        assert_eq!(
            message(validate_new_user(&fields, "abc")),
            "password must be at least 6 characters long"
        );
        assert!(validate_new_user(&fields, "secret1").is_ok());
    }

    #[test]
    fn test_profile() {
        assert_eq!(message(validate_profile("", "L")), "first name is required");
        assert_eq!(message(validate_profile("A", "")), "last name is required");
        assert!(validate_profile("A", "L").is_ok());
    }

    #[test]
    fn test_password_change() {
        assert_eq!(
            message(validate_password_change("abc", "abc")),
            "new password must be at least 6 characters long"
        );
        assert_eq!(
            message(validate_password_change("secret1", "secret2")),
            "new password does not match with retype new password"
        );
        assert!(validate_password_change("secret1", "secret1").is_ok());
    }

    #[test]
    fn test_user_id() {
        assert!(validate_user_id(1).is_ok());
        assert_eq!(message(validate_user_id(0)), "invalid user id given");
        assert!(validate_user_id(-4).is_err());
    }
}
