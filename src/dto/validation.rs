use std::borrow::Cow;

use validator::ValidationError;

/// Longest username accepted anywhere on the HTTP surface.
const USERNAME_MAX_LENGTH: usize = 32;

/// Validate a username: non-blank, bounded, no control characters.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(error("username_blank", "username must not be blank"));
    }
    if username.len() > USERNAME_MAX_LENGTH {
        return Err(error("username_too_long", "username is too long"));
    }
    if username.chars().any(char::is_control) {
        return Err(error(
            "username_control_chars",
            "username must not contain control characters",
        ));
    }
    Ok(())
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_usernames() {
        assert!(validate_username("Alice").is_ok());
        assert!(validate_username("bob_42").is_ok());
    }

    #[test]
    fn rejects_blank_and_oversized() {
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username(&"x".repeat(USERNAME_MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(validate_username("al\nice").is_err());
    }
}
