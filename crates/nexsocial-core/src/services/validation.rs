//! Input rules shared by every entry point.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::ProfileUpdate;
use crate::error::DomainError;

pub const MAX_DESCRIPTION_CHARS: usize = 1300;
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_BIO_CHARS: usize = 200;
pub const MAX_LOCATION_CHARS: usize = 100;
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Path segments under `/api/users/` that a username would collide with.
pub const RESERVED_USERNAMES: &[&str] = &["blocked", "block", "follow", "followers", "following"];

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_.]{3,50}$").expect("Invalid username regex"));

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex")
});

static SPECIAL_CHAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("Invalid special char regex"));

/// Lowercase and validate a username.
pub fn normalize_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim().to_lowercase();
    if !USERNAME_REGEX.is_match(&username) {
        return Err(DomainError::Validation(
            "Username must be 3-50 characters of letters, digits, '_' or '.'".to_string(),
        ));
    }
    if RESERVED_USERNAMES.contains(&username.as_str()) {
        return Err(DomainError::Validation(format!(
            "Username '{username}' is reserved"
        )));
    }
    Ok(username)
}

/// Lowercase and validate an email address.
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    if email.len() > 255 || !EMAIL_REGEX.is_match(&email) {
        return Err(DomainError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

/// Strength rules for new passwords.
pub fn validate_password(password: &str) -> Result<(), DomainError> {
    let failure = if password.chars().count() < MIN_PASSWORD_CHARS {
        Some("Password must be at least 8 characters long")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must contain at least one lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one digit")
    } else if !SPECIAL_CHAR_REGEX.is_match(password) {
        Some("Password must contain at least one special character")
    } else {
        None
    };

    match failure {
        Some(msg) => Err(DomainError::Validation(msg.to_string())),
        None => Ok(()),
    }
}

/// Trim a post description; blank becomes `None`.
pub fn clean_description(raw: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(DomainError::Validation(format!(
            "Description cannot exceed {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Comment and reply bodies must have visible content.
pub fn clean_comment(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(
            "Comment text cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(DomainError::Validation(format!(
            "Comment cannot exceed {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), DomainError> {
    if let Some(name) = &update.name {
        let len = name.trim().chars().count();
        if len == 0 || len > MAX_NAME_CHARS {
            return Err(DomainError::Validation(format!(
                "Name must be 1-{MAX_NAME_CHARS} characters"
            )));
        }
    }
    check_max("Bio", update.bio.as_deref(), MAX_BIO_CHARS)?;
    check_max("Location", update.location.as_deref(), MAX_LOCATION_CHARS)?;

    if let Some(website) = update.website.as_deref().map(str::trim)
        && !website.is_empty()
        && !(website.starts_with("http://") || website.starts_with("https://"))
    {
        return Err(DomainError::Validation(
            "Website must be an http(s) URL".to_string(),
        ));
    }
    Ok(())
}

fn check_max(field: &str, value: Option<&str>, max: usize) -> Result<(), DomainError> {
    match value {
        Some(v) if v.trim().chars().count() > max => Err(DomainError::Validation(format!(
            "{field} cannot exceed {max} characters"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_is_lowercased() {
        assert_eq!(normalize_username(" Alice_01 ").unwrap(), "alice_01");
    }

    #[test]
    fn test_username_rejects_bad_input() {
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(normalize_username("emoji🙂").is_err());
        assert!(normalize_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_route_words_are_reserved() {
        for word in ["blocked", "Blocked ", "follow"] {
            assert!(
                matches!(normalize_username(word), Err(DomainError::Validation(msg)) if msg.contains("reserved")),
                "{word}"
            );
        }
        assert_eq!(normalize_username("blocked_bob").unwrap(), "blocked_bob");
    }

    #[test]
    fn test_email_rules() {
        assert_eq!(
            normalize_email("Alice@Example.COM").unwrap(),
            "alice@example.com"
        );
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@b").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password("Str0ng!pass").is_ok());

        let cases = [
            ("S0rt!", "at least 8"),
            ("lowercase1!", "uppercase"),
            ("UPPERCASE1!", "lowercase"),
            ("NoDigits!!", "digit"),
            ("NoSpecial11", "special"),
        ];
        for (password, expected) in cases {
            match validate_password(password) {
                Err(DomainError::Validation(msg)) => {
                    assert!(msg.contains(expected), "{password}: {msg}")
                }
                other => panic!("{password}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_description_limits() {
        assert_eq!(clean_description(Some("  ".into())).unwrap(), None);
        assert_eq!(
            clean_description(Some(" hi ".into())).unwrap(),
            Some("hi".to_string())
        );
        assert!(clean_description(Some("x".repeat(MAX_DESCRIPTION_CHARS + 1))).is_err());
    }

    #[test]
    fn test_comment_must_not_be_blank() {
        assert!(clean_comment(" \n ").is_err());
        assert_eq!(clean_comment(" nice ").unwrap(), "nice");
    }

    #[test]
    fn test_profile_update_rules() {
        let ok = ProfileUpdate {
            name: Some("Alice".into()),
            website: Some("https://alice.dev".into()),
            ..Default::default()
        };
        assert!(validate_profile_update(&ok).is_ok());

        let bad_site = ProfileUpdate {
            website: Some("ftp://alice".into()),
            ..Default::default()
        };
        assert!(validate_profile_update(&bad_site).is_err());

        let long_bio = ProfileUpdate {
            bio: Some("b".repeat(MAX_BIO_CHARS + 1)),
            ..Default::default()
        };
        assert!(validate_profile_update(&long_bio).is_err());
    }
}
