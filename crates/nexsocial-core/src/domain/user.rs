use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failed password attempts before an account is locked.
pub const MAX_FAILED_LOGINS: i32 = 5;

/// User entity - an account that can sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub failed_login_attempts: i32,
    pub account_locked: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with generated ID and timestamps.
    ///
    /// `username` and `email` are expected to be normalised already.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            is_active: true,
            is_admin: false,
            failed_login_attempts: 0,
            account_locked: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account may sign in at all.
    pub fn can_login(&self) -> bool {
        self.is_active && !self.account_locked
    }

    /// Register a wrong password. Returns `true` if this attempt locked the account.
    pub fn record_failed_login(&mut self) -> bool {
        self.failed_login_attempts += 1;
        self.updated_at = Utc::now();
        if self.failed_login_attempts >= MAX_FAILED_LOGINS && !self.account_locked {
            self.account_locked = true;
            return true;
        }
        false
    }

    pub fn record_successful_login(&mut self) {
        let now = Utc::now();
        self.failed_login_attempts = 0;
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn roles(&self) -> Vec<String> {
        if self.is_admin {
            vec!["user".to_string(), "admin".to_string()]
        } else {
            vec!["user".to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new("alice".into(), "alice@example.com".into(), "hash".into())
    }

    #[test]
    fn test_locks_after_max_failures() {
        let mut user = user();
        for _ in 0..MAX_FAILED_LOGINS - 1 {
            assert!(!user.record_failed_login());
        }
        assert!(user.record_failed_login());
        assert!(user.account_locked);
        assert!(!user.can_login());
    }

    #[test]
    fn test_successful_login_resets_counter() {
        let mut user = user();
        user.record_failed_login();
        user.record_failed_login();
        user.record_successful_login();

        assert_eq!(user.failed_login_attempts, 0);
        assert!(user.last_login_at.is_some());
    }

    #[test]
    fn test_admin_roles() {
        let mut user = user();
        assert_eq!(user.roles(), vec!["user".to_string()]);
        user.is_admin = true;
        assert!(user.roles().contains(&"admin".to_string()));
    }
}
