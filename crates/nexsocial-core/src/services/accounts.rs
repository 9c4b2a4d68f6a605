use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::{Profile, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{
    AuthError, Cache, IssuedToken, PasswordService, TokenClaims, TokenService, UserRepository,
};

use super::validation;

/// Cache key marking a token id as logged out.
pub fn revoked_token_key(jti: &str) -> String {
    format!("revoked_token:{jti}")
}

/// Registration form, as submitted.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

/// Account lifecycle: registration, sign-in with lockout, logout.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
    cache: Arc<dyn Cache>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
            cache,
        }
    }

    /// Create a user and its profile, then sign the new user in.
    pub async fn register(&self, input: RegisterInput) -> Result<(User, IssuedToken), DomainError> {
        let username = validation::normalize_username(&input.username)?;
        let email = validation::normalize_email(&input.email)?;
        validation::validate_password(&input.password)?;
        if input.password != input.password2 {
            return Err(DomainError::Validation("Passwords do not match".to_string()));
        }

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(DomainError::Duplicate("Username is already taken".to_string()));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Duplicate("Email is already registered".to_string()));
        }

        let password_hash = self.passwords.hash(&input.password)?;
        let user = User::new(username, email, password_hash);
        let profile = Profile::for_user(&user);
        let (user, _) = self
            .users
            .create_with_profile(user, profile)
            .await
            .map_err(duplicate_account)?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        let token = self.issue(&user)?;
        Ok((user, token))
    }

    /// Verify credentials. Wrong passwords count towards the lockout threshold.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, IssuedToken), DomainError> {
        let username = username.trim().to_lowercase();
        let Some(mut user) = self.users.find_by_username(&username).await? else {
            tracing::debug!(username = %username, "Login for unknown user");
            return Err(DomainError::Unauthorized);
        };

        if user.account_locked {
            tracing::warn!(user_id = %user.id, "Login attempt on locked account");
            return Err(DomainError::Locked);
        }
        if !user.is_active {
            return Err(DomainError::Forbidden("Account is inactive".to_string()));
        }

        if !self.passwords.verify(password, &user.password_hash)? {
            let locked = user.record_failed_login();
            let attempts = user.failed_login_attempts;
            self.users.save(user.clone()).await?;
            if locked {
                tracing::warn!(user_id = %user.id, attempts, "Account locked after failed logins");
                return Err(DomainError::Locked);
            }
            tracing::info!(user_id = %user.id, attempts, "Failed login");
            return Err(DomainError::Unauthorized);
        }

        user.record_successful_login();
        let user = self.users.save(user).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        let token = self.issue(&user)?;
        Ok((user, token))
    }

    /// Deny the presented token for the rest of its lifetime.
    pub async fn logout(&self, claims: &TokenClaims) -> Result<(), DomainError> {
        let ttl = claims.remaining_seconds().max(1);
        self.cache
            .set(
                &revoked_token_key(&claims.jti),
                "1",
                Some(Duration::from_secs(ttl)),
            )
            .await?;
        tracing::info!(user_id = %claims.user_id, "User logged out");
        Ok(())
    }

    /// Decode a bearer token and reject it if it was logged out.
    pub async fn authenticate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.tokens.validate_token(token)?;
        if self.cache.exists(&revoked_token_key(&claims.jti)).await {
            return Err(AuthError::TokenRevoked);
        }
        Ok(claims)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::Unauthorized)
    }

    fn issue(&self, user: &User) -> Result<IssuedToken, DomainError> {
        let access_token = self
            .tokens
            .generate_token(user.id, &user.username, user.roles())?;
        Ok(IssuedToken {
            access_token,
            expires_in: self.tokens.expiration_seconds().max(0) as u64,
        })
    }
}

fn duplicate_account(err: RepoError) -> DomainError {
    match err {
        RepoError::Unique(_) => {
            DomainError::Duplicate("Username or email is already registered".to_string())
        }
        other => other.into(),
    }
}
