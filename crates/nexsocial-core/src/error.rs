//! Domain-level error types.

use thiserror::Error;

use crate::ports::{AuthError, CacheError, StorageError};

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Account is locked")]
    Locked,

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    /// A unique key already holds this value.
    #[error("Unique constraint violation: {0}")]
    Unique(String),

    /// A referenced row does not exist.
    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    /// A row failed a CHECK constraint.
    #[error("Check constraint violation: {0}")]
    Check(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => DomainError::not_found("record", "-"),
            RepoError::Unique(msg) => DomainError::Duplicate(msg),
            RepoError::ForeignKey(msg) => DomainError::not_found("related record", msg),
            RepoError::Check(msg) => DomainError::Validation(msg),
            RepoError::Connection(msg) | RepoError::Query(msg) => DomainError::Internal(msg),
        }
    }
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenRevoked
            | AuthError::InvalidToken(_)
            | AuthError::MissingAuth => DomainError::Unauthorized,
            AuthError::InsufficientPermissions => {
                DomainError::Forbidden("Insufficient permissions".to_string())
            }
            AuthError::HashingError(msg) => DomainError::Internal(msg),
        }
    }
}

impl From<CacheError> for DomainError {
    fn from(err: CacheError) -> Self {
        DomainError::Internal(err.to_string())
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => DomainError::not_found("media", key),
            StorageError::InvalidKey(key) => DomainError::Validation(format!("Invalid media key: {key}")),
            StorageError::Io(msg) => DomainError::Internal(msg),
        }
    }
}
