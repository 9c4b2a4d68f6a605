//! # NexSocial Core
//!
//! Domain layer of the NexSocial backend: entities, ports and the rule
//! services that enforce the follow / feed / interaction invariants.
//! Nothing in here talks to a database, a socket or the file system directly.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, RepoError};
