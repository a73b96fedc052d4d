/// Credential storage for identity service
///
/// The service only talks to storage through [`CredentialStore`]; which
/// backend sits behind it is decided once at startup by `app::connect_store`.
pub mod memory;
pub mod users;

use crate::models::{NewUser, ProfileUpdate, User};
use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryUserStore;
pub use users::PgUserStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No row for the given id
    #[error("record not found")]
    NotFound,

    /// Username or email uniqueness violated
    #[error("record already exists")]
    AlreadyExists,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// User record storage consumed by login and user management
///
/// Lookups by username/email return `Ok(None)` for absent users; mutations
/// keyed by id return `StoreError::NotFound` when the id does not exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find(&self, id: i32) -> Result<Option<User>, StoreError>;

    async fn update(&self, id: i32, profile: ProfileUpdate) -> Result<(), StoreError>;

    async fn delete(&self, id: i32) -> Result<(), StoreError>;

    async fn update_password(&self, id: i32, password_hash: String) -> Result<(), StoreError>;

    async fn toggle_admin(&self, id: i32) -> Result<(), StoreError>;

    async fn toggle_active(&self, id: i32) -> Result<(), StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}
