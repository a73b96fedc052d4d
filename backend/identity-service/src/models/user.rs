use chrono::{DateTime, Utc};
use crypto_core::Role;
use serde::Serialize;
use sqlx::FromRow;

/// User model - core identity entity
///
/// `password_hash` is a PHC string and never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Role carried in tokens issued for this user
    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }
}

/// Fields required to insert a user; the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
}

/// Profile fields a user may change about themselves
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
}
