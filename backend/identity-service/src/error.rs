use crate::db::StoreError;
use crypto_core::TokenError;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown username, wrong password or inactive account. One variant for
    /// all three so callers cannot tell them apart.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Current password does not match")]
    CurrentPasswordMismatch,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation timed out")]
    DeadlineExceeded,

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            IdentityError::Validation(msg) => Status::new(Code::InvalidArgument, msg.clone()),
            IdentityError::InvalidCredentials => {
                Status::new(Code::NotFound, "incorrect username/password")
            }
            IdentityError::UserNotFound => Status::new(Code::NotFound, "user not found"),
            IdentityError::UserAlreadyExists => {
                Status::new(Code::AlreadyExists, "user already exists")
            }
            IdentityError::CurrentPasswordMismatch => {
                Status::new(Code::InvalidArgument, "current password does not match")
            }
            IdentityError::PermissionDenied(msg) => {
                Status::new(Code::PermissionDenied, msg.clone())
            }
            IdentityError::DeadlineExceeded => {
                Status::new(Code::DeadlineExceeded, "request timed out")
            }
            IdentityError::Token(_) => Status::new(Code::Internal, "failed to generate token"),
            IdentityError::Store(_)
            | IdentityError::PasswordHash(_)
            | IdentityError::Internal(_) => {
                // Don't leak internal details in production
                Status::new(Code::Internal, "Internal server error")
            }
        }
    }
}

// Conversions from external error types
impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => IdentityError::UserNotFound,
            StoreError::AlreadyExists => IdentityError::UserAlreadyExists,
            StoreError::Backend(msg) => {
                tracing::error!("Credential store error: {}", msg);
                IdentityError::Store(msg)
            }
        }
    }
}

impl From<tokio::task::JoinError> for IdentityError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {}", err);
        IdentityError::Internal(err.to_string())
    }
}

// gRPC Status conversion
impl From<IdentityError> for Status {
    fn from(err: IdentityError) -> Self {
        err.to_status()
    }
}
