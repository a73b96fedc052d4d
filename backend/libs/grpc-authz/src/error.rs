use crypto_core::{Role, TokenError};
use thiserror::Error;
use tonic::{Code, Status};

/// Why a call was rejected at the authorization boundary
///
/// The variants carry the precise reason for logs and tests. What reaches the
/// caller is the coarse status from [`AuthError::to_status`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no credential provided")]
    MissingCredential,

    #[error("malformed credential")]
    MalformedCredential,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("role {role} not permitted for {method}")]
    RoleNotPermitted { role: Role, method: String },

    #[error("method {0} is not exposed")]
    MethodNotPermitted(String),
}

impl AuthError {
    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            AuthError::MissingCredential => {
                Status::new(Code::Unauthenticated, "no credential provided")
            }
            AuthError::MalformedCredential => {
                Status::new(Code::Unauthenticated, "malformed credential")
            }
            // Every verification failure looks the same from outside
            AuthError::InvalidToken(_) => Status::new(Code::Unauthenticated, "invalid token"),
            AuthError::RoleNotPermitted { .. } => {
                Status::new(Code::PermissionDenied, "role not permitted")
            }
            AuthError::MethodNotPermitted(_) => {
                Status::new(Code::PermissionDenied, "method not permitted")
            }
        }
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        err.to_status()
    }
}
