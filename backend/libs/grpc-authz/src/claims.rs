//! Verified caller identity
//!
//! Built from validated token claims by the server-side interceptor and
//! stored in request extensions for access by service handlers.

use crypto_core::{Claims, Role};
use serde::{Deserialize, Serialize};

/// Identity of the caller behind a verified token
///
/// ## Design Notes
///
/// - Fields are public for direct access (no getter boilerplate)
/// - Cloneable so it can live in both http and tonic request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Username (the token subject)
    pub username: String,

    /// Role granted at login
    pub role: Role,

    /// Issued at timestamp (Unix timestamp)
    pub issued_at: i64,

    /// Expiration timestamp (Unix timestamp)
    pub expires_at: i64,
}

impl CallerIdentity {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check if the caller is the user named `username`
    ///
    /// Useful for "own record" checks:
    ///
    /// ```rust
    /// # use grpc_authz::CallerIdentity;
    /// # use crypto_core::Role;
    /// # let caller = CallerIdentity {
    /// #     username: "alice".to_string(),
    /// #     role: Role::User,
    /// #     issued_at: 0,
    /// #     expires_at: 0,
    /// # };
    /// if !caller.is_subject("bob") && !caller.is_admin() {
    ///     // Return permission denied
    /// }
    /// ```
    pub fn is_subject(&self, username: &str) -> bool {
        self.username == username
    }
}

impl From<Claims> for CallerIdentity {
    fn from(claims: Claims) -> Self {
        Self::from_claims(claims)
    }
}
