//! Per-call Authentication and Authorization for gRPC Services
//!
//! Every incoming call is classified against a per-method access policy and
//! the caller's bearer token before any handler code runs.
//!
//! ## Core Components
//!
//! - **AccessPolicy**: method path → permitted roles, with default-allow or default-deny
//! - **AuthorizationInterceptor**: lookup → credential check → token verify → role check
//! - **AuthorizationLayer**: tower layer applying the interceptor to a tonic server
//! - **TokenClientInterceptor**: attaches the token to outgoing calls
//! - **CallerIdentityExt**: handler-side access to the verified identity
//!
//! ## Decision Flow
//!
//! | Step          | Outcome on failure                           |
//! |---------------|----------------------------------------------|
//! | MethodLookup  | unlisted → allow (or deny under default-deny) |
//! | MetadataCheck | `Unauthenticated`                            |
//! | TokenVerify   | `Unauthenticated` ("invalid token")          |
//! | RoleCheck     | `PermissionDenied`                           |
//!
//! ## Server Side
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::Duration;
//! use crypto_core::{Role, TokenManager};
//! use grpc_authz::{AccessPolicy, AuthorizationInterceptor, AuthorizationLayer};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = Arc::new(TokenManager::new(b"secret", Duration::minutes(15))?);
//! let policy = AccessPolicy::builder()
//!     .allow("/qaengine.UserService/DeleteUser", [Role::Admin])
//!     .public("/qaengine.AuthService/Login")
//!     .build()?;
//!
//! let layer = AuthorizationLayer::new(AuthorizationInterceptor::new(tokens, policy.into()));
//! // Server::builder().layer(layer).add_service(...)
//! # let _ = layer;
//! # Ok(())
//! # }
//! ```

mod claims;
mod client;
mod error;
mod extensions;
mod layer;
mod policy;
mod server;

pub use claims::CallerIdentity;
pub use client::TokenClientInterceptor;
pub use error::AuthError;
pub use extensions::CallerIdentityExt;
pub use layer::{AuthorizationLayer, AuthorizationService};
pub use policy::{
    AccessPolicy, AccessPolicyBuilder, DefaultAction, MethodAccess, PolicyDocument, PolicyError,
    SharedAccessPolicy,
};
pub use server::{AuthorizationInterceptor, AUTHORIZATION_KEY};

// Re-export tonic Status for convenience
pub use tonic::Status;
