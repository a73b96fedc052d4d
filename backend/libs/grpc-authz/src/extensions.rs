//! Request Extension Trait for Caller Identity Access
//!
//! Provides ergonomic helpers for reading the identity the authorization
//! interceptor attached to a call.

use crate::CallerIdentity;
use tonic::{Request, Status};

/// Extension trait for accessing the verified caller from gRPC requests
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_authz::CallerIdentityExt;
/// use tonic::{Request, Response, Status};
///
/// async fn whoami(request: Request<()>) -> Result<Response<String>, Status> {
///     let caller = request.caller()?;
///     Ok(Response::new(caller.username.clone()))
/// }
/// ```
pub trait CallerIdentityExt {
    /// Identity stored by the authorization interceptor
    ///
    /// ## Errors
    ///
    /// Returns `Status::unauthenticated` if no identity is attached, which
    /// happens for methods the policy leaves open.
    fn caller(&self) -> Result<&CallerIdentity, Status>;
}

impl<T> CallerIdentityExt for Request<T> {
    fn caller(&self) -> Result<&CallerIdentity, Status> {
        self.extensions()
            .get::<CallerIdentity>()
            .ok_or_else(|| Status::unauthenticated("no verified caller for this call"))
    }
}
