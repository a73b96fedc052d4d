//! Server-side Authorization Interceptor
//!
//! Classifies every incoming call against the access policy and the caller's
//! bearer token, then either forwards it or rejects it before any handler
//! code runs.

use crate::claims::CallerIdentity;
use crate::error::AuthError;
use crate::policy::{MethodAccess, SharedAccessPolicy};
use chrono::{DateTime, Utc};
use crypto_core::TokenManager;
use std::future::Future;
use std::sync::Arc;
use tonic::metadata::MetadataMap;
use tonic::{Request, Status};
use tracing::{debug, warn};

/// Metadata key carrying the raw bearer token
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Call-boundary gate: policy lookup → credential check → token verify → role check
///
/// The same evaluation runs for unary and streaming calls. For streams it runs
/// once, when the call is established, never per message.
///
/// ## Design
///
/// - **Stateless**: holds only the token manager and a policy handle
/// - **Single pass**: the policy is snapshotted once per call
/// - **Coarse errors**: every token failure becomes the same `Unauthenticated`
/// - **Structured logging**: denials logged at WARN with the precise reason
///
/// ## Usage
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use chrono::Duration;
/// use crypto_core::{Role, TokenManager};
/// use grpc_authz::{AccessPolicy, AuthorizationInterceptor, AuthorizationLayer};
///
/// let tokens = Arc::new(TokenManager::new(b"secret", Duration::minutes(15)).unwrap());
/// let policy = AccessPolicy::builder()
///     .allow("/qaengine.UserService/DeleteUser", [Role::Admin])
///     .build()
///     .unwrap();
/// let interceptor = AuthorizationInterceptor::new(tokens, policy.into());
///
/// // tonic::transport::Server::builder().layer(AuthorizationLayer::new(interceptor))
/// let _layer = AuthorizationLayer::new(interceptor);
/// ```
#[derive(Clone, Debug)]
pub struct AuthorizationInterceptor {
    tokens: Arc<TokenManager>,
    policy: SharedAccessPolicy,
}

impl AuthorizationInterceptor {
    pub fn new(tokens: Arc<TokenManager>, policy: SharedAccessPolicy) -> Self {
        Self { tokens, policy }
    }

    pub fn policy(&self) -> &SharedAccessPolicy {
        &self.policy
    }

    /// Decide whether a call to `method` carrying `metadata` may proceed
    ///
    /// `Ok(Some(identity))` when a verified credential was required and
    /// accepted, `Ok(None)` when the method is open, `Err` on denial.
    pub fn authorize(
        &self,
        method: &str,
        metadata: &MetadataMap,
    ) -> Result<Option<CallerIdentity>, AuthError> {
        self.authorize_at(method, metadata, Utc::now())
    }

    /// [`authorize`](Self::authorize) with an explicit clock for expiry checks
    pub fn authorize_at(
        &self,
        method: &str,
        metadata: &MetadataMap,
        now: DateTime<Utc>,
    ) -> Result<Option<CallerIdentity>, AuthError> {
        let decision = self.evaluate(method, metadata, now);

        match &decision {
            Ok(Some(identity)) => debug!(
                method,
                username = %identity.username,
                role = %identity.role,
                "call authorized"
            ),
            Ok(None) => debug!(method, "call allowed without credential"),
            Err(reason) => warn!(method, reason = %reason, "call rejected"),
        }

        decision
    }

    fn evaluate(
        &self,
        method: &str,
        metadata: &MetadataMap,
        now: DateTime<Utc>,
    ) -> Result<Option<CallerIdentity>, AuthError> {
        let policy = self.policy.load();

        // 1. Method lookup
        let allowed_roles = match policy.lookup(method) {
            MethodAccess::Open => return Ok(None),
            MethodAccess::Closed => return Err(AuthError::MethodNotPermitted(method.to_string())),
            MethodAccess::Restricted(roles) => roles,
        };

        // 2. Credential presence and shape
        let token = extract_token(metadata)?;

        // 3. Token verification
        let claims = self.tokens.verify_at(token, now)?;

        // 4. Role check
        if !allowed_roles.contains(&claims.role) {
            return Err(AuthError::RoleNotPermitted {
                role: claims.role,
                method: method.to_string(),
            });
        }

        Ok(Some(CallerIdentity::from_claims(claims)))
    }

    /// Authorize `request` for `method`, then run `handler` only on Allow
    ///
    /// The verified identity, if any, is inserted into the request extensions
    /// before the handler sees it. Works for unary (`Request<M>`) and
    /// streaming (`Request<Streaming<M>>`) calls alike.
    pub async fn intercept<T, R, F, Fut>(
        &self,
        method: &str,
        mut request: Request<T>,
        handler: F,
    ) -> Result<R, Status>
    where
        F: FnOnce(Request<T>) -> Fut,
        Fut: Future<Output = Result<R, Status>>,
    {
        if let Some(identity) = self.authorize(method, request.metadata())? {
            request.extensions_mut().insert(identity);
        }
        handler(request).await
    }
}

/// Pull the raw token out of call metadata
///
/// The entry value is the token itself; no scheme prefix is stripped.
fn extract_token(metadata: &MetadataMap) -> Result<&str, AuthError> {
    let value = metadata
        .get(AUTHORIZATION_KEY)
        .ok_or(AuthError::MissingCredential)?;

    let token = value.to_str().map_err(|_| AuthError::MalformedCredential)?;
    if token.trim().is_empty() {
        return Err(AuthError::MalformedCredential);
    }

    Ok(token)
}
