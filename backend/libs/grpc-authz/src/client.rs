//! Client-side Token Interceptor
//!
//! Injects the bearer token returned by login into outgoing gRPC requests.

use crate::server::AUTHORIZATION_KEY;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// Client-side interceptor that attaches the token to every outgoing call
///
/// The token goes into the `authorization` metadata entry as-is, without a
/// scheme prefix, which is the form the server-side interceptor expects.
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_authz::TokenClientInterceptor;
/// use tonic::transport::Channel;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let token = "eyJhbGc..."; // From AuthService/Login
/// let interceptor = TokenClientInterceptor::new(token)?;
///
/// let channel = Channel::from_static("http://[::1]:50051")
///     .connect()
///     .await?;
///
/// // let mut client = UserServiceClient::with_interceptor(channel, interceptor);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct TokenClientInterceptor {
    /// Parsed once at construction time
    token: AsciiMetadataValue,
}

impl TokenClientInterceptor {
    /// Create a new token interceptor
    ///
    /// ## Errors
    ///
    /// Returns `Status::invalid_argument` if the token is not visible ASCII.
    /// Tokens issued by `TokenManager` (base64url segments) always are.
    pub fn new(token: impl Into<String>) -> Result<Self, Status> {
        let token = AsciiMetadataValue::try_from(token.into())
            .map_err(|_| Status::invalid_argument("token contains invalid characters"))?;
        Ok(Self { token })
    }
}

impl Interceptor for TokenClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(AUTHORIZATION_KEY, self.token.clone());
        Ok(request)
    }
}
