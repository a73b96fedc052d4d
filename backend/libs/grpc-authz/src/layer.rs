//! Tower Layer wiring for the authorization interceptor
//!
//! tonic's closure interceptors never see the request path, so the gate is
//! applied one level lower, on the raw `http::Request`, where the path is the
//! fully-qualified method name. One HTTP/2 request is one call, which makes
//! the decision per call for unary and streaming methods alike.

use crate::server::AuthorizationInterceptor;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::metadata::MetadataMap;
use tower::{Layer, Service};

/// Authorization Layer for tonic servers
#[derive(Clone, Debug)]
pub struct AuthorizationLayer {
    interceptor: AuthorizationInterceptor,
}

impl AuthorizationLayer {
    pub fn new(interceptor: AuthorizationInterceptor) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AuthorizationService {
            inner: service,
            interceptor: self.interceptor.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthorizationService<S> {
    inner: S,
    interceptor: AuthorizationInterceptor,
}

impl<S, B> Service<http::Request<B>> for AuthorizationService<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let metadata = MetadataMap::from_headers(std::mem::take(req.headers_mut()));
        let decision = self.interceptor.authorize(req.uri().path(), &metadata);
        *req.headers_mut() = metadata.into_headers();

        match decision {
            Ok(identity) => {
                if let Some(identity) = identity {
                    req.extensions_mut().insert(identity);
                }
                // The clone is not guaranteed ready; keep the one that was polled
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(inner.call(req))
            }
            Err(denial) => {
                let response = denial.to_status().into_http();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
