//! Shared-secret transport authentication (spec §6: "All tool calls
//! authenticate with a shared secret header (case-insensitive lookup) on
//! the transport; unauthorized requests receive a transport-level 4xx").
//!
//! jsonrpsee's HTTP middleware hook accepts any `tower::Layer` over its
//! request/response body types, so this is a hand-rolled layer generic over
//! the response body rather than `tower_http::validate_request` directly —
//! that helper ties the validator's output type to the inner service's
//! exact response body, which is an internal jsonrpsee detail.

use std::task::{Context, Poll};

use http::{HeaderMap, Request, Response, StatusCode};
use tower::{Layer, Service};

/// The header name checked on every inbound call, case-insensitively per
/// spec §6.
pub const SHARED_SECRET_HEADER: &str = "x-bouncer-secret";

/// Wraps an inner `tower::Service` with the shared-secret check.
#[derive(Clone)]
pub struct AuthLayer {
    secret: String,
}

impl AuthLayer {
    /// `secret` is compared verbatim against the header value.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            secret: self.secret.clone(),
        }
    }
}

/// The service produced by [`AuthLayer`].
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    secret: String,
}

fn header_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers.get(SHARED_SECRET_HEADER).and_then(|v| v.to_str().ok()).is_some_and(|v| v == expected)
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AuthService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        if header_matches(request.headers(), &self.secret) {
            let future = self.inner.call(request);
            Box::pin(future)
        } else {
            Box::pin(async move {
                let response = Response::builder().status(StatusCode::UNAUTHORIZED).body(ResBody::default()).expect("empty body response is infallible");
                Ok(response)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::Full;

    use super::*;

    fn headers_with(name: &str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::HeaderName::from_bytes(name.as_bytes()).unwrap(), value.parse().unwrap());
        headers
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let headers = headers_with("X-Bouncer-Secret", "swordfish");
        assert!(header_matches(&headers, "swordfish"));
    }

    #[test]
    fn wrong_secret_does_not_match() {
        let headers = headers_with("x-bouncer-secret", "wrong");
        assert!(!header_matches(&headers, "swordfish"));
    }

    #[tokio::test]
    async fn missing_header_yields_unauthorized() {
        use tower::ServiceExt;

        let inner = tower::service_fn(|_req: Request<Full<bytes::Bytes>>| async move { Ok::<_, std::convert::Infallible>(Response::new(Full::default())) });
        let mut service = AuthLayer::new("swordfish").layer(inner);
        let request = Request::builder().body(Full::default()).unwrap();
        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
