//! Per-request authentication filter.
//!
//! Runs once per request, ahead of the access rules. It turns an
//! `Authorization: Bearer <token>` header into an [`Authentication`] value in
//! the request's extensions and always passes the request on; rejecting
//! anonymous callers is the access layer's job.

use std::sync::Arc;
use std::task::{Context, Poll};

use hyper::Request;
use hyper::header::{AUTHORIZATION, HeaderMap};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::principal::{Authentication, Principal};
use super::token::TokenService;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract bearer token from Authorization header
/// Format: "Authorization: Bearer <token>"
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;

    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.trim().is_empty() => {
            debug!("Bearer token extracted");
            Some(token.trim().to_string())
        }
        _ => {
            debug!("Authorization header without a Bearer token");
            None
        }
    }
}

/// Derive the authentication state for one request.
///
/// A missing, malformed, forged or expired token leaves the request
/// anonymous. Token errors are never surfaced from here.
pub fn authenticate(tokens: &TokenService, headers: &HeaderMap) -> Authentication {
    let Some(token) = extract_bearer_token(headers) else {
        return Authentication::Anonymous;
    };

    match tokens.valid_claims(&token) {
        Some(claims) => {
            debug!("Authenticated {} with {:?}", claims.sub, claims.roles);
            Authentication::Authenticated(Principal::new(claims.sub, claims.roles))
        }
        None => {
            warn!("Rejected bearer token; continuing as anonymous");
            Authentication::Anonymous
        }
    }
}

/// Tower layer that runs [`authenticate`] on every request.
#[derive(Clone)]
pub struct AuthFilterLayer {
    tokens: Arc<TokenService>,
}

impl AuthFilterLayer {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for AuthFilterLayer {
    type Service = AuthFilterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthFilterService {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthFilterService<S> {
    inner: S,
    tokens: Arc<TokenService>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for AuthFilterService<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let authentication = authenticate(&self.tokens, req.headers());
        // Overwrites anything a caller may have smuggled in.
        req.extensions_mut().insert(authentication);
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use std::convert::Infallible;
    use tower::ServiceExt;

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(&[9u8; 32], 259_200).unwrap())
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer abc.def.ghi")).as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn header_without_bearer_yields_nothing() {
        assert!(extract_bearer_token(&headers_with("abc.def.ghi")).is_none());
    }

    #[test]
    fn missing_header_yields_nothing() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn bearer_must_lead_the_header() {
        assert!(extract_bearer_token(&headers_with("Token Bearer abc")).is_none());
        assert!(extract_bearer_token(&headers_with("bearer abc")).is_none());
    }

    #[test]
    fn empty_bearer_yields_nothing() {
        assert!(extract_bearer_token(&headers_with("Bearer   ")).is_none());
    }

    #[test]
    fn valid_token_produces_principal() {
        let tokens = tokens();
        let token = tokens.issue("ann@example.com", &["ADMIN"]).unwrap();
        let auth = authenticate(&tokens, &headers_with(&format!("Bearer {}", token)));

        let principal = auth.principal().expect("principal");
        assert_eq!(principal.email(), "ann@example.com");
        assert_eq!(principal.authorities(), ["ROLE_ADMIN".to_string()]);
    }

    #[test]
    fn forged_token_stays_anonymous() {
        let other = TokenService::new(&[1u8; 32], 259_200).unwrap();
        let token = other.issue("ann@example.com", &["ADMIN"]).unwrap();
        let auth = authenticate(&tokens(), &headers_with(&format!("Bearer {}", token)));
        assert_eq!(auth, Authentication::Anonymous);
    }

    #[test]
    fn expired_token_stays_anonymous() {
        let tokens = tokens();
        let token = tokens.issue_at("ann@example.com", &["ADMIN"], 1_000).unwrap();
        let auth = authenticate(&tokens, &headers_with(&format!("Bearer {}", token)));
        assert_eq!(auth, Authentication::Anonymous);
    }

    #[test]
    fn blank_subject_stays_anonymous() {
        let tokens = tokens();
        let token = tokens.issue("", &["ADMIN"]).unwrap();
        let auth = authenticate(&tokens, &headers_with(&format!("Bearer {}", token)));
        assert_eq!(auth, Authentication::Anonymous);
    }

    #[tokio::test]
    async fn layer_scopes_state_to_each_request() {
        let tokens = tokens();
        let token = tokens.issue("ann@example.com", &["USER"]).unwrap();

        let echo = tower::service_fn(|req: Request<()>| async move {
            Ok::<_, Infallible>(Authentication::of(req.extensions()))
        });
        let svc = AuthFilterLayer::new(tokens).layer(echo);

        let authed = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(())
            .unwrap();
        assert!(svc.clone().oneshot(authed).await.unwrap().is_authenticated());

        let anonymous = Request::builder().body(()).unwrap();
        assert_eq!(
            svc.clone().oneshot(anonymous).await.unwrap(),
            Authentication::Anonymous
        );
    }

    #[tokio::test]
    async fn smuggled_extension_is_replaced() {
        let echo = tower::service_fn(|req: Request<()>| async move {
            Ok::<_, Infallible>(Authentication::of(req.extensions()))
        });
        let svc = AuthFilterLayer::new(tokens()).layer(echo);

        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(Authentication::Authenticated(Principal::new(
                "fake@example.com".into(),
                vec!["ROLE_ADMIN".into()],
            )));

        assert_eq!(svc.oneshot(req).await.unwrap(), Authentication::Anonymous);
    }
}
