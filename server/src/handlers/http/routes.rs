use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{Method, Request, Response};
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::handlers::http::utils::ResponseBody;
use crate::handlers::http::{auth, ping, user};

// ---------------------------------------------------------------------------
// Handler type
// ---------------------------------------------------------------------------
//
// Handlers receive the fully buffered request and the shared state. Access
// control has already run by the time a handler is called; the caller's
// `Authentication` is in the request extensions.

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, ApiError>> + Send>>;

type RouteHandler = Box<dyn Fn(Request<Bytes>, AppState) -> HandlerFuture + Send + Sync>;

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

struct Route {
    method: Method,
    path: String,
    handler: RouteHandler,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>, ApiError>> + Send + 'static,
    {
        self.add(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>, ApiError>> + Send + 'static,
    {
        self.add(Method::POST, path, handler)
    }

    fn add<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<ResponseBody>, ApiError>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler: Box::new(move |req, state| Box::pin(handler(req, state))),
        });
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Run the first matching handler. Every error, including "no such
    /// route", comes back as a JSON error response.
    pub async fn route(&self, req: Request<Bytes>, state: AppState) -> Response<ResponseBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some(route) = self
            .routes
            .iter()
            .find(|r| r.method == method && Self::path_matches(&r.path, &path))
        else {
            warn!("No route for {} {}", method, path);
            return ApiError::NotFound(format!("No route for {} {}", method, path))
                .to_response(&path);
        };

        match (route.handler)(req, state).await {
            Ok(response) => {
                info!("{} {} -> {}", method, path, response.status().as_u16());
                response
            }
            Err(e) => e.to_response(&path),
        }
    }

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/user/:id"  matches  "/user/42"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| (r.starts_with(':') && !p.is_empty()) || r == p)
    }
}

/// Value of the `:name` segment of `route_path` within `request_path`.
pub fn path_param<'a>(route_path: &str, request_path: &'a str, name: &str) -> Option<&'a str> {
    let index = route_path
        .split('/')
        .position(|seg| seg.strip_prefix(':') == Some(name))?;
    request_path.split('/').nth(index)
}

// ---------------------------------------------------------------------------
// Application routes
// ---------------------------------------------------------------------------
//
// Who may call what is decided by the access layer, not here.

pub fn build_router() -> Router {
    Router::new()
        .post("/auth/login", auth::handle_login)
        .post("/auth/register", auth::handle_register)
        .get("/user/:id", user::handle_get_user)
        .get("/ping", ping::handle_ping)
}

// ---------------------------------------------------------------------------
// Tower service
// ---------------------------------------------------------------------------

/// Largest request body the router will buffer, in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Innermost service of the stack: buffers the body and hands the request to
/// the [`Router`].
#[derive(Clone)]
pub struct RouterService {
    router: Arc<Router>,
    state: AppState,
}

impl RouterService {
    pub fn new(router: Router, state: AppState) -> Self {
        Self {
            router: Arc::new(router),
            state,
        }
    }
}

impl<B> tower::Service<Request<B>> for RouterService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let router = self.router.clone();
        let state = self.state.clone();

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let bytes = match Limited::new(body, MAX_BODY_BYTES).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) if e.is::<LengthLimitError>() => {
                    warn!("Request body over {} bytes rejected", MAX_BODY_BYTES);
                    let error = ApiError::invalid(
                        "body",
                        &format!("Request body exceeds {} bytes", MAX_BODY_BYTES),
                    );
                    return Ok(error.to_response(parts.uri.path()));
                }
                Err(e) => {
                    warn!("Failed to read request body: {}", e);
                    let error = ApiError::invalid("body", "Unreadable request body");
                    return Ok(error.to_response(parts.uri.path()));
                }
            };
            Ok(router.route(Request::from_parts(parts, bytes), state).await)
        })
    }
}
