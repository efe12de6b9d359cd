//! Stateless JWT authentication server.
//!
//! Requests pass through [`security::AuthFilterLayer`], then
//! [`security::AccessLayer`], then the router. See [`build_service`].

pub mod database;
pub mod error;
pub mod handlers;
pub mod security;

use std::convert::Infallible;
use std::sync::Arc;

use hyper::{Request, Response};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower::util::BoxCloneService;

use handlers::http::utils::ResponseBody;
use handlers::http::{RouterService, build_router};
use security::{AccessLayer, AccessPolicy, AuthFilterLayer, TokenService};

/// State shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(db: SqlitePool, tokens: TokenService) -> Self {
        Self {
            db,
            tokens: Arc::new(tokens),
        }
    }
}

/// The complete request pipeline for a body type `B`.
pub type AppService<B> = BoxCloneService<Request<B>, Response<ResponseBody>, Infallible>;

/// Assemble filter, access rules and router into one service.
pub fn build_service<B>(state: AppState) -> AppService<B>
where
    B: hyper::body::Body<Data = bytes::Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let service = ServiceBuilder::new()
        .layer(AuthFilterLayer::new(state.tokens.clone()))
        .layer(AccessLayer::new(AccessPolicy::default()))
        .service(RouterService::new(build_router(), state));

    BoxCloneService::new(service)
}
