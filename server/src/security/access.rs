//! Route-level access decisions.
//!
//! Rules are checked in declaration order and the first one whose method and
//! path match decides the request. A request no rule matches is denied.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::{Method, Request, Response};
use tower::{Layer, Service};
use tracing::{debug, warn};

use shared::types::Role;

use super::principal::Authentication;
use crate::error::ApiError;
use crate::handlers::http::utils::json_response::ResponseBody;

/// Ant-style path pattern. Only the shapes the route table needs are
/// supported: `/**`, `/prefix/**` and exact paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Any,
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn ant(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some("") => Self::Any,
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(p) => p == path,
            Self::Prefix(p) => match path.strip_prefix(p.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    PermitAll,
    HasRole(Role),
    Authenticated,
}

impl Requirement {
    pub fn is_satisfied_by(&self, auth: &Authentication) -> bool {
        match self {
            Self::PermitAll => true,
            Self::Authenticated => auth.is_authenticated(),
            Self::HasRole(role) => auth.principal().is_some_and(|p| p.has_role(*role)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessRule {
    /// `None` matches every method.
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl AccessRule {
    pub fn new(method: Option<Method>, pattern: &str, requirement: Requirement) -> Self {
        Self {
            method,
            pattern: PathPattern::ant(pattern),
            requirement,
        }
    }

    fn applies_to(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && self.pattern.matches(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(vec![
            AccessRule::new(Some(Method::POST), "/auth/**", Requirement::PermitAll),
            AccessRule::new(Some(Method::GET), "/ping", Requirement::HasRole(Role::Admin)),
            AccessRule::new(None, "/**", Requirement::Authenticated),
        ])
    }
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    pub fn decide(&self, method: &Method, path: &str, auth: &Authentication) -> Decision {
        match self.rules.iter().find(|r| r.applies_to(method, path)) {
            Some(rule) if rule.requirement.is_satisfied_by(auth) => Decision::Permit,
            Some(rule) => {
                debug!("{} {} requires {:?}", method, path, rule.requirement);
                Decision::Deny
            }
            None => Decision::Deny,
        }
    }
}

/// Tower layer enforcing an [`AccessPolicy`]. Must sit inside the
/// authentication filter so the request already carries its state.
#[derive(Clone)]
pub struct AccessLayer {
    policy: std::sync::Arc<AccessPolicy>,
}

impl AccessLayer {
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            policy: std::sync::Arc::new(policy),
        }
    }
}

impl<S> Layer<S> for AccessLayer {
    type Service = AccessService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AccessService<S> {
    inner: S,
    policy: std::sync::Arc<AccessPolicy>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for AccessService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResponseBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let auth = Authentication::of(req.extensions());
        let decision = self.policy.decide(req.method(), req.uri().path(), &auth);

        // Take the service that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if decision == Decision::Deny {
                warn!("Access denied for {} {}", req.method(), req.uri().path());
                let error = ApiError::AuthenticationFailure("Access denied".to_string());
                return Ok(error.to_response(req.uri().path()));
            }
            inner.call(req).await
        })
    }
}
