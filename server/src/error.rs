//! Typed error taxonomy for the HTTP boundary.
//!
//! Handlers and layers return [`ApiError`]; [`ApiError::to_response`] is the
//! only place an error becomes an HTTP response.

use std::fmt;

use bytes::Bytes;
use http::{HeaderValue, StatusCode, header};
use hyper::Response;
use thiserror::Error;
use tracing::{error, warn};

use shared::types::ErrorResponse;

use crate::handlers::http::utils::json_response::{ResponseBody, full};
use crate::security::token::TokenError;

/// One failed constraint on one request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" , ")
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", join_field_errors(.0))]
    ValidationFailure(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    AuthenticationFailure(String),

    #[error(transparent)]
    InvalidToken(#[from] TokenError),

    #[error("Unexpected error: {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Unexpected(anyhow::Error::new(e).context("Database error"))
    }
}

impl ApiError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: &str) -> Self {
        ApiError::ValidationFailure(vec![FieldError::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailure(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::AuthenticationFailure(_) | ApiError::InvalidToken(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationFailure(_) => "VALIDATION_FAILED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::AlreadyExists(_) => "ALREADY_EXISTS",
            ApiError::AuthenticationFailure(_) | ApiError::InvalidToken(_) => "FORBIDDEN",
            ApiError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to hand back to the caller. Internal detail stays in the
    /// server log.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::InvalidToken(_) => "Access denied".to_string(),
            ApiError::Unexpected(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Translate into the JSON error response for a request to `path`.
    pub fn to_response(&self, path: &str) -> Response<ResponseBody> {
        let status = self.status_code();

        match self {
            ApiError::Unexpected(err) => error!("Unexpected error on {}: {:?}", path, err),
            other => warn!("{} on {}: {}", status.as_u16(), path, other),
        }

        let body = ErrorResponse::new(self.error_code(), &self.client_message())
            .with_path(path)
            .with_timestamp(httpdate::fmt_http_date(std::time::SystemTime::now()));

        let json = serde_json::to_vec(&body).unwrap_or_else(|e| {
            error!("Failed to serialize error response: {}", e);
            br#"{"status":"error","code":"INTERNAL_ERROR","message":"An internal error occurred"}"#
                .to_vec()
        });

        let mut response = Response::new(full(Bytes::from(json)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
