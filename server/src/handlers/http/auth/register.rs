use anyhow::Context;
use bytes::Bytes;
use hyper::header::{HeaderValue, LOCATION};
use hyper::{Request, Response, StatusCode};
use tracing::{info, warn};

use shared::types::{RegistrationData, Role};

use crate::AppState;
use crate::database::users::{self, NewUser};
use crate::database::utils::{hash_password, is_valid_email};
use crate::error::{ApiError, FieldError};
use crate::handlers::http::utils::{ResponseBody, deliver_serialized_json, parse_json};

/// `POST /auth/register`
///
/// Responds 201 with the public view of the new account and a `Location`
/// pointing at it.
pub async fn handle_register(
    req: Request<Bytes>,
    state: AppState,
) -> Result<Response<ResponseBody>, ApiError> {
    info!("Processing registration request");

    let data: RegistrationData = parse_json(req.body())?;

    // A taken email is a 409 whatever else is wrong with the request.
    if users::exists_by_email(&state.db, &data.email).await? {
        warn!("Registration rejected: email already registered");
        return Err(ApiError::AlreadyExists("User Already Exists".to_string()));
    }

    let roles = validate_registration(&data)?;

    let password_hash =
        hash_password(&data.password).context("Failed to hash password with Argon2")?;

    let user = users::save(
        &state.db,
        NewUser {
            email: data.email,
            password_hash,
            roles,
        },
    )
    .await?;

    info!("User registered successfully (ID: {})", user.id);

    let location = HeaderValue::from_str(&format!("/user/{}", user.id))
        .context("Failed to build Location header")?;
    let mut response = deliver_serialized_json(&user.to_view(), StatusCode::CREATED)?;
    response.headers_mut().insert(LOCATION, location);
    Ok(response)
}

/// Check every field and parse the role names. All failures are reported
/// together.
fn validate_registration(data: &RegistrationData) -> Result<Vec<Role>, ApiError> {
    let mut errors = Vec::new();

    if data.email.trim().is_empty() {
        errors.push(FieldError::new("email", "must not be blank"));
    } else if !is_valid_email(&data.email) {
        errors.push(FieldError::new("email", "must be a well-formed email address"));
    }

    if data.password.trim().is_empty() {
        errors.push(FieldError::new("password", "must not be blank"));
    }

    let mut roles = Vec::with_capacity(data.roles.len());
    for name in &data.roles {
        match name.parse::<Role>() {
            Ok(role) => roles.push(role),
            Err(e) => errors.push(FieldError::new("roles", e.to_string())),
        }
    }

    if errors.is_empty() {
        Ok(roles)
    } else {
        Err(ApiError::ValidationFailure(errors))
    }
}
