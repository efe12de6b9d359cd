use anyhow::Context;
use bytes::Bytes;
use hyper::{Request, Response, StatusCode};
use tracing::{info, warn};

use shared::types::{LoginData, TokenResponse};

use crate::AppState;
use crate::database::users;
use crate::database::utils::verify_password;
use crate::error::{ApiError, FieldError};
use crate::handlers::http::utils::{ResponseBody, deliver_serialized_json, parse_json};

/// `POST /auth/login`
///
/// The account is looked up before the password is checked, so an unknown
/// email is a 404 and a wrong password is a 403.
pub async fn handle_login(
    req: Request<Bytes>,
    state: AppState,
) -> Result<Response<ResponseBody>, ApiError> {
    info!("Processing login request");

    let data: LoginData = parse_json(req.body())?;
    validate_login(&data)?;

    let user = users::find_by_email(&state.db, &data.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User Not Found".to_string()))?;

    let matches = verify_password(&user.password_hash, &data.password)
        .context("Failed to verify password hash")?;
    if !matches {
        warn!("Login failed for user id {}: bad credentials", user.id);
        return Err(ApiError::AuthenticationFailure("Bad credentials".to_string()));
    }

    let roles = user.role_names();
    let token = state
        .tokens
        .issue(&user.email, roles.as_slice())
        .map_err(|e| ApiError::Unexpected(anyhow::Error::new(e).context("Token issuance failed")))?;

    info!("User logged in successfully (ID: {})", user.id);
    Ok(deliver_serialized_json(&TokenResponse { token }, StatusCode::OK)?)
}

fn validate_login(data: &LoginData) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if data.email.trim().is_empty() {
        errors.push(FieldError::new("email", "must not be blank"));
    }
    if data.password.trim().is_empty() {
        errors.push(FieldError::new("password", "must not be blank"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationFailure(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(email: &str, password: &str) -> LoginData {
        LoginData {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn complete_credentials_pass() {
        assert!(validate_login(&login("a@example.com", "pw")).is_ok());
    }

    #[test]
    fn blank_fields_are_all_reported() {
        let err = validate_login(&login("  ", "")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "email: must not be blank , password: must not be blank"
        );
    }
}
