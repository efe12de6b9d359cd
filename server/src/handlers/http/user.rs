use bytes::Bytes;
use hyper::{Request, Response, StatusCode};
use tracing::debug;

use crate::AppState;
use crate::database::users;
use crate::error::ApiError;
use crate::handlers::http::routes::path_param;
use crate::handlers::http::utils::{ResponseBody, deliver_serialized_json};
use crate::security::Authentication;

/// `GET /user/:id`
pub async fn handle_get_user(
    req: Request<Bytes>,
    state: AppState,
) -> Result<Response<ResponseBody>, ApiError> {
    let id = path_param("/user/:id", req.uri().path(), "id")
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| ApiError::invalid("id", "must be a number"))?;

    if let Some(principal) = Authentication::of(req.extensions()).principal() {
        debug!("{} looking up user {}", principal.email(), id);
    }

    let user = users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not Found".to_string()))?;

    Ok(deliver_serialized_json(&user.to_view(), StatusCode::OK)?)
}
