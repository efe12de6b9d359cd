use bytes::Bytes;
use hyper::{Request, Response, StatusCode};

use crate::AppState;
use crate::error::ApiError;
use crate::handlers::http::utils::{ResponseBody, deliver_success_json};

/// `GET /ping`, admin only.
pub async fn handle_ping(
    _req: Request<Bytes>,
    _state: AppState,
) -> Result<Response<ResponseBody>, ApiError> {
    Ok(deliver_success_json("pong", StatusCode::OK)?)
}
