use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode, header};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use tracing::debug;

/// Body type every handler and layer in the server responds with.
pub type ResponseBody = BoxBody<Bytes, Infallible>;

pub fn full<T: Into<Bytes>>(chunk: T) -> ResponseBody {
    Full::new(chunk.into()).boxed()
}

/// Serialize any `Serialize` type and deliver it as a JSON response.
/// This is the primary helper all handlers should use instead of
/// writing their own one-off serialization + response-building blocks.
pub fn deliver_serialized_json<T: Serialize>(
    data: &T,
    status: StatusCode,
) -> Result<Response<ResponseBody>> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!("Delivering serialized JSON response, size: {} bytes", json.len());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(json))
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))
}

/// Wraps `data` as `{"status":"success","data":...}`.
pub fn deliver_success_json<T: Serialize>(
    data: T,
    status: StatusCode,
) -> Result<Response<ResponseBody>> {
    let payload = json!({
        "status": "success",
        "data": data,
    });
    deliver_serialized_json(&payload, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_envelope() {
        let res = deliver_success_json("pong", StatusCode::OK).unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"status": "success", "data": "pong"}));
    }

    #[tokio::test]
    async fn serialized_json_keeps_status() {
        #[derive(Serialize)]
        struct Token {
            token: &'static str,
        }
        let res = deliver_serialized_json(&Token { token: "abc" }, StatusCode::CREATED).unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"token":"abc"}"#);
    }
}
